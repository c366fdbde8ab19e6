use crate::{
    auth::AuthenticatedUser,
    create_success_response,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::header::CONTENT_TYPE,
    routing::{get, put},
    Json, Router,
};
use revos_common::{ApiResponse, GradingItem, SyllabusRecord, SyllabusSummary};
use revos_core::{service::SyllabusService, text::TextExtractor};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateGradingRequest {
    pub grading: Vec<GradingItem>,
}

#[derive(Debug, Deserialize)]
struct UploadTextRequest {
    raw_text: String,
}

pub fn routes(service: Arc<SyllabusService>) -> Router {
    Router::new()
        .route("/", get(list_syllabi).post(upload_syllabus))
        .route("/:syllabus_id", get(get_syllabus).delete(delete_syllabus))
        .route("/:syllabus_id/grading", put(update_grading))
        .with_state(service)
}

// Upload endpoint: accepts either a multipart form with a single "file"
// field (.txt, .md or .pdf) or a JSON body `{"raw_text": "..."}`, then runs
// the ingestion pipeline on the extracted text.
async fn upload_syllabus(
    State(service): State<Arc<SyllabusService>>,
    user: AuthenticatedUser,
    request: Request,
) -> ApiResult<Json<ApiResponse<SyllabusRecord>>> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    let text = if content_type.starts_with("application/json") {
        let Json(body): Json<UploadTextRequest> = Json::from_request(request, &())
            .await
            .map_err(|e| ApiError::Validation(format!("Invalid JSON payload: {}", e)))?;

        debug!(
            "Syllabus text upload from user {}: {} chars",
            user.claims.user_id,
            body.raw_text.len()
        );
        body.raw_text
    } else {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ApiError::Validation(format!("Expected a multipart upload: {}", e)))?;

        let mut upload: Option<(String, Vec<u8>)> = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::Validation(format!("Invalid multipart payload: {}", e)))?
        {
            if field.name() == Some("file") {
                let filename = field.file_name().unwrap_or("syllabus.txt").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Could not read upload: {}", e)))?;
                upload = Some((filename, data.to_vec()));
            }
        }

        let (filename, data) = upload.ok_or_else(|| {
            ApiError::Validation("Expected a multipart field named 'file'".to_string())
        })?;

        debug!(
            "Syllabus upload from user {}: {} ({} bytes)",
            user.claims.user_id,
            filename,
            data.len()
        );
        TextExtractor::new().extract(&filename, &data)?
    };

    let record = service.ingest_syllabus(user.claims.user_id, &text).await?;

    info!(
        "User {} ingested syllabus {} ({})",
        user.claims.user_id, record.id, record.course_name
    );
    Ok(create_success_response(record))
}

async fn list_syllabi(
    State(service): State<Arc<SyllabusService>>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<Vec<SyllabusSummary>>>> {
    let summaries = service.list_syllabi(user.claims.user_id).await?;
    Ok(create_success_response(summaries))
}

async fn get_syllabus(
    State(service): State<Arc<SyllabusService>>,
    user: AuthenticatedUser,
    Path(syllabus_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<SyllabusRecord>>> {
    let record = service.get_syllabus(user.claims.user_id, syllabus_id).await?;
    Ok(create_success_response(record))
}

async fn delete_syllabus(
    State(service): State<Arc<SyllabusService>>,
    user: AuthenticatedUser,
    Path(syllabus_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    service
        .delete_syllabus(user.claims.user_id, syllabus_id)
        .await?;
    Ok(create_success_response(json!({ "deleted": syllabus_id })))
}

// Full-array replace of the grading breakdown
async fn update_grading(
    State(service): State<Arc<SyllabusService>>,
    user: AuthenticatedUser,
    Path(syllabus_id): Path<Uuid>,
    Json(request): Json<UpdateGradingRequest>,
) -> ApiResult<Json<ApiResponse<SyllabusRecord>>> {
    let record = service
        .update_grading(user.claims.user_id, syllabus_id, &request.grading)
        .await?;
    Ok(create_success_response(record))
}
