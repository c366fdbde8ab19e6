use crate::{
    auth::AuthenticatedUser,
    create_success_response,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, routing::post, Json, Router};
use revos_common::ApiResponse;
use revos_core::service::SyllabusService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const MAX_QUESTION_CHARS: usize = 10_000;

#[derive(Debug, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

pub fn routes(service: Arc<SyllabusService>) -> Router {
    Router::new().route("/", post(ask)).with_state(service)
}

async fn ask(
    State(service): State<Arc<SyllabusService>>,
    user: AuthenticatedUser,
    Json(request): Json<AskRequest>,
) -> ApiResult<Json<ApiResponse<AskResponse>>> {
    if request.question.len() > MAX_QUESTION_CHARS {
        return Err(ApiError::Validation(format!(
            "Question too long (max {} characters)",
            MAX_QUESTION_CHARS
        )));
    }

    debug!("Question from user {}", user.claims.user_id);

    let answer = service.ask(user.claims.user_id, &request.question).await?;
    Ok(create_success_response(AskResponse { answer }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthConfig, AuthService, RegisterRequest};
    use crate::middleware::auth_middleware;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use revos_core::llm::{GenerationRequest, TextGenerator};
    use revos_core::storage::{SqliteStorage, StorageConfig};
    use revos_knowledge::InMemoryKnowledgeStore;
    use serde_json::json;
    use tower::ServiceExt;

    struct CannedAnswer;

    #[async_trait]
    impl TextGenerator for CannedAnswer {
        async fn generate(&self, _request: GenerationRequest) -> revos_common::Result<String> {
            Ok("Your midterm is on Oct 25.".to_string())
        }
    }

    async fn create_test_app() -> (Router, String) {
        let storage = Arc::new(
            SqliteStorage::new(&StorageConfig {
                database_url: "sqlite::memory:".to_string(),
                ..StorageConfig::default()
            })
            .await
            .unwrap(),
        );
        let service = Arc::new(SyllabusService::new(
            storage.clone(),
            Arc::new(InMemoryKnowledgeStore::new()),
            Arc::new(CannedAnswer),
            5,
            None,
        ));
        let auth_service = Arc::new(AuthService::new(AuthConfig::default(), storage));

        let token = auth_service
            .register(RegisterRequest {
                username: "rev".to_string(),
                email: "rev@example.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .unwrap()
            .access_token;

        let app = routes(service).layer(axum::middleware::from_fn_with_state(
            auth_service,
            auth_middleware,
        ));
        (app, token)
    }

    fn ask_request(token: &str, question: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::from(json!({ "question": question }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_ask_returns_an_answer() {
        let (app, token) = create_test_app().await;

        let response = app
            .oneshot(ask_request(&token, "When is my midterm?"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"]["answer"], "Your midterm is on Oct 25.");
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected() {
        let (app, token) = create_test_app().await;

        let response = app.oneshot(ask_request(&token, "   ")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_question_is_rejected() {
        let (app, token) = create_test_app().await;

        let question = "a".repeat(MAX_QUESTION_CHARS + 1);
        let response = app.oneshot(ask_request(&token, &question)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ask_requires_auth() {
        let (app, _) = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({"question": "hi"}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
