use crate::{
    auth::{AuthService, AuthenticatedUser, LoginRequest, LoginResponse, RegisterRequest},
    create_success_response,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use revos_common::ApiResponse;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub fn routes(auth_service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify", get(verify))
        .with_state(auth_service)
}

// Registration endpoint
async fn register(
    State(auth_service): State<Arc<AuthService>>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<Json<ApiResponse<LoginResponse>>> {
    debug!("Registration attempt for username: {}", request.username);

    match auth_service.register(request).await {
        Ok(response) => {
            info!("User registered: {}", response.user.username);
            Ok(create_success_response(response))
        }
        Err(e) => {
            warn!("Registration failed: {}", e);
            Err(e)
        }
    }
}

// Login endpoint
async fn login(
    State(auth_service): State<Arc<AuthService>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<ApiResponse<LoginResponse>>> {
    debug!("Login attempt for: {}", request.identity);

    if request.identity.trim().is_empty() {
        return Err(ApiError::Validation(
            "Username or email is required".to_string(),
        ));
    }
    if request.password.is_empty() {
        return Err(ApiError::Validation("Password is required".to_string()));
    }

    match auth_service.login(request).await {
        Ok(response) => {
            info!("User logged in: {}", response.user.username);
            Ok(create_success_response(response))
        }
        Err(e) => {
            warn!("Login failed: {}", e);
            Err(e)
        }
    }
}

// Lets the frontend check a stored token without another login round trip
async fn verify(user: AuthenticatedUser) -> Json<ApiResponse<serde_json::Value>> {
    create_success_response(json!({
        "user_id": user.claims.user_id,
        "username": user.claims.username,
        "expires_at": user.claims.exp
    }))
}
