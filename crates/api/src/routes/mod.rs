pub mod ask;
pub mod auth;
pub mod health;
pub mod syllabi;

use crate::auth::AuthService;
use axum::Router;
use revos_core::service::SyllabusService;
use std::sync::Arc;

pub fn create_routes(service: Arc<SyllabusService>, auth_service: Arc<AuthService>) -> Router {
    Router::new()
        // Health check routes (no authentication required)
        .nest("/health", health::routes())
        // Registration and login
        .nest("/auth", auth::routes(auth_service))
        // Protected routes (require a bearer token)
        .nest("/api/v1", protected_routes(service))
}

fn protected_routes(service: Arc<SyllabusService>) -> Router {
    Router::new()
        .nest("/syllabi", syllabi::routes(service.clone()))
        .nest("/ask", ask::routes(service))
}

// Fallback handler for unmatched routes
pub async fn not_found_handler() -> axum::http::StatusCode {
    axum::http::StatusCode::NOT_FOUND
}
