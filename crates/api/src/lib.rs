pub mod auth;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;

use axum::Json;
use revos_common::ApiResponse;

pub use server::ApiServer;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub rate_limit_requests_per_minute: u32,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            max_upload_bytes: 16 * 1024 * 1024,
            rate_limit_requests_per_minute: 60,
            request_timeout_secs: 30,
        }
    }
}

// Common API utilities
pub fn create_success_response<T: serde::Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

pub fn create_error_response(message: String) -> Json<ApiResponse<()>> {
    Json(ApiResponse::error(message))
}
