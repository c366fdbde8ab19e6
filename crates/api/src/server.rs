use crate::{
    auth::AuthService,
    middleware::{
        auth_middleware, cors_layer, rate_limiting_middleware, request_id_middleware,
        request_logging_middleware, request_size_middleware, security_headers_middleware,
        timeout_layer, RateLimiter,
    },
    routes::{create_routes, not_found_handler},
    ApiConfig,
};
use axum::{extract::DefaultBodyLimit, Router};
use revos_core::service::SyllabusService;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ApiServer {
    config: ApiConfig,
    service: Arc<SyllabusService>,
    auth_service: Arc<AuthService>,
    rate_limiter: Arc<RateLimiter>,
}

impl ApiServer {
    pub fn new(
        config: ApiConfig,
        service: Arc<SyllabusService>,
        auth_service: Arc<AuthService>,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_requests_per_minute,
            Duration::from_secs(60),
        ));

        Self {
            config,
            service,
            auth_service,
            rate_limiter,
        }
    }

    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = self.create_app();
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;

        info!("Starting API server on {}", addr);
        info!("CORS origins: {:?}", self.config.cors_origins);

        self.start_background_tasks();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API server stopped");
        Ok(())
    }

    fn create_app(&self) -> Router {
        Router::new()
            .merge(create_routes(
                self.service.clone(),
                self.auth_service.clone(),
            ))
            .fallback(not_found_handler)
            .layer(DefaultBodyLimit::max(self.config.max_upload_bytes))
            .layer(
                ServiceBuilder::new()
                    // Outermost layers (applied last)
                    .layer(TraceLayer::new_for_http())
                    .layer(timeout_layer(self.config.request_timeout_secs))
                    .layer(cors_layer(&self.config))
                    // Security and validation layers
                    .layer(axum::middleware::from_fn(security_headers_middleware))
                    .layer(axum::middleware::from_fn_with_state(
                        self.config.max_upload_bytes,
                        request_size_middleware,
                    ))
                    .layer(axum::middleware::from_fn_with_state(
                        self.rate_limiter.clone(),
                        rate_limiting_middleware,
                    ))
                    // Logging and request tracking
                    .layer(axum::middleware::from_fn(request_id_middleware))
                    .layer(axum::middleware::from_fn(request_logging_middleware))
                    // Makes the auth service available to extractors
                    .layer(axum::middleware::from_fn_with_state(
                        self.auth_service.clone(),
                        auth_middleware,
                    )),
            )
    }

    fn start_background_tasks(&self) {
        let rate_limiter = self.rate_limiter.clone();

        // Rate limiter cleanup task
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                rate_limiter.cleanup_old_entries();
            }
        });
    }

    pub fn get_config(&self) -> &ApiConfig {
        &self.config
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}
