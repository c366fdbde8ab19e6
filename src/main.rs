use anyhow::{Context, Result};
use revos_api::{auth::AuthService, ApiServer};
use revos_core::RevosCore;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod settings;

use settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads the environment.
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "revos=debug,revos_api=debug,revos_core=debug,revos_knowledge=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting RevOS server v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::from_env()?;
    if settings.using_default_jwt_secret() {
        warn!("JWT_SECRET is not set, tokens are signed with the development default");
    }

    let core = RevosCore::new(settings.core)
        .await
        .context("Failed to initialize core services")?;

    let auth_service = Arc::new(AuthService::new(settings.auth, core.users.clone()));
    let server = ApiServer::new(settings.api, core.service.clone(), auth_service);

    server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
