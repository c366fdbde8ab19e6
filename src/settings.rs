use anyhow::{Context, Result};
use revos_api::{auth::AuthConfig, ApiConfig};
use revos_core::{storage::StorageConfig, CoreConfig};
use revos_knowledge::KnowledgeConfig;
use std::env;

/// Runtime configuration assembled from environment variables.
///
/// Every knob carries a development default, so `revos-server` starts with
/// an empty environment. Deployments override the variables named in
/// `from_env`; a `.env` file covers local runs.
#[derive(Debug, Clone)]
pub struct Settings {
    pub core: CoreConfig,
    pub api: ApiConfig,
    pub auth: AuthConfig,
}

impl Settings {
    /// Loads settings, starting from the library defaults and applying
    /// whatever environment variables are set on top.
    pub fn from_env() -> Result<Self> {
        let mut storage = StorageConfig::default();
        if let Ok(url) = env::var("DATABASE_URL") {
            storage.database_url = url;
        }
        if let Ok(max) = env::var("DATABASE_MAX_CONNECTIONS") {
            storage.max_connections = max
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a number")?;
        }

        let mut knowledge = KnowledgeConfig::default();
        if let Ok(url) = env::var("QDRANT_URL") {
            knowledge.qdrant_url = url;
        }
        if let Ok(name) = env::var("QDRANT_COLLECTION") {
            knowledge.collection_name = name;
        }
        if let Ok(threshold) = env::var("SEARCH_SCORE_THRESHOLD") {
            knowledge.score_threshold = threshold
                .parse()
                .context("SEARCH_SCORE_THRESHOLD must be a number")?;
        }

        let mut core = CoreConfig {
            storage,
            knowledge,
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            ..CoreConfig::default()
        };
        if let Ok(top_k) = env::var("ANSWER_TOP_K") {
            core.answer_top_k = top_k.parse().context("ANSWER_TOP_K must be a number")?;
        }
        if let Ok(persona) = env::var("ANSWER_PERSONA") {
            core.persona = Some(persona);
        }

        let mut api = ApiConfig::default();
        if let Ok(host) = env::var("HOST") {
            api.host = host;
        }
        if let Ok(port) = env::var("PORT") {
            api.port = port.parse().context("PORT must be a valid port number")?;
        }
        if let Ok(origins) = env::var("CORS_ORIGINS") {
            api.cors_origins = parse_origins(&origins);
        }
        if let Ok(bytes) = env::var("MAX_UPLOAD_BYTES") {
            api.max_upload_bytes = bytes.parse().context("MAX_UPLOAD_BYTES must be a number")?;
        }
        if let Ok(rpm) = env::var("RATE_LIMIT_PER_MINUTE") {
            api.rate_limit_requests_per_minute =
                rpm.parse().context("RATE_LIMIT_PER_MINUTE must be a number")?;
        }
        if let Ok(secs) = env::var("REQUEST_TIMEOUT_SECS") {
            api.request_timeout_secs =
                secs.parse().context("REQUEST_TIMEOUT_SECS must be a number")?;
        }

        let mut auth = AuthConfig::default();
        if let Ok(secret) = env::var("JWT_SECRET") {
            auth.jwt_secret = secret;
        }
        if let Ok(hours) = env::var("TOKEN_EXPIRY_HOURS") {
            auth.token_expiry_hours =
                hours.parse().context("TOKEN_EXPIRY_HOURS must be a number")?;
        }

        Ok(Self { core, api, auth })
    }

    /// True when the JWT secret is still the built-in development value.
    pub fn using_default_jwt_secret(&self) -> bool {
        self.auth.jwt_secret == AuthConfig::default().jwt_secret
    }
}

/// Splits a comma-separated origin list, dropping empty entries.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
