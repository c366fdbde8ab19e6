use std::time::Duration;

use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use revos_common::{Result, RevosError};

pub const EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const EMBEDDING_DIMENSION: u64 = 1536;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Text to fixed-length vector. Batch calls must return one vector per input,
/// in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiEmbedder {
    pub fn new(api_key: Option<String>) -> Self {
        let config = match api_key {
            Some(key) => OpenAIConfig::new().with_api_key(key),
            None => OpenAIConfig::new(), // Uses OPENAI_API_KEY env var
        };

        Self {
            client: Client::with_config(config),
            model: EMBEDDING_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn request_embeddings(
        &self,
        input: Vec<String>,
    ) -> Result<Vec<async_openai::types::Embedding>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(input)
            .build()
            .map_err(|e| RevosError::Embedding(format!("invalid embedding request: {}", e)))?;

        let response = tokio::time::timeout(self.timeout, self.client.embeddings().create(request))
            .await
            .map_err(|_| {
                RevosError::Embedding(format!(
                    "embedding request timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| RevosError::Embedding(format!("embedding request failed: {}", e)))?;

        Ok(response.data)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let data = self.request_embeddings(vec![text.to_string()]).await?;

        data.into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RevosError::Embedding("no embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut data = self.request_embeddings(texts.to_vec()).await?;
        if data.len() != texts.len() {
            return Err(RevosError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                data.len()
            )));
        }

        // The API documents input order but indexes each entry anyway.
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}
