pub mod chunker;
pub mod composer;
pub mod extract;
pub mod llm;
pub mod router;
pub mod service;
pub mod storage;
pub mod text;

use std::sync::Arc;

use revos_common::Result;
use revos_knowledge::{
    Embedder, InMemoryKnowledgeStore, KnowledgeConfig, KnowledgeStore, OpenAiEmbedder,
    QdrantKnowledgeStore,
};
use tracing::{info, warn};

pub struct RevosCore {
    pub service: Arc<service::SyllabusService>,
    pub users: Arc<dyn storage::UserStore>,
}

impl RevosCore {
    pub async fn new(config: CoreConfig) -> Result<Self> {
        let storage = storage::create_storage(&config.storage).await?;

        let generator: Arc<dyn llm::TextGenerator> =
            Arc::new(llm::OpenAiGenerator::new(config.openai_api_key.clone()));
        let embedder: Arc<dyn Embedder> =
            Arc::new(OpenAiEmbedder::new(config.openai_api_key.clone()));

        // A missing vector database should not keep the whole server down;
        // retrieval falls back to the in-memory store until Qdrant is back,
        // at the cost of indexed content not surviving a restart.
        let knowledge: Arc<dyn KnowledgeStore> =
            match QdrantKnowledgeStore::connect(config.knowledge.clone(), embedder).await {
                Ok(store) => {
                    info!("Connected to Qdrant at {}", config.knowledge.qdrant_url);
                    Arc::new(store)
                }
                Err(e) => {
                    warn!(
                        "Qdrant unavailable ({}), falling back to in-memory retrieval",
                        e
                    );
                    Arc::new(InMemoryKnowledgeStore::new())
                }
            };

        let service = Arc::new(service::SyllabusService::new(
            storage.clone(),
            knowledge,
            generator,
            config.answer_top_k,
            config.persona.clone(),
        ));

        Ok(Self {
            service,
            users: storage,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub storage: storage::StorageConfig,
    pub knowledge: KnowledgeConfig,
    pub openai_api_key: Option<String>,
    pub answer_top_k: usize,
    pub persona: Option<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            storage: storage::StorageConfig::default(),
            knowledge: KnowledgeConfig::default(),
            openai_api_key: None,
            answer_top_k: 5,
            persona: None,
        }
    }
}
