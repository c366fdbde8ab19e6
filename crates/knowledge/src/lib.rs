//! Owner-scoped vector storage for syllabus content

pub mod embedding;
pub mod memory;
pub mod qdrant;

pub use embedding::{Embedder, OpenAiEmbedder};
pub use memory::InMemoryKnowledgeStore;
pub use qdrant::QdrantKnowledgeStore;

use async_trait::async_trait;
use revos_common::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Course identity carried into chunk payloads at indexing time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRef {
    pub course_id: String,
    pub course_code: Option<String>,
    pub course_name: String,
}

/// One retrieved chunk, ordered by descending similarity score.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkMatch {
    pub text: String,
    pub score: f32,
}

/// Vector index over syllabus chunks. Every write is tagged with the owning
/// user and every read is pre-filtered by it; an implementation that skips
/// the owner filter is incorrect, not degraded.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Embeds and indexes the chunks for one course. Fails as a whole if any
    /// embedding fails; no partial index is written.
    async fn index_chunks(
        &self,
        owner_id: Uuid,
        course: &CourseRef,
        chunks: &[String],
    ) -> Result<usize>;

    /// Similarity search restricted to the owner, optionally narrowed to one
    /// normalized course code.
    async fn search(
        &self,
        owner_id: Uuid,
        question: &str,
        top_k: usize,
        course_filter: Option<&str>,
    ) -> Result<Vec<ChunkMatch>>;

    /// Removes every chunk indexed under (owner, course). Used by syllabus
    /// deletion to avoid orphaned chunks.
    async fn remove_course(&self, owner_id: Uuid, course_id: &str) -> Result<()>;

    /// Whether any chunk exists for this owner.
    async fn has_content(&self, owner_id: Uuid) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct KnowledgeConfig {
    pub qdrant_url: String,
    pub collection_name: String,
    pub embedding_dimension: u64,
    /// Minimum similarity score for search hits; 0.0 disables the cutoff.
    pub score_threshold: f32,
    pub request_timeout_secs: u64,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6334".to_string(),
            collection_name: "revos_syllabi".to_string(),
            embedding_dimension: embedding::EMBEDDING_DIMENSION,
            score_threshold: 0.0,
            request_timeout_secs: 10,
        }
    }
}
