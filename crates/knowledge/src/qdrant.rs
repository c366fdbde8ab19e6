use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance,
    Filter, PointStruct, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{debug, info};
use uuid::Uuid;

use revos_common::{Result, RevosError};

use crate::{ChunkMatch, CourseRef, Embedder, KnowledgeConfig, KnowledgeStore};

/// Qdrant-backed chunk index. The owner filter is part of every search and
/// delete request sent to the server, never applied client-side.
pub struct QdrantKnowledgeStore {
    client: Qdrant,
    embedder: Arc<dyn Embedder>,
    config: KnowledgeConfig,
}

impl QdrantKnowledgeStore {
    pub async fn connect(config: KnowledgeConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let client = Qdrant::from_url(&config.qdrant_url)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RevosError::VectorStore(format!("failed to create client: {}", e)))?;

        let store = Self {
            client,
            embedder,
            config,
        };

        store.ensure_collection().await?;
        Ok(store)
    }

    async fn ensure_collection(&self) -> Result<()> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| RevosError::VectorStore(format!("failed to list collections: {}", e)))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.config.collection_name);

        if !exists {
            info!("Creating collection: {}", self.config.collection_name);

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.config.collection_name).vectors_config(
                        VectorParamsBuilder::new(self.config.embedding_dimension, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| {
                    RevosError::VectorStore(format!("failed to create collection: {}", e))
                })?;
        }

        Ok(())
    }

    /// Owner condition first, always; course code narrows when present.
    fn scope_filter(owner_id: Uuid, course_code: Option<&str>) -> Filter {
        let mut conditions = vec![Condition::matches("owner_id", owner_id.to_string())];
        if let Some(code) = course_code {
            conditions.push(Condition::matches("course_code", code.to_string()));
        }
        Filter::must(conditions)
    }

    fn course_filter(owner_id: Uuid, course_id: &str) -> Filter {
        Filter::must(vec![
            Condition::matches("owner_id", owner_id.to_string()),
            Condition::matches("course_id", course_id.to_string()),
        ])
    }
}

#[async_trait]
impl KnowledgeStore for QdrantKnowledgeStore {
    async fn index_chunks(
        &self,
        owner_id: Uuid,
        course: &CourseRef,
        chunks: &[String],
    ) -> Result<usize> {
        if chunks.is_empty() {
            debug!("No chunks to index for course {}", course.course_id);
            return Ok(0);
        }

        let vectors = self.embedder.embed_batch(chunks).await?;

        let mut points = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.iter().zip(vectors) {
            let payload: Payload = serde_json::json!({
                "owner_id": owner_id.to_string(),
                "course_id": course.course_id,
                "course_code": course.course_code.clone().unwrap_or_default(),
                "course_name": course.course_name,
                "text": chunk,
                "created_at": chrono::Utc::now().to_rfc3339(),
            })
            .try_into()
            .map_err(|e| RevosError::VectorStore(format!("invalid chunk payload: {}", e)))?;

            points.push(PointStruct::new(
                Uuid::new_v4().to_string(),
                vector,
                payload,
            ));
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.config.collection_name, points))
            .await
            .map_err(|e| RevosError::VectorStore(format!("upsert failed: {}", e)))?;

        info!(
            "Indexed {} chunks for course {} (owner {})",
            chunks.len(),
            course.course_id,
            owner_id
        );

        Ok(chunks.len())
    }

    async fn search(
        &self,
        owner_id: Uuid,
        question: &str,
        top_k: usize,
        course_filter: Option<&str>,
    ) -> Result<Vec<ChunkMatch>> {
        let query_vector = self.embedder.embed(question).await?;

        let mut request = SearchPointsBuilder::new(
            &self.config.collection_name,
            query_vector,
            top_k as u64,
        )
        .filter(Self::scope_filter(owner_id, course_filter))
        .with_payload(true);

        if self.config.score_threshold > 0.0 {
            request = request.score_threshold(self.config.score_threshold);
        }

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(|e| RevosError::VectorStore(format!("search failed: {}", e)))?;

        let matches: Vec<ChunkMatch> = response
            .result
            .into_iter()
            .filter_map(|point| {
                point
                    .payload
                    .get("text")
                    .and_then(|v| v.as_str())
                    .map(|text| ChunkMatch {
                        text: text.to_string(),
                        score: point.score,
                    })
            })
            .collect();

        debug!(
            "Search returned {} chunks for owner {} (filter: {:?})",
            matches.len(),
            owner_id,
            course_filter
        );

        Ok(matches)
    }

    async fn remove_course(&self, owner_id: Uuid, course_id: &str) -> Result<()> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.config.collection_name)
                    .points(Self::course_filter(owner_id, course_id))
                    .wait(true),
            )
            .await
            .map_err(|e| RevosError::VectorStore(format!("delete failed: {}", e)))?;

        info!("Removed chunks for course {} (owner {})", course_id, owner_id);
        Ok(())
    }

    async fn has_content(&self, owner_id: Uuid) -> Result<bool> {
        let response = self
            .client
            .count(
                CountPointsBuilder::new(&self.config.collection_name)
                    .filter(Self::scope_filter(owner_id, None))
                    .exact(false),
            )
            .await
            .map_err(|e| RevosError::VectorStore(format!("count failed: {}", e)))?;

        Ok(response.result.map(|r| r.count).unwrap_or(0) > 0)
    }
}
