use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use revos_common::Result;

use crate::{ChunkMatch, CourseRef, KnowledgeStore};

#[derive(Debug, Clone)]
struct StoredChunk {
    owner_id: Uuid,
    course_id: String,
    course_code: Option<String>,
    text: String,
}

/// Process-local chunk index used when no vector store is configured and by
/// tests. Scores by word overlap instead of embeddings, so zero-overlap
/// chunks are never returned.
#[derive(Default)]
pub struct InMemoryKnowledgeStore {
    chunks: RwLock<Vec<StoredChunk>>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(|w| w.to_lowercase())
        .collect()
}

fn overlap_score(question: &HashSet<String>, text: &str) -> f32 {
    if question.is_empty() {
        return 0.0;
    }
    let chunk_words = words(text);
    let shared = question.intersection(&chunk_words).count();
    shared as f32 / question.len() as f32
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn index_chunks(
        &self,
        owner_id: Uuid,
        course: &CourseRef,
        chunks: &[String],
    ) -> Result<usize> {
        let mut store = self.chunks.write().await;
        for chunk in chunks {
            store.push(StoredChunk {
                owner_id,
                course_id: course.course_id.clone(),
                course_code: course.course_code.clone(),
                text: chunk.clone(),
            });
        }

        debug!(
            "Indexed {} chunks in memory for course {}",
            chunks.len(),
            course.course_id
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
        let question_words = words(question);
        let store = self.chunks.read().await;

        let mut matches: Vec<ChunkMatch> = store
            .iter()
            .filter(|chunk| chunk.owner_id == owner_id)
            .filter(|chunk| match course_filter {
                Some(code) => chunk.course_code.as_deref() == Some(code),
                None => true,
            })
            .map(|chunk| ChunkMatch {
                text: chunk.text.clone(),
                score: overlap_score(&question_words, &chunk.text),
            })
            .filter(|m| m.score > 0.0)
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);

        Ok(matches)
    }

    async fn remove_course(&self, owner_id: Uuid, course_id: &str) -> Result<()> {
        let mut store = self.chunks.write().await;
        store.retain(|chunk| !(chunk.owner_id == owner_id && chunk.course_id == course_id));
        Ok(())
    }

    async fn has_content(&self, owner_id: Uuid) -> Result<bool> {
        let store = self.chunks.read().await;
        Ok(store.iter().any(|chunk| chunk.owner_id == owner_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(course_id: &str, code: Option<&str>) -> CourseRef {
        CourseRef {
            course_id: course_id.to_string(),
            course_code: code.map(|c| c.to_string()),
            course_name: course_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_search_is_owner_scoped() {
        let store = InMemoryKnowledgeStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        store
            .index_chunks(
                alice,
                &course("csce_314", None),
                &["CSCE 314 midterm exam on Oct 25".to_string()],
            )
            .await
            .unwrap();
        store
            .index_chunks(
                bob,
                &course("math_151", None),
                &["MATH 151 midterm exam on Oct 26".to_string()],
            )
            .await
            .unwrap();

        let results = store.search(alice, "when is my midterm exam", 5, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].text.contains("CSCE 314"));

        let results = store.search(bob, "when is my midterm exam", 5, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].text.contains("MATH 151"));
    }

    #[tokio::test]
    async fn test_course_filter_narrows_results() {
        let store = InMemoryKnowledgeStore::new();
        let owner = Uuid::new_v4();

        store
            .index_chunks(
                owner,
                &course("csce_314", Some("CSCE314")),
                &["CSCE 314 final exam in December".to_string()],
            )
            .await
            .unwrap();
        store
            .index_chunks(
                owner,
                &course("math_151", Some("MATH151")),
                &["MATH 151 final exam in December".to_string()],
            )
            .await
            .unwrap();

        let results = store
            .search(owner, "final exam", 5, Some("MATH151"))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].text.contains("MATH 151"));
    }

    #[tokio::test]
    async fn test_remove_course_clears_owner_content() {
        let store = InMemoryKnowledgeStore::new();
        let owner = Uuid::new_v4();

        store
            .index_chunks(
                owner,
                &course("csce_314", None),
                &["grading: exams 40 percent".to_string()],
            )
            .await
            .unwrap();
        assert!(store.has_content(owner).await.unwrap());

        store.remove_course(owner, "csce_314").await.unwrap();
        assert!(!store.has_content(owner).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_course_keeps_other_owners() {
        let store = InMemoryKnowledgeStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        store
            .index_chunks(alice, &course("csce_314", None), &["alice notes".to_string()])
            .await
            .unwrap();
        store
            .index_chunks(bob, &course("csce_314", None), &["bob notes".to_string()])
            .await
            .unwrap();

        store.remove_course(alice, "csce_314").await.unwrap();

        assert!(!store.has_content(alice).await.unwrap());
        assert!(store.has_content(bob).await.unwrap());
    }

    #[tokio::test]
    async fn test_search_respects_top_k_and_ordering() {
        let store = InMemoryKnowledgeStore::new();
        let owner = Uuid::new_v4();

        store
            .index_chunks(
                owner,
                &course("csce_314", None),
                &[
                    "midterm exam schedule and midterm review".to_string(),
                    "homework three due friday".to_string(),
                    "midterm location announced".to_string(),
                ],
            )
            .await
            .unwrap();

        let results = store.search(owner, "midterm exam", 2, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
        // The homework chunk shares no query words and is filtered out entirely.
        let results = store.search(owner, "midterm exam", 5, None).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_store_has_no_content() {
        let store = InMemoryKnowledgeStore::new();
        let owner = Uuid::new_v4();

        assert!(!store.has_content(owner).await.unwrap());
        let results = store.search(owner, "anything", 5, None).await.unwrap();
        assert!(results.is_empty());
    }
}
