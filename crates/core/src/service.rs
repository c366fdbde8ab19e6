use std::sync::Arc;

use chrono::Utc;
use revos_common::{
    validate_grading_items, GradingItem, Result, RevosError, SyllabusRecord, SyllabusSummary,
};
use revos_knowledge::{ChunkMatch, CourseRef, KnowledgeStore};
use tracing::{info, warn};
use uuid::Uuid;

use crate::chunker::SyllabusChunker;
use crate::composer::AnswerComposer;
use crate::extract::{course_slug, StructuredExtractor};
use crate::llm::TextGenerator;
use crate::router::QueryRouter;
use crate::storage::SyllabusStore;

/// The ingestion and question-answering pipeline behind the HTTP layer.
///
/// Every operation takes the caller's verified owner id explicitly; nothing
/// here authenticates, and nothing reads or writes another owner's records.
pub struct SyllabusService {
    syllabi: Arc<dyn SyllabusStore>,
    knowledge: Arc<dyn KnowledgeStore>,
    extractor: StructuredExtractor,
    chunker: SyllabusChunker,
    router: QueryRouter,
    composer: AnswerComposer,
    top_k: usize,
}

impl SyllabusService {
    pub fn new(
        syllabi: Arc<dyn SyllabusStore>,
        knowledge: Arc<dyn KnowledgeStore>,
        generator: Arc<dyn TextGenerator>,
        answer_top_k: usize,
        persona: Option<String>,
    ) -> Self {
        Self {
            syllabi,
            knowledge,
            extractor: StructuredExtractor::new(generator.clone()),
            chunker: SyllabusChunker::new(),
            router: QueryRouter::new(),
            composer: AnswerComposer::new(generator, persona),
            top_k: answer_top_k,
        }
    }

    /// Extracts structured fields from raw syllabus text, persists the record
    /// and indexes its chunks for retrieval.
    ///
    /// If indexing fails after the record was written, the record is deleted
    /// again and the whole ingestion reports failure. A syllabus that exists
    /// but can never be searched would otherwise fail silently on every
    /// question.
    pub async fn ingest_syllabus(&self, owner_id: Uuid, raw_text: &str) -> Result<SyllabusRecord> {
        if raw_text.trim().is_empty() {
            return Err(RevosError::Validation(
                "syllabus text must not be empty".to_string(),
            ));
        }

        let extracted = self.extractor.extract(raw_text).await?;

        let now = Utc::now();
        let record = SyllabusRecord {
            id: Uuid::new_v4(),
            owner_id,
            course_id: course_slug(&extracted.course_name),
            course_code: self.router.detect_course_code(&extracted.course_name),
            course_name: extracted.course_name,
            instructor: extracted.instructor,
            semester: extracted.semester,
            key_dates: extracted.key_dates,
            topics: extracted.topics,
            grading: extracted.grading,
            created_at: now,
            updated_at: now,
        };

        self.syllabi.insert_syllabus(&record).await?;

        let chunks = self.chunker.chunk(&record);
        if !chunks.is_empty() {
            let course = CourseRef {
                course_id: record.course_id.clone(),
                course_code: record.course_code.clone(),
                course_name: record.course_name.clone(),
            };

            if let Err(e) = self.knowledge.index_chunks(owner_id, &course, &chunks).await {
                warn!(
                    "Indexing failed for syllabus {}, rolling back record: {}",
                    record.id, e
                );
                if let Err(cleanup) = self.syllabi.delete_syllabus(owner_id, record.id).await {
                    warn!("Rollback of syllabus {} failed: {}", record.id, cleanup);
                }
                return Err(RevosError::Ingestion(format!(
                    "failed to index syllabus content: {}",
                    e
                )));
            }
        }

        info!(
            "Ingested syllabus {} ({}) with {} chunks",
            record.id, record.course_name, chunks.len()
        );
        Ok(record)
    }

    /// Answers a question, augmented with the owner's own syllabus content
    /// when any is indexed. Retrieval failures degrade to an unaugmented
    /// answer; only the generation call itself can fail the question.
    pub async fn ask(&self, owner_id: Uuid, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RevosError::Validation(
                "question must not be empty".to_string(),
            ));
        }

        // A failed probe is not proof of emptiness; retrieval stays on and
        // its own error handling takes over.
        let knowledge_empty = !self.knowledge.has_content(owner_id).await.unwrap_or_else(|e| {
            warn!("Could not probe knowledge store: {}", e);
            true
        });
        let decision = self.router.route(question, knowledge_empty);

        let context: Vec<ChunkMatch> = if decision.use_retrieval {
            match self
                .knowledge
                .search(owner_id, question, self.top_k, decision.course_filter.as_deref())
                .await
            {
                Ok(matches) => matches,
                Err(e) => {
                    warn!("Retrieval failed, answering without context: {}", e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        self.composer.answer(question, &context).await
    }

    pub async fn list_syllabi(&self, owner_id: Uuid) -> Result<Vec<SyllabusSummary>> {
        let records = self.syllabi.list_syllabi(owner_id).await?;
        Ok(records.iter().map(SyllabusSummary::from).collect())
    }

    pub async fn get_syllabus(&self, owner_id: Uuid, syllabus_id: Uuid) -> Result<SyllabusRecord> {
        self.syllabi
            .get_syllabus(owner_id, syllabus_id)
            .await?
            .ok_or_else(|| RevosError::NotFound(format!("syllabus {} not found", syllabus_id)))
    }

    /// Deletes a syllabus and every chunk indexed for it. Chunks go first so
    /// a failure leaves the record in place and the delete retryable; orphaned
    /// vectors with no owning record would be unreachable garbage.
    pub async fn delete_syllabus(&self, owner_id: Uuid, syllabus_id: Uuid) -> Result<()> {
        let record = self.get_syllabus(owner_id, syllabus_id).await?;

        self.knowledge.remove_course(owner_id, &record.course_id).await?;
        self.syllabi.delete_syllabus(owner_id, syllabus_id).await?;

        info!("Deleted syllabus {} ({})", syllabus_id, record.course_name);
        Ok(())
    }

    /// Replaces the full grading breakdown. Out-of-range weights are rejected
    /// outright and the stored record stays untouched.
    pub async fn update_grading(
        &self,
        owner_id: Uuid,
        syllabus_id: Uuid,
        items: &[GradingItem],
    ) -> Result<SyllabusRecord> {
        validate_grading_items(items)?;
        self.syllabi.replace_grading(owner_id, syllabus_id, items).await?;
        self.get_syllabus(owner_id, syllabus_id).await
    }
}
