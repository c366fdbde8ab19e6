use std::sync::Arc;

use revos_common::{Result, RevosError};
use revos_knowledge::ChunkMatch;
use tracing::debug;

use crate::llm::{GenerationRequest, TextGenerator};

pub const DEFAULT_PERSONA: &str = "You are Rev, a friendly academic advisor for students. \
Answer questions about their courses using the syllabus information provided. Be concise \
and encouraging. If the provided information does not cover the question, say so plainly \
instead of guessing.";

const CONTEXT_HEADER: &str = "Relevant syllabus information:";
const ANSWER_MAX_TOKENS: u16 = 500;
const ANSWER_TEMPERATURE: f32 = 0.7;

/// Builds the persona + context + question prompt and returns the model's
/// raw answer text.
pub struct AnswerComposer {
    generator: Arc<dyn TextGenerator>,
    persona: String,
}

impl AnswerComposer {
    pub fn new(generator: Arc<dyn TextGenerator>, persona: Option<String>) -> Self {
        Self {
            generator,
            persona: persona.unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
        }
    }

    fn build_request(&self, question: &str, chunks: &[ChunkMatch]) -> GenerationRequest {
        let system = if chunks.is_empty() {
            self.persona.clone()
        } else {
            let context = chunks
                .iter()
                .map(|chunk| format!("• {}", chunk.text))
                .collect::<Vec<_>>()
                .join("\n");
            format!("{}\n\n{}\n{}", self.persona, CONTEXT_HEADER, context)
        };

        GenerationRequest {
            system: Some(system),
            user: question.to_string(),
            max_tokens: ANSWER_MAX_TOKENS,
            temperature: ANSWER_TEMPERATURE,
        }
    }

    pub async fn answer(&self, question: &str, chunks: &[ChunkMatch]) -> Result<String> {
        debug!("Composing answer with {} context chunks", chunks.len());

        let request = self.build_request(question, chunks);
        self.generator
            .generate(request)
            .await
            .map_err(|e| RevosError::Answer(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockTextGenerator;

    fn chunk(text: &str) -> ChunkMatch {
        ChunkMatch {
            text: text.to_string(),
            score: 0.9,
        }
    }

    #[test]
    fn test_request_includes_labeled_context() {
        let composer = AnswerComposer::new(Arc::new(MockTextGenerator::new()), None);
        let request = composer.build_request(
            "when is the midterm?",
            &[chunk("CSCE 314 key dates: Midterm Exam on Oct 25")],
        );

        let system = request.system.unwrap();
        assert!(system.starts_with(DEFAULT_PERSONA));
        assert!(system.contains(CONTEXT_HEADER));
        assert!(system.contains("• CSCE 314 key dates"));
        assert_eq!(request.user, "when is the midterm?");
    }

    #[test]
    fn test_request_without_chunks_has_no_context_header() {
        let composer = AnswerComposer::new(Arc::new(MockTextGenerator::new()), None);
        let request = composer.build_request("any tips for studying?", &[]);

        let system = request.system.unwrap();
        assert_eq!(system, DEFAULT_PERSONA);
        assert!(!system.contains(CONTEXT_HEADER));
    }

    #[test]
    fn test_custom_persona_replaces_default() {
        let composer = AnswerComposer::new(
            Arc::new(MockTextGenerator::new()),
            Some("You are a terse teaching assistant.".to_string()),
        );
        let request = composer.build_request("hello", &[]);

        assert_eq!(
            request.system.unwrap(),
            "You are a terse teaching assistant."
        );
    }

    #[tokio::test]
    async fn test_generation_failure_maps_to_answer_error() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Err(RevosError::Api("rate limited".to_string())));

        let composer = AnswerComposer::new(Arc::new(generator), None);
        let result = composer.answer("when is the final?", &[]).await;

        assert!(matches!(result, Err(RevosError::Answer(_))));
    }

    #[tokio::test]
    async fn test_answer_returns_generated_text() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Ok("The midterm is on Oct 25.".to_string()));

        let composer = AnswerComposer::new(Arc::new(generator), None);
        let answer = composer.answer("when is the midterm?", &[]).await.unwrap();

        assert_eq!(answer, "The midterm is on Oct 25.");
    }
}
