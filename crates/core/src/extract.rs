use std::collections::HashSet;
use std::sync::Arc;

use revos_common::{DateCategory, GradingItem, KeyDate, Result, RevosError};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::llm::{GenerationRequest, TextGenerator};

pub const DEFAULT_COURSE_NAME: &str = "Unknown Course";

const EXTRACTION_MAX_TOKENS: u16 = 5000;
const EXTRACTION_TEMPERATURE: f32 = 0.0;

const EXTRACTION_INSTRUCTION: &str = r#"Extract the key information from the syllabus text and reply with ONLY a JSON object, no prose, in this shape:
{"course": "", "instructor": "", "semester": "", "keyDates": [{"date": "", "event": "", "type": "exam|quiz|homework|lab|project|other", "note": ""}], "topics": [""], "gradingBreakdown": [{"category": "", "weight": 0, "note": ""}]}
Use empty strings and empty arrays for anything the syllabus does not state. Weights are percentages as plain numbers."#;

/// Content fields produced by extraction. Identity and timestamps are
/// assigned by the caller when the record is persisted.
#[derive(Debug, Clone)]
pub struct ExtractedSyllabus {
    pub course_name: String,
    pub instructor: Option<String>,
    pub semester: Option<String>,
    pub key_dates: Vec<KeyDate>,
    pub topics: Vec<String>,
    pub grading: Vec<GradingItem>,
}

/// LLM-backed extraction of structured fields from raw syllabus text.
///
/// A failed model call is an error; a malformed model reply is not. The reply
/// is parsed defensively and degrades field by field to defaults, because a
/// partially extracted syllabus is more useful than a rejected upload.
pub struct StructuredExtractor {
    generator: Arc<dyn TextGenerator>,
}

impl StructuredExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn extract(&self, raw_text: &str) -> Result<ExtractedSyllabus> {
        let request = GenerationRequest {
            system: Some(EXTRACTION_INSTRUCTION.to_string()),
            user: format!("Syllabus text:\n{}", raw_text),
            max_tokens: EXTRACTION_MAX_TOKENS,
            temperature: EXTRACTION_TEMPERATURE,
        };

        let reply = self
            .generator
            .generate(request)
            .await
            .map_err(|e| RevosError::Extraction(e.to_string()))?;

        debug!("Extraction reply received ({} bytes)", reply.len());
        Ok(parse_reply(&reply))
    }
}

// Loose mirror of the expected reply. Every field defaults so missing keys
// never fail the parse; list items are parsed one by one so a single bad
// entry is skipped instead of sinking the record.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawSyllabus {
    course: String,
    instructor: String,
    semester: String,
    key_dates: Vec<serde_json::Value>,
    topics: Vec<String>,
    grading_breakdown: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawKeyDate {
    date: String,
    event: String,
    #[serde(rename = "type")]
    kind: String,
    note: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawGradingItem {
    category: String,
    weight: serde_json::Value,
    note: String,
}

fn parse_reply(reply: &str) -> ExtractedSyllabus {
    let raw = match locate_json(reply).and_then(|blob| serde_json::from_str::<RawSyllabus>(blob).ok())
    {
        Some(raw) => raw,
        None => {
            warn!("Extraction reply was not usable JSON, falling back to defaults");
            RawSyllabus::default()
        }
    };

    normalize(raw)
}

/// Models wrap JSON in prose more often than not; take the outermost braced
/// region and try that.
fn locate_json(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&reply[start..=end])
}

fn normalize(raw: RawSyllabus) -> ExtractedSyllabus {
    let course_name = {
        let trimmed = raw.course.trim();
        if trimmed.is_empty() {
            DEFAULT_COURSE_NAME.to_string()
        } else {
            trimmed.to_string()
        }
    };

    let mut seen_dates: HashSet<(String, String)> = HashSet::new();
    let key_dates: Vec<KeyDate> = raw
        .key_dates
        .into_iter()
        .filter_map(|value| serde_json::from_value::<RawKeyDate>(value).ok())
        .filter_map(|raw_date| {
            let date = raw_date.date.trim().to_string();
            let event = raw_date.event.trim().to_string();
            if date.is_empty() && event.is_empty() {
                return None;
            }
            if !seen_dates.insert((date.to_lowercase(), event.to_lowercase())) {
                return None;
            }
            Some(KeyDate {
                date,
                event,
                category: DateCategory::from_label(&raw_date.kind),
                note: optional(raw_date.note),
            })
        })
        .collect();

    let mut seen_topics: HashSet<String> = HashSet::new();
    let topics: Vec<String> = raw
        .topics
        .into_iter()
        .filter_map(|topic| {
            let trimmed = topic.trim().to_string();
            if trimmed.is_empty() || !seen_topics.insert(trimmed.to_lowercase()) {
                None
            } else {
                Some(trimmed)
            }
        })
        .collect();

    let grading: Vec<GradingItem> = raw
        .grading_breakdown
        .into_iter()
        .filter_map(|value| serde_json::from_value::<RawGradingItem>(value).ok())
        .filter_map(|item| {
            let category = item.category.trim().to_string();
            if category.is_empty() {
                return None;
            }
            Some(GradingItem {
                category,
                weight: parse_weight(&item.weight),
                note: optional(item.note),
            })
        })
        .collect();

    ExtractedSyllabus {
        course_name,
        instructor: optional(raw.instructor),
        semester: optional(raw.semester),
        key_dates,
        topics,
        grading,
    }
}

/// Blank strings and "unknown" placeholders both mean "not stated".
fn optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.to_lowercase().starts_with("unknown") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Accepts numbers and numeric strings ("40", "40%"); anything else is 0.
/// Extracted weights are clamped into range, unlike user edits which are
/// validated strictly.
fn parse_weight(value: &serde_json::Value) -> f64 {
    let weight = match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };

    if weight.is_finite() {
        weight.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Stable slug for tagging chunks in the vector store ("CSCE 314" ->
/// "csce_314").
pub fn course_slug(course_name: &str) -> String {
    let mut slug = String::with_capacity(course_name.len());
    let mut pending_separator = false;

    for c in course_name.chars() {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            slug.extend(c.to_lowercase());
            pending_separator = false;
        } else {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        "unknown_course".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockTextGenerator;

    const FULL_REPLY: &str = r#"{
        "course": "CSCE 314",
        "instructor": "Dr. Lee",
        "semester": "Fall 2025",
        "keyDates": [
            {"date": "Oct 25", "event": "Midterm Exam", "type": "exam", "note": ""},
            {"date": "Nov 10", "event": "Project 2", "type": "project", "note": "group work"}
        ],
        "topics": ["Haskell", "Type classes", "haskell"],
        "gradingBreakdown": [
            {"category": "Exams", "weight": 40, "note": ""},
            {"category": "Projects", "weight": "20%", "note": "two projects"}
        ]
    }"#;

    #[test]
    fn test_parses_full_reply() {
        let extracted = parse_reply(FULL_REPLY);

        assert_eq!(extracted.course_name, "CSCE 314");
        assert_eq!(extracted.instructor.as_deref(), Some("Dr. Lee"));
        assert_eq!(extracted.semester.as_deref(), Some("Fall 2025"));
        assert_eq!(extracted.key_dates.len(), 2);
        assert_eq!(extracted.key_dates[0].category, DateCategory::Exam);
        assert_eq!(extracted.key_dates[1].note.as_deref(), Some("group work"));
        assert_eq!(extracted.grading.len(), 2);
        assert_eq!(extracted.grading[0].weight, 40.0);
        assert_eq!(extracted.grading[1].weight, 20.0);
    }

    #[test]
    fn test_json_wrapped_in_prose_is_still_parsed() {
        let reply = format!("Sure, here is the extraction:\n{}\nHope that helps!", FULL_REPLY);
        let extracted = parse_reply(&reply);
        assert_eq!(extracted.course_name, "CSCE 314");
    }

    #[test]
    fn test_non_json_reply_degrades_to_defaults() {
        let extracted = parse_reply("I could not find a syllabus in that text.");

        assert_eq!(extracted.course_name, DEFAULT_COURSE_NAME);
        assert!(extracted.instructor.is_none());
        assert!(extracted.key_dates.is_empty());
        assert!(extracted.topics.is_empty());
        assert!(extracted.grading.is_empty());
    }

    #[test]
    fn test_partial_reply_fills_defaults() {
        let extracted = parse_reply(r#"{"course": "MATH 151"}"#);

        assert_eq!(extracted.course_name, "MATH 151");
        assert!(extracted.semester.is_none());
        assert!(extracted.key_dates.is_empty());
    }

    #[test]
    fn test_topics_deduplicate_case_insensitively() {
        let extracted = parse_reply(FULL_REPLY);
        assert_eq!(extracted.topics, vec!["Haskell", "Type classes"]);
    }

    #[test]
    fn test_duplicate_dates_keep_first_occurrence() {
        let reply = r#"{"keyDates": [
            {"date": "Oct 25", "event": "Midterm", "type": "exam"},
            {"date": "oct 25", "event": "midterm", "type": "exam"},
            {"date": "", "event": "", "type": "other"}
        ]}"#;
        let extracted = parse_reply(reply);
        assert_eq!(extracted.key_dates.len(), 1);
        assert_eq!(extracted.key_dates[0].date, "Oct 25");
    }

    #[test]
    fn test_malformed_list_items_are_skipped() {
        let reply = r#"{
            "course": "CSCE 314",
            "keyDates": [{"date": 12345}, {"date": "Dec 12", "event": "Final", "type": "final"}],
            "gradingBreakdown": ["not an object", {"category": "Final", "weight": 50}]
        }"#;
        let extracted = parse_reply(reply);

        assert_eq!(extracted.key_dates.len(), 1);
        assert_eq!(extracted.key_dates[0].category, DateCategory::Exam);
        assert_eq!(extracted.grading.len(), 1);
    }

    #[test]
    fn test_out_of_range_weights_are_clamped() {
        let reply = r#"{"gradingBreakdown": [
            {"category": "Exams", "weight": 150},
            {"category": "Extra", "weight": -10},
            {"category": "Fuzzy", "weight": "n/a"}
        ]}"#;
        let extracted = parse_reply(reply);

        assert_eq!(extracted.grading[0].weight, 100.0);
        assert_eq!(extracted.grading[1].weight, 0.0);
        assert_eq!(extracted.grading[2].weight, 0.0);
    }

    #[test]
    fn test_unknown_placeholders_become_none() {
        let reply =
            r#"{"course": "CSCE 314", "instructor": "Unknown Instructor", "semester": " "}"#;
        let extracted = parse_reply(reply);

        assert!(extracted.instructor.is_none());
        assert!(extracted.semester.is_none());
    }

    #[test]
    fn test_course_slug_shapes() {
        assert_eq!(course_slug("CSCE 314"), "csce_314");
        assert_eq!(course_slug("MATH-151: Calculus I"), "math_151_calculus_i");
        assert_eq!(course_slug("Unknown Course"), "unknown_course");
        assert_eq!(course_slug("???"), "unknown_course");
    }

    #[tokio::test]
    async fn test_generator_failure_surfaces_as_extraction_error() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Err(RevosError::Api("timed out".to_string())));

        let extractor = StructuredExtractor::new(Arc::new(generator));
        let result = extractor.extract("Course: CSCE 314").await;

        assert!(matches!(result, Err(RevosError::Extraction(_))));
    }

    #[tokio::test]
    async fn test_extract_round_trip_through_generator() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .withf(|request| request.user.contains("Course: CSCE 314"))
            .returning(|_| Ok(FULL_REPLY.to_string()));

        let extractor = StructuredExtractor::new(Arc::new(generator));
        let extracted = extractor
            .extract("Course: CSCE 314\nInstructor: Dr. Lee")
            .await
            .unwrap();

        assert_eq!(extracted.course_name, "CSCE 314");
    }
}
