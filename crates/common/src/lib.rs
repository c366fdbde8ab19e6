use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Structured syllabus types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyllabusRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub course_name: String,
    pub course_code: Option<String>,
    pub course_id: String,
    pub instructor: Option<String>,
    pub semester: Option<String>,
    pub key_dates: Vec<KeyDate>,
    pub topics: Vec<String>,
    pub grading: Vec<GradingItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyDate {
    pub date: String,
    pub event: String,
    pub category: DateCategory,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum DateCategory {
    Exam,
    Quiz,
    Homework,
    Lab,
    Project,
    #[default]
    Other,
}

impl DateCategory {
    /// Maps a free-form label to a category; unknown labels become `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "exam" | "midterm" | "final" => Self::Exam,
            "quiz" => Self::Quiz,
            "homework" | "assignment" => Self::Homework,
            "lab" => Self::Lab,
            "project" => Self::Project,
            _ => Self::Other,
        }
    }
}

impl From<String> for DateCategory {
    fn from(value: String) -> Self {
        Self::from_label(&value)
    }
}

impl std::fmt::Display for DateCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DateCategory::Exam => "exam",
            DateCategory::Quiz => "quiz",
            DateCategory::Homework => "homework",
            DateCategory::Lab => "lab",
            DateCategory::Project => "project",
            DateCategory::Other => "other",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingItem {
    pub category: String,
    pub weight: f64,
    pub note: Option<String>,
}

/// Condensed view of a record for listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyllabusSummary {
    pub id: Uuid,
    pub course_name: String,
    pub course_code: Option<String>,
    pub instructor: Option<String>,
    pub semester: Option<String>,
    pub exam_count: usize,
    pub assignment_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&SyllabusRecord> for SyllabusSummary {
    fn from(record: &SyllabusRecord) -> Self {
        let exam_count = record
            .key_dates
            .iter()
            .filter(|d| matches!(d.category, DateCategory::Exam | DateCategory::Quiz))
            .count();
        let assignment_count = record
            .key_dates
            .iter()
            .filter(|d| {
                matches!(
                    d.category,
                    DateCategory::Homework | DateCategory::Lab | DateCategory::Project
                )
            })
            .count();

        Self {
            id: record.id,
            course_name: record.course_name.clone(),
            course_code: record.course_code.clone(),
            instructor: record.instructor.clone(),
            semester: record.semester.clone(),
            exam_count,
            assignment_count,
            created_at: record.created_at,
        }
    }
}

/// Grading replaces are all-or-nothing; a single bad item rejects the whole update.
pub fn validate_grading_items(items: &[GradingItem]) -> Result<()> {
    for item in items {
        if item.category.trim().is_empty() {
            return Err(RevosError::Validation(
                "grading category must not be empty".to_string(),
            ));
        }
        if !item.weight.is_finite() || item.weight < 0.0 || item.weight > 100.0 {
            return Err(RevosError::Validation(format!(
                "grading weight for '{}' must be between 0 and 100, got {}",
                item.category, item.weight
            )));
        }
    }
    Ok(())
}

// Error types
#[derive(Debug, thiserror::Error)]
pub enum RevosError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Syllabus extraction failed: {0}")]
    Extraction(String),

    #[error("Syllabus ingestion failed: {0}")]
    Ingestion(String),

    #[error("Answer generation failed: {0}")]
    Answer(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, RevosError>;

// API response types
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

// Registered account. Password hashes never leave the auth layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_record() -> SyllabusRecord {
        SyllabusRecord {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            course_name: "CSCE 314".to_string(),
            course_code: Some("CSCE314".to_string()),
            course_id: "csce_314".to_string(),
            instructor: Some("Dr. Lee".to_string()),
            semester: Some("Fall 2025".to_string()),
            key_dates: vec![
                KeyDate {
                    date: "Oct 25".to_string(),
                    event: "Midterm Exam".to_string(),
                    category: DateCategory::Exam,
                    note: None,
                },
                KeyDate {
                    date: "Nov 10".to_string(),
                    event: "Project 2".to_string(),
                    category: DateCategory::Project,
                    note: Some("group work".to_string()),
                },
            ],
            topics: vec!["Haskell".to_string(), "Type classes".to_string()],
            grading: vec![GradingItem {
                category: "Exams".to_string(),
                weight: 40.0,
                note: None,
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_counts() {
        let record = sample_record();
        let summary = SyllabusSummary::from(&record);

        assert_eq!(summary.course_name, "CSCE 314");
        assert_eq!(summary.exam_count, 1);
        assert_eq!(summary.assignment_count, 1);
    }

    #[test]
    fn test_api_response() {
        let response = ApiResponse::success("data");
        assert!(response.success);
        assert_eq!(response.data, Some("data"));

        let error_response: ApiResponse<String> = ApiResponse::error("error".to_string());
        assert!(!error_response.success);
        assert_eq!(error_response.error, Some("error".to_string()));
    }

    #[test]
    fn test_grading_validation_accepts_bounds() {
        let items = vec![
            GradingItem {
                category: "Exams".to_string(),
                weight: 0.0,
                note: None,
            },
            GradingItem {
                category: "Final".to_string(),
                weight: 100.0,
                note: None,
            },
        ];
        assert!(validate_grading_items(&items).is_ok());
    }

    #[test]
    fn test_grading_validation_rejects_out_of_range() {
        let over = vec![GradingItem {
            category: "Exams".to_string(),
            weight: 150.0,
            note: None,
        }];
        assert!(matches!(
            validate_grading_items(&over),
            Err(RevosError::Validation(_))
        ));

        let negative = vec![GradingItem {
            category: "Exams".to_string(),
            weight: -1.0,
            note: None,
        }];
        assert!(validate_grading_items(&negative).is_err());

        let nan = vec![GradingItem {
            category: "Exams".to_string(),
            weight: f64::NAN,
            note: None,
        }];
        assert!(validate_grading_items(&nan).is_err());
    }

    #[test]
    fn test_grading_validation_rejects_blank_category() {
        let items = vec![GradingItem {
            category: "   ".to_string(),
            weight: 50.0,
            note: None,
        }];
        assert!(validate_grading_items(&items).is_err());
    }

    #[test]
    fn test_date_category_aliases() {
        let parsed: DateCategory = serde_json::from_str("\"assignment\"").unwrap();
        assert_eq!(parsed, DateCategory::Homework);

        let unknown: DateCategory = serde_json::from_str("\"office-hours\"").unwrap();
        assert_eq!(unknown, DateCategory::Other);

        let exam: DateCategory = serde_json::from_str("\"exam\"").unwrap();
        assert_eq!(exam, DateCategory::Exam);
    }

    proptest! {
        #[test]
        fn accepted_grading_weights_stay_in_range(weights in proptest::collection::vec(-50.0f64..150.0, 0..8)) {
            let items: Vec<GradingItem> = weights
                .iter()
                .map(|w| GradingItem {
                    category: "Part".to_string(),
                    weight: *w,
                    note: None,
                })
                .collect();

            if validate_grading_items(&items).is_ok() {
                for item in &items {
                    prop_assert!(item.weight >= 0.0 && item.weight <= 100.0);
                }
            }
        }
    }
}
