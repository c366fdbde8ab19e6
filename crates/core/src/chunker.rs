use revos_common::{DateCategory, GradingItem, KeyDate, SyllabusRecord};
use tiktoken_rs::{p50k_base, CoreBPE};

/// Upper bound per chunk. A tuning knob, not a contract; a single oversized
/// entry still becomes its own chunk rather than being dropped.
pub const MAX_CHUNK_TOKENS: usize = 400;

/// Splits a structured record into short chunks grouped by field (overview,
/// key dates, topics, grading). Every chunk carries the course label so it
/// stays meaningful when retrieved on its own. Pure and deterministic.
pub struct SyllabusChunker {
    bpe: CoreBPE,
}

impl SyllabusChunker {
    pub fn new() -> Self {
        // Embedded encoding, loading cannot fail at runtime
        Self {
            bpe: p50k_base().unwrap(),
        }
    }

    pub fn chunk(&self, record: &SyllabusRecord) -> Vec<String> {
        if record_is_empty(record) {
            return Vec::new();
        }

        let label = course_label(record);
        let mut chunks = Vec::new();

        let mut overview = format!("Course: {}", label);
        if let Some(instructor) = &record.instructor {
            overview.push_str(&format!(", taught by {}", instructor));
        }
        overview.push('.');
        chunks.push(overview);

        let date_entries: Vec<String> = record.key_dates.iter().map(format_key_date).collect();
        chunks.extend(self.grouped(&format!("{} key dates: ", label), date_entries));

        let topic_entries: Vec<String> = record
            .topics
            .iter()
            .map(|topic| topic.trim().to_string())
            .filter(|topic| !topic.is_empty())
            .collect();
        chunks.extend(self.grouped(&format!("{} topics: ", label), topic_entries));

        let grading_entries: Vec<String> = record.grading.iter().map(format_grading_item).collect();
        chunks.extend(self.grouped(&format!("{} grading: ", label), grading_entries));

        chunks
    }

    fn token_count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Greedy grouping: entries are appended to the current chunk until the
    /// token bound would be exceeded, then a new chunk starts with the same
    /// prefix.
    fn grouped(&self, prefix: &str, entries: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for entry in entries {
            let candidate = if current.is_empty() {
                format!("{}{}", prefix, entry)
            } else {
                format!("{}; {}", current, entry)
            };

            if !current.is_empty() && self.token_count(&candidate) > MAX_CHUNK_TOKENS {
                chunks.push(current);
                current = format!("{}{}", prefix, entry);
            } else {
                current = candidate;
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }
}

impl Default for SyllabusChunker {
    fn default() -> Self {
        Self::new()
    }
}

fn record_is_empty(record: &SyllabusRecord) -> bool {
    record.key_dates.is_empty()
        && record.topics.is_empty()
        && record.grading.is_empty()
        && record.instructor.is_none()
        && record.semester.is_none()
}

fn course_label(record: &SyllabusRecord) -> String {
    match &record.semester {
        Some(semester) => format!("{} ({})", record.course_name, semester),
        None => record.course_name.clone(),
    }
}

fn format_key_date(date: &KeyDate) -> String {
    let mut entry = format!("{} on {}", date.event, date.date);
    if date.category != DateCategory::Other {
        entry.push_str(&format!(" ({})", date.category));
    }
    if let Some(note) = &date.note {
        entry.push_str(&format!(", note: {}", note));
    }
    entry
}

fn format_grading_item(item: &GradingItem) -> String {
    let weight = if item.weight.fract() == 0.0 {
        format!("{:.0}", item.weight)
    } else {
        format!("{}", item.weight)
    };

    let mut entry = format!("{} {}%", item.category, weight);
    if let Some(note) = &item.note {
        entry.push_str(&format!(" ({})", note));
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn record_with(
        key_dates: Vec<KeyDate>,
        topics: Vec<String>,
        grading: Vec<GradingItem>,
    ) -> SyllabusRecord {
        SyllabusRecord {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            course_name: "CSCE 314".to_string(),
            course_code: Some("CSCE314".to_string()),
            course_id: "csce_314".to_string(),
            instructor: Some("Dr. Lee".to_string()),
            semester: Some("Fall 2025".to_string()),
            key_dates,
            topics,
            grading,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_record() -> SyllabusRecord {
        record_with(
            vec![KeyDate {
                date: "Oct 25".to_string(),
                event: "Midterm Exam".to_string(),
                category: DateCategory::Exam,
                note: None,
            }],
            vec!["Haskell".to_string(), "Type classes".to_string()],
            vec![GradingItem {
                category: "Exams".to_string(),
                weight: 40.0,
                note: None,
            }],
        )
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let chunker = SyllabusChunker::new();
        let record = sample_record();

        assert_eq!(chunker.chunk(&record), chunker.chunk(&record));
    }

    #[test]
    fn test_empty_record_yields_no_chunks() {
        let chunker = SyllabusChunker::new();
        let mut record = record_with(Vec::new(), Vec::new(), Vec::new());
        record.instructor = None;
        record.semester = None;

        assert!(chunker.chunk(&record).is_empty());
    }

    #[test]
    fn test_every_chunk_carries_the_course_label() {
        let chunker = SyllabusChunker::new();
        let chunks = chunker.chunk(&sample_record());

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.contains("CSCE 314"), "missing label in: {}", chunk);
        }
    }

    #[test]
    fn test_field_groups_become_separate_chunks() {
        let chunker = SyllabusChunker::new();
        let chunks = chunker.chunk(&sample_record());

        assert_eq!(chunks.len(), 4);
        assert!(chunks[0].starts_with("Course: CSCE 314 (Fall 2025), taught by Dr. Lee"));
        assert!(chunks[1].contains("key dates: Midterm Exam on Oct 25 (exam)"));
        assert!(chunks[2].contains("topics: Haskell; Type classes"));
        assert!(chunks[3].contains("grading: Exams 40%"));
    }

    #[test]
    fn test_long_date_lists_split_within_token_bound() {
        let chunker = SyllabusChunker::new();
        let dates: Vec<KeyDate> = (0..120)
            .map(|i| KeyDate {
                date: format!("Week {} Friday", i),
                event: format!("Reading quiz number {} covering chapter {}", i, i),
                category: DateCategory::Quiz,
                note: None,
            })
            .collect();
        let record = record_with(dates, Vec::new(), Vec::new());

        let chunks = chunker.chunk(&record);
        let date_chunks: Vec<&String> =
            chunks.iter().filter(|c| c.contains("key dates:")).collect();

        assert!(date_chunks.len() > 1);
        for chunk in date_chunks {
            assert!(chunker.token_count(chunk) <= MAX_CHUNK_TOKENS);
        }
    }

    #[test]
    fn test_grading_notes_and_fractional_weights() {
        let chunker = SyllabusChunker::new();
        let record = record_with(
            Vec::new(),
            Vec::new(),
            vec![GradingItem {
                category: "Quizzes".to_string(),
                weight: 12.5,
                note: Some("lowest dropped".to_string()),
            }],
        );

        let chunks = chunker.chunk(&record);
        let grading = chunks.iter().find(|c| c.contains("grading:")).unwrap();
        assert!(grading.contains("Quizzes 12.5% (lowest dropped)"));
    }
}
