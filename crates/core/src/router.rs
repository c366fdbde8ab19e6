use regex::Regex;

/// Outcome of inspecting a question before answering it.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDecision {
    pub use_retrieval: bool,
    pub course_filter: Option<String>,
}

/// Decides whether a question goes through retrieval and whether the search
/// should be narrowed to one course. Course detection is a heuristic over
/// course-code shapes, not a parser; a miss degrades to unfiltered retrieval.
pub struct QueryRouter {
    patterns: Vec<Regex>,
}

impl QueryRouter {
    pub fn new() -> Self {
        Self {
            patterns: vec![
                // Spaced or hyphenated department code: "CSCE 314", "MATH-151"
                Regex::new(r"\b([A-Z]{2,5})[ \-]?([0-9]{3,4})\b").unwrap(),
                // Attached form in any case: "csce314"
                Regex::new(r"(?i)\b([a-z]{2,5})([0-9]{3,4})\b").unwrap(),
            ],
        }
    }

    /// Retrieval is on unless the caller already knows the owner has no
    /// indexed content. The emptiness probe stays outside so this is a pure
    /// function of its arguments.
    pub fn route(&self, question: &str, knowledge_empty: bool) -> RoutingDecision {
        RoutingDecision {
            use_retrieval: !knowledge_empty,
            course_filter: self.detect_course_code(question),
        }
    }

    /// First course-code-looking token, normalized to uppercase letters plus
    /// digits ("csce314" -> "CSCE314").
    pub fn detect_course_code(&self, text: &str) -> Option<String> {
        for pattern in &self.patterns {
            if let Some(caps) = pattern.captures(text) {
                return Some(format!("{}{}", caps[1].to_uppercase(), &caps[2]));
            }
        }
        None
    }
}

impl Default for QueryRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_spaced_course_code() {
        let router = QueryRouter::new();
        assert_eq!(
            router.detect_course_code("When is the CSCE 314 midterm?"),
            Some("CSCE314".to_string())
        );
    }

    #[test]
    fn test_detects_hyphenated_course_code() {
        let router = QueryRouter::new();
        assert_eq!(
            router.detect_course_code("what is the MATH-151 grading breakdown"),
            Some("MATH151".to_string())
        );
    }

    #[test]
    fn test_detects_attached_lowercase_code() {
        let router = QueryRouter::new();
        assert_eq!(
            router.detect_course_code("csce314 exam schedule"),
            Some("CSCE314".to_string())
        );
    }

    #[test]
    fn test_no_code_yields_no_filter() {
        let router = QueryRouter::new();
        assert_eq!(router.detect_course_code("when is my midterm?"), None);
    }

    #[test]
    fn test_plain_years_are_not_codes() {
        let router = QueryRouter::new();
        // Lowercase words followed by a spaced number stay unmatched.
        assert_eq!(router.detect_course_code("what happened in 2025"), None);
        assert_eq!(router.detect_course_code("my score was 100"), None);
    }

    #[test]
    fn test_route_uses_retrieval_when_store_has_content() {
        let router = QueryRouter::new();
        let decision = router.route("when is the CSCE 314 final?", false);
        assert!(decision.use_retrieval);
        assert_eq!(decision.course_filter, Some("CSCE314".to_string()));
    }

    #[test]
    fn test_route_skips_retrieval_for_empty_store() {
        let router = QueryRouter::new();
        let decision = router.route("when is my final?", true);
        assert!(!decision.use_retrieval);
        assert_eq!(decision.course_filter, None);
    }
}
