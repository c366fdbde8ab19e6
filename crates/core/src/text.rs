use std::path::Path;

use revos_common::{Result, RevosError};
use tracing::debug;

/// Turns an uploaded document into raw text. Plain text and text-based PDFs
/// only; layout analysis and scanned documents are out of scope.
pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        let text = match extension.as_str() {
            "txt" | "text" | "md" => String::from_utf8_lossy(bytes).into_owned(),
            "pdf" => pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
                RevosError::Validation(format!("could not extract text from PDF: {}", e))
            })?,
            other => {
                return Err(RevosError::Validation(format!(
                    "unsupported file type '{}', upload a .txt or .pdf file",
                    other
                )))
            }
        };

        if text.trim().is_empty() {
            return Err(RevosError::Validation(
                "file contains no extractable text".to_string(),
            ));
        }

        debug!("Extracted {} characters from {}", text.len(), filename);
        Ok(text)
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}
