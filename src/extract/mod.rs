pub mod factory;
pub mod r#trait;
pub mod types;

pub use factory::ExtractorFactory;
pub use r#trait::ContentSource;
pub use types::{CsvFile, DocxFile, JsonFile, PdfFile, TextFile};

use crate::utils;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported file types, detected purely from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Text,
    Json,
    Csv,
    Pdf,
    Docx,
    Unknown,
}

impl FileType {
    pub fn from_path(path: &Path) -> Self {
        match utils::get_extension(path).as_deref() {
            Some("txt") => FileType::Text,
            Some("json") => FileType::Json,
            Some("csv") => FileType::Csv,
            Some("pdf") => FileType::Pdf,
            Some("docx") => FileType::Docx,
            _ => FileType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Text => "text",
            FileType::Json => "json",
            FileType::Csv => "csv",
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
            FileType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extraction error: either the type has no extractor, or the extractor failed
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedType(String),
    Extraction(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedType(t) => write!(f, "unsupported file type: {}", t),
            ExtractError::Extraction(e) => write!(f, "extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extracted content: plain text, a parsed JSON value, or CSV rows keyed
/// by the header row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FileContent {
    Text(String),
    Json(serde_json::Value),
    Rows(Vec<serde_json::Value>),
}

impl FileContent {
    /// Canonical text form used for tokenization: text as-is, structured
    /// content serialized to JSON so one inverted index can score both
    pub fn canonical_text(&self) -> String {
        match self {
            FileContent::Text(text) => text.clone(),
            FileContent::Json(value) => value.to_string(),
            FileContent::Rows(rows) => serde_json::Value::Array(rows.clone()).to_string(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FileContent::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Item count for structured content, None for plain text
    pub fn structured_len(&self) -> Option<usize> {
        match self {
            FileContent::Text(_) => None,
            FileContent::Json(serde_json::Value::Object(map)) => Some(map.len()),
            FileContent::Json(serde_json::Value::Array(items)) => Some(items.len()),
            FileContent::Json(_) => Some(1),
            FileContent::Rows(rows) => Some(rows.len()),
        }
    }
}

/// The payload of one successful extraction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Extraction {
    pub filename: String,
    pub file_type: FileType,
    pub content: FileContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Read file bytes as UTF-8, replacing undecodable sequences instead of
/// aborting
pub(crate) async fn read_text_lossy(path: &Path) -> Result<String, ExtractError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| ExtractError::Extraction(format!("{}: {}", path.display(), e)))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        Err(e) => Err(ExtractError::Extraction(format!(
            "{}: {}",
            path.display(),
            e
        ))),
    }
}

/// Decode bytes as UTF-8, falling back to Latin-1. The Latin-1 decode maps
/// every byte to the same code point, so it cannot fail and doubles as the
/// replace-on-error last resort for the legacy single-byte encodings.
/// Returns the decoded text and whether the fallback was taken.
pub(crate) fn decode_with_fallback(bytes: &[u8]) -> (String, bool) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), false),
        Err(_) => (bytes.iter().map(|&b| b as char).collect(), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_path(Path::new("a.txt")), FileType::Text);
        assert_eq!(FileType::from_path(Path::new("a.json")), FileType::Json);
        assert_eq!(FileType::from_path(Path::new("a.csv")), FileType::Csv);
        assert_eq!(FileType::from_path(Path::new("a.pdf")), FileType::Pdf);
        assert_eq!(FileType::from_path(Path::new("a.docx")), FileType::Docx);
        assert_eq!(FileType::from_path(Path::new("a.exe")), FileType::Unknown);
        assert_eq!(FileType::from_path(Path::new("no_ext")), FileType::Unknown);
    }

    #[test]
    fn test_file_type_detection_is_case_insensitive() {
        assert_eq!(FileType::from_path(Path::new("A.TXT")), FileType::Text);
        assert_eq!(FileType::from_path(Path::new("b.Pdf")), FileType::Pdf);
    }

    #[test]
    fn test_canonical_text_for_plain_text() {
        let content = FileContent::Text("hello world".to_string());
        assert_eq!(content.canonical_text(), "hello world");
    }

    #[test]
    fn test_canonical_text_serializes_structured_content() {
        let content = FileContent::Json(serde_json::json!({"city": "Paris"}));
        let text = content.canonical_text();
        assert!(text.contains("city"));
        assert!(text.contains("Paris"));
    }

    #[test]
    fn test_decode_with_fallback_utf8() {
        let (text, lossy) = decode_with_fallback("héllo".as_bytes());
        assert_eq!(text, "héllo");
        assert!(!lossy);
    }

    #[test]
    fn test_decode_with_fallback_latin1() {
        // 0xE9 is 'é' in Latin-1 but invalid UTF-8 on its own
        let (text, lossy) = decode_with_fallback(&[b'c', b'a', b'f', 0xE9]);
        assert_eq!(text, "café");
        assert!(lossy);
    }
}
