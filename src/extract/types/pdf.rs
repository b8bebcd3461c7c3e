use crate::extract::{ContentSource, ExtractError, FileContent, FileType};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// PDF file handler. Compiled without the `pdf` feature it reports that
/// support is unavailable instead of failing.
#[derive(Debug)]
pub struct PdfFile {
    path: std::path::PathBuf,
}

impl PdfFile {
    pub fn new(path: std::path::PathBuf) -> Self {
        Self { path }
    }

    fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[async_trait]
impl ContentSource for PdfFile {
    #[cfg(feature = "pdf")]
    async fn extract_impl(&self) -> Result<FileContent, ExtractError> {
        let path = self.path.clone();
        let filename = self.filename();
        let text = tokio::task::spawn_blocking(move || -> Result<String, ExtractError> {
            use lopdf::Document;

            let doc = Document::load(&path).map_err(|e| {
                ExtractError::Extraction(format!("failed to load PDF {}: {}", path.display(), e))
            })?;

            let mut text_content = String::new();
            for page_num in doc.get_pages().keys() {
                if let Ok(page_text) = doc.extract_text(&[*page_num]) {
                    text_content.push_str(&page_text);
                    text_content.push('\n');
                }
            }

            if text_content.trim().is_empty() {
                // Fallback: try pdf-extract if lopdf doesn't extract text
                match pdf_extract::extract_text(&path) {
                    Ok(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
                    _ => Ok(format!(
                        "No extractable text found in {}. It may be a scanned document or image-based PDF.",
                        filename
                    )),
                }
            } else {
                Ok(text_content.trim().to_string())
            }
        })
        .await
        .map_err(|e| ExtractError::Extraction(e.to_string()))??;

        Ok(FileContent::Text(text))
    }

    #[cfg(not(feature = "pdf"))]
    async fn extract_impl(&self) -> Result<FileContent, ExtractError> {
        Ok(FileContent::Text(format!(
            "PDF support not available. Cannot extract text from {}.",
            self.filename()
        )))
    }

    #[cfg(feature = "pdf")]
    async fn metadata(&self) -> Result<Option<Value>> {
        let path = self.path.clone();
        let metadata = tokio::task::spawn_blocking(move || {
            use lopdf::Document;

            let mut meta_map = serde_json::Map::new();

            if let Ok(fs_metadata) = std::fs::metadata(&path) {
                meta_map.insert(
                    "size_bytes".to_string(),
                    Value::Number(fs_metadata.len().into()),
                );
            }

            if let Ok(doc) = Document::load(&path) {
                meta_map.insert(
                    "page_count".to_string(),
                    Value::Number(doc.get_pages().len().into()),
                );
            }

            if meta_map.is_empty() {
                None
            } else {
                Some(Value::Object(meta_map))
            }
        })
        .await?;

        Ok(metadata)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn file_type(&self) -> FileType {
        FileType::Pdf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[cfg(feature = "pdf")]
    #[tokio::test]
    async fn test_pdf_invalid_file_fails() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        std::fs::write(&path, "not a pdf").unwrap();

        let pdf_file = PdfFile::new(path);
        let err = pdf_file.extract().await.unwrap_err();
        assert!(matches!(err, ExtractError::Extraction(_)));
    }

    #[cfg(not(feature = "pdf"))]
    #[tokio::test]
    async fn test_pdf_unavailable_returns_explanatory_text() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        std::fs::write(&path, "irrelevant").unwrap();

        let pdf_file = PdfFile::new(path);
        let content = pdf_file.extract().await.unwrap();
        let text = content.as_text().unwrap();
        assert!(text.contains("PDF support not available"));
    }

    #[tokio::test]
    async fn test_pdf_file_type() {
        let pdf_file = PdfFile::new("/test/report.pdf".into());
        assert_eq!(pdf_file.file_type(), FileType::Pdf);
        assert_eq!(pdf_file.path(), Path::new("/test/report.pdf"));
    }
}
