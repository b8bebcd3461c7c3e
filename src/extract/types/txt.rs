use crate::extract::{read_text_lossy, ContentSource, ExtractError, FileContent, FileType};
use async_trait::async_trait;
use std::path::Path;

/// Plain text file handler
#[derive(Debug)]
pub struct TextFile {
    path: std::path::PathBuf,
}

impl TextFile {
    pub fn new(path: std::path::PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ContentSource for TextFile {
    async fn extract_impl(&self) -> Result<FileContent, ExtractError> {
        let text = read_text_lossy(&self.path).await?;
        Ok(FileContent::Text(text))
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn file_type(&self) -> FileType {
        FileType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_text_file_extraction() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        std::fs::write(&path, "plain text content").unwrap();

        let text_file = TextFile::new(path.clone());
        let content = text_file.extract().await.unwrap();
        assert_eq!(content, FileContent::Text("plain text content".to_string()));
        assert_eq!(text_file.path(), path);
        assert_eq!(text_file.file_type(), FileType::Text);
    }

    #[tokio::test]
    async fn test_text_file_empty() {
        let temp_file = NamedTempFile::new().unwrap();
        let text_file = TextFile::new(temp_file.path().to_path_buf());
        let content = text_file.extract().await.unwrap();
        assert_eq!(content, FileContent::Text(String::new()));
    }

    #[tokio::test]
    async fn test_text_file_invalid_utf8_is_replaced_not_fatal() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        std::fs::write(&path, [b'o', b'k', 0xFF, 0xFE, b'!']).unwrap();

        let text_file = TextFile::new(path);
        let content = text_file.extract().await.unwrap();
        let text = content.as_text().unwrap();
        assert!(text.starts_with("ok"));
        assert!(text.ends_with('!'));
        assert!(text.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn test_text_file_missing_is_an_error() {
        let text_file = TextFile::new("/nonexistent/docdex/missing.txt".into());
        let err = text_file.extract().await.unwrap_err();
        assert!(matches!(err, ExtractError::Extraction(_)));
    }
}
