use crate::extract::{read_text_lossy, ContentSource, ExtractError, FileContent, FileType};
use async_trait::async_trait;
use std::path::Path;

/// JSON file handler
#[derive(Debug)]
pub struct JsonFile {
    path: std::path::PathBuf,
}

impl JsonFile {
    pub fn new(path: std::path::PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ContentSource for JsonFile {
    async fn extract_impl(&self) -> Result<FileContent, ExtractError> {
        let text = read_text_lossy(&self.path).await?;

        let parsed: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            ExtractError::Extraction(format!("invalid JSON in {}: {}", self.path.display(), e))
        })?;

        Ok(FileContent::Json(parsed))
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn file_type(&self) -> FileType {
        FileType::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_json_file_extraction() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        std::fs::write(&path, r#"{"name":"test","value":42}"#).unwrap();

        let json_file = JsonFile::new(path.clone());
        let content = json_file.extract().await.unwrap();
        match content {
            FileContent::Json(value) => {
                assert_eq!(value["name"], "test");
                assert_eq!(value["value"], 42);
            }
            other => panic!("expected JSON content, got {:?}", other),
        }
        assert_eq!(json_file.file_type(), FileType::Json);
    }

    #[tokio::test]
    async fn test_json_file_invalid_json_fails() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        std::fs::write(&path, "not json at all {").unwrap();

        let json_file = JsonFile::new(path);
        let err = json_file.extract().await.unwrap_err();
        assert!(matches!(err, ExtractError::Extraction(_)));
    }
}
