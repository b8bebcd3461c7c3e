use crate::extract::{ExtractError, FileContent, FileType};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Trait for extracting indexable content from files
#[async_trait]
pub trait ContentSource: Send + Sync + std::fmt::Debug {
    /// Extract content from the file (internal implementation)
    async fn extract_impl(&self) -> Result<FileContent, ExtractError>;

    /// Extract content from the file (public API with size check)
    async fn extract(&self) -> Result<FileContent, ExtractError> {
        // Empty files extract to empty text without touching the parser
        if let Ok(metadata) = tokio::fs::metadata(self.path()).await {
            if metadata.len() == 0 {
                return Ok(FileContent::Text(String::new()));
            }
        }

        self.extract_impl().await
    }

    /// Extract type-specific metadata (page count, CSV headers, ...).
    /// Best-effort: callers treat errors as "no metadata".
    async fn metadata(&self) -> Result<Option<Value>> {
        Ok(None)
    }

    /// Get the file path
    fn path(&self) -> &std::path::Path;

    /// Get the detected file type
    fn file_type(&self) -> FileType;
}
