use crate::extract::{decode_with_fallback, ContentSource, ExtractError, FileContent, FileType};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// CSV file handler. The first row supplies the column names; every
/// following row becomes an object keyed by them.
#[derive(Debug)]
pub struct CsvFile {
    path: std::path::PathBuf,
}

impl CsvFile {
    pub fn new(path: std::path::PathBuf) -> Self {
        Self { path }
    }

    fn parse_rows(decoded: &str) -> Result<Vec<Value>, csv::Error> {
        let mut reader = csv::Reader::from_reader(decoded.as_bytes());
        let headers = reader.headers()?.clone();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row = serde_json::Map::new();
            for (header, field) in headers.iter().zip(record.iter()) {
                row.insert(header.to_string(), Value::String(field.to_string()));
            }
            rows.push(Value::Object(row));
        }
        Ok(rows)
    }
}

#[async_trait]
impl ContentSource for CsvFile {
    async fn extract_impl(&self) -> Result<FileContent, ExtractError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<FileContent, ExtractError> {
            let bytes = std::fs::read(&path)
                .map_err(|e| ExtractError::Extraction(format!("{}: {}", path.display(), e)))?;
            let (decoded, _lossy) = decode_with_fallback(&bytes);

            let rows = Self::parse_rows(&decoded).map_err(|e| {
                ExtractError::Extraction(format!("invalid CSV in {}: {}", path.display(), e))
            })?;

            Ok(FileContent::Rows(rows))
        })
        .await
        .map_err(|e| ExtractError::Extraction(e.to_string()))?
    }

    async fn metadata(&self) -> Result<Option<Value>> {
        let path = self.path.clone();
        let metadata = tokio::task::spawn_blocking(move || -> Result<Option<Value>> {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;
            let (decoded, lossy) = decode_with_fallback(&bytes);

            let mut reader = csv::Reader::from_reader(decoded.as_bytes());
            let mut meta_map = serde_json::Map::new();

            if let Ok(headers) = reader.headers() {
                let header_list: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
                let column_count = header_list.len();

                if !header_list.is_empty() {
                    meta_map.insert(
                        "headers".to_string(),
                        Value::Array(header_list.into_iter().map(Value::String).collect()),
                    );
                    meta_map.insert("column_count".to_string(), Value::Number(column_count.into()));
                }
            }

            // Count rows (excluding header)
            let mut row_count = 0u64;
            for result in reader.records() {
                match result {
                    Ok(_) => row_count += 1,
                    Err(_) => break, // Stop on error
                }
            }
            meta_map.insert("row_count".to_string(), Value::Number(row_count.into()));

            if lossy {
                meta_map.insert("decode_fallback".to_string(), Value::Bool(true));
            }

            if let Ok(fs_metadata) = std::fs::metadata(&path) {
                meta_map.insert(
                    "size_bytes".to_string(),
                    Value::Number(fs_metadata.len().into()),
                );
            }

            Ok(Some(Value::Object(meta_map)))
        })
        .await?
        .map_err(anyhow::Error::from)?;

        Ok(metadata)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn file_type(&self) -> FileType {
        FileType::Csv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_csv_file_extraction() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        std::fs::write(&path, "name,age,city\nJohn,30,Paris\nJane,25,London").unwrap();

        let csv_file = CsvFile::new(path.clone());
        let content = csv_file.extract().await.unwrap();
        match content {
            FileContent::Rows(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0]["name"], "John");
                assert_eq!(rows[0]["city"], "Paris");
                assert_eq!(rows[1]["age"], "25");
            }
            other => panic!("expected rows, got {:?}", other),
        }
        assert_eq!(csv_file.file_type(), FileType::Csv);
    }

    #[tokio::test]
    async fn test_csv_file_metadata() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        std::fs::write(&path, "name,age,city\nJohn,30,Paris\nJane,25,London").unwrap();

        let csv_file = CsvFile::new(path);
        let metadata = csv_file.metadata().await.unwrap().unwrap();

        assert_eq!(metadata["column_count"], 3);
        assert_eq!(metadata["row_count"], 2);
        assert!(metadata.get("headers").is_some());
        assert!(metadata.get("decode_fallback").is_none());
    }

    #[tokio::test]
    async fn test_csv_file_latin1_fallback() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        // "José" in Latin-1: the 0xE9 byte is invalid UTF-8
        let mut bytes = b"name,city\nJos".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b",Madrid");
        std::fs::write(&path, bytes).unwrap();

        let csv_file = CsvFile::new(path);
        let content = csv_file.extract().await.unwrap();
        match content {
            FileContent::Rows(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0]["name"], "José");
            }
            other => panic!("expected rows, got {:?}", other),
        }

        let metadata = csv_file.metadata().await.unwrap().unwrap();
        assert_eq!(metadata["decode_fallback"], true);
    }
}
