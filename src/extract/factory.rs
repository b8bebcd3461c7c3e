use crate::extract::types::{CsvFile, DocxFile, JsonFile, PdfFile, TextFile};
use crate::extract::{ContentSource, ExtractError, FileType};
use crate::utils;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Registry mapping file types to their extractor implementations
pub struct ExtractorFactory;

impl ExtractorFactory {
    /// Create a ContentSource for a path, detecting the type from the
    /// extension. Unknown types get a typed error instead of a probe.
    pub fn create(path: &Path) -> Result<Arc<dyn ContentSource>, ExtractError> {
        Self::for_type(path, FileType::from_path(path))
    }

    /// Create a ContentSource for a path with an already-detected type
    pub fn for_type(
        path: &Path,
        file_type: FileType,
    ) -> Result<Arc<dyn ContentSource>, ExtractError> {
        let path: PathBuf = path.to_path_buf();
        match file_type {
            FileType::Text => Ok(Arc::new(TextFile::new(path))),
            FileType::Json => Ok(Arc::new(JsonFile::new(path))),
            FileType::Csv => Ok(Arc::new(CsvFile::new(path))),
            FileType::Pdf => Ok(Arc::new(PdfFile::new(path))),
            FileType::Docx => Ok(Arc::new(DocxFile::new(path))),
            FileType::Unknown => Err(ExtractError::UnsupportedType(
                utils::get_extension(&path).unwrap_or_else(|| "<none>".to_string()),
            )),
        }
    }
}
