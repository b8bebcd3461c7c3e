use crate::extract::{ContentSource, ExtractError, FileContent, FileType};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// DOCX file handler: reads `word/document.xml` out of the ZIP container
/// and walks the XML events. Table cell text is appended after paragraph
/// text, one row per line with cells joined by " | ". Compiled without
/// the `docx` feature it reports that support is unavailable.
#[derive(Debug)]
pub struct DocxFile {
    path: std::path::PathBuf,
}

#[cfg(feature = "docx")]
#[derive(Debug, Default)]
struct DocxText {
    paragraphs: Vec<String>,
    table_rows: Vec<String>,
    table_count: usize,
}

impl DocxFile {
    pub fn new(path: std::path::PathBuf) -> Self {
        Self { path }
    }

    #[cfg(not(feature = "docx"))]
    fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    #[cfg(feature = "docx")]
    fn read_document_xml(path: &Path) -> Result<Vec<u8>, ExtractError> {
        use std::io::Read;

        let file = std::fs::File::open(path)
            .map_err(|e| ExtractError::Extraction(format!("{}: {}", path.display(), e)))?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| {
            ExtractError::Extraction(format!("failed to open DOCX {}: {}", path.display(), e))
        })?;
        let mut entry = archive.by_name("word/document.xml").map_err(|e| {
            ExtractError::Extraction(format!(
                "word/document.xml not found in {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut xml = Vec::new();
        entry
            .read_to_end(&mut xml)
            .map_err(|e| ExtractError::Extraction(format!("{}: {}", path.display(), e)))?;
        Ok(xml)
    }

    #[cfg(feature = "docx")]
    fn parse_document_xml(xml: &[u8]) -> Result<DocxText, ExtractError> {
        use quick_xml::events::Event;

        let mut reader = quick_xml::Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut out = DocxText::default();
        let mut buf = Vec::new();
        let mut table_depth = 0usize;
        let mut cells: Vec<String> = Vec::new();
        let mut cell = String::new();
        let mut paragraph = String::new();
        let mut in_text = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"tbl" => {
                        if table_depth == 0 {
                            out.table_count += 1;
                        }
                        table_depth += 1;
                    }
                    b"tr" if table_depth > 0 => cells.clear(),
                    b"tc" if table_depth > 0 => cell.clear(),
                    b"p" if table_depth == 0 => paragraph.clear(),
                    b"t" => in_text = true,
                    _ => {}
                },
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"tbl" => table_depth = table_depth.saturating_sub(1),
                    b"tr" if table_depth > 0 => out.table_rows.push(cells.join(" | ")),
                    b"tc" if table_depth > 0 => cells.push(std::mem::take(&mut cell).trim().to_string()),
                    b"p" if table_depth == 0 => out.paragraphs.push(std::mem::take(&mut paragraph)),
                    b"t" => in_text = false,
                    _ => {}
                },
                Ok(Event::Text(t)) if in_text => {
                    let text = t.unescape().unwrap_or_default();
                    if table_depth > 0 {
                        cell.push_str(&text);
                    } else {
                        paragraph.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ExtractError::Extraction(format!(
                        "invalid document XML: {}",
                        e
                    )))
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(out)
    }
}

#[async_trait]
impl ContentSource for DocxFile {
    #[cfg(feature = "docx")]
    async fn extract_impl(&self) -> Result<FileContent, ExtractError> {
        let path = self.path.clone();
        let text = tokio::task::spawn_blocking(move || -> Result<String, ExtractError> {
            let xml = Self::read_document_xml(&path)?;
            let parsed = Self::parse_document_xml(&xml)?;

            let mut text = parsed.paragraphs.join("\n");
            if !parsed.table_rows.is_empty() {
                text.push_str("\n\n");
                text.push_str(&parsed.table_rows.join("\n"));
            }
            Ok(text.trim().to_string())
        })
        .await
        .map_err(|e| ExtractError::Extraction(e.to_string()))??;

        Ok(FileContent::Text(text))
    }

    #[cfg(not(feature = "docx"))]
    async fn extract_impl(&self) -> Result<FileContent, ExtractError> {
        Ok(FileContent::Text(format!(
            "DOCX support not available. Cannot extract text from {}.",
            self.filename()
        )))
    }

    #[cfg(feature = "docx")]
    async fn metadata(&self) -> Result<Option<Value>> {
        let path = self.path.clone();
        let metadata = tokio::task::spawn_blocking(move || {
            let mut meta_map = serde_json::Map::new();

            if let Ok(fs_metadata) = std::fs::metadata(&path) {
                meta_map.insert(
                    "size_bytes".to_string(),
                    Value::Number(fs_metadata.len().into()),
                );
            }

            if let Ok(xml) = Self::read_document_xml(&path) {
                if let Ok(parsed) = Self::parse_document_xml(&xml) {
                    meta_map.insert(
                        "paragraph_count".to_string(),
                        Value::Number(parsed.paragraphs.len().into()),
                    );
                    meta_map.insert(
                        "table_count".to_string(),
                        Value::Number(parsed.table_count.into()),
                    );
                }
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
        FileType::Docx
    }
}
