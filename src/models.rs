use crate::extract::FileType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

/// Staleness signal stored for an indexed file.
///
/// `Content` is a Blake3 hash of the file bytes at last successful index.
/// `MtimeFallback` is used when the bytes could not be read; it detects
/// changes only as reliably as the modification time does.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FileHash {
    Content(String),
    MtimeFallback(u64),
}

impl FileHash {
    /// Whether this hash was computed from file contents
    pub fn is_content(&self) -> bool {
        matches!(self, FileHash::Content(_))
    }
}

/// Metadata about one indexed file, keyed by its absolute path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File name without the directory
    pub filename: String,
    /// Hash of the file contents at last successful index
    pub hash: FileHash,
    /// Detected file type
    pub file_type: FileType,
    /// File size in bytes
    pub size: u64,
    /// When the file was last indexed
    pub last_indexed: DateTime<Utc>,
    /// Extraction metadata (page counts, CSV headers, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Files known to the index under one directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DirectoryEntry {
    pub path: PathBuf,
    pub files: BTreeSet<PathBuf>,
}

/// The full durable index state, rewritten wholesale on every mutation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexSnapshot {
    pub version: u32,
    pub last_updated: DateTime<Utc>,
    pub files: HashMap<PathBuf, FileRecord>,
    pub directories: HashMap<PathBuf, DirectoryEntry>,
}

pub const SNAPSHOT_VERSION: u32 = 1;

impl IndexSnapshot {
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            last_updated: Utc::now(),
            files: HashMap::new(),
            directories: HashMap::new(),
        }
    }
}

impl Default for IndexSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Aggregated view of the index for status reporting
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IndexSummary {
    pub total_files: usize,
    /// File counts keyed by type name
    pub file_types: BTreeMap<String, usize>,
    /// File counts keyed by directory path
    pub directories: BTreeMap<PathBuf, usize>,
    /// Last-updated time formatted as `%Y-%m-%d %H:%M:%S`
    pub last_updated: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> FileRecord {
        FileRecord {
            path: PathBuf::from("/data/files/notes.txt"),
            filename: "notes.txt".to_string(),
            hash: FileHash::Content("abc123".to_string()),
            file_type: FileType::Text,
            size: 42,
            last_indexed: Utc::now(),
            metadata: None,
        }
    }

    #[test]
    fn test_file_record_serialization_round_trip() {
        let record = sample_record();
        let serialized = serde_json::to_string(&record).unwrap();
        let deserialized: FileRecord = serde_json::from_str(&serialized).unwrap();
        assert_eq!(record, deserialized);
    }

    #[test]
    fn test_file_hash_variants_are_distinguishable() {
        let content = FileHash::Content("deadbeef".to_string());
        let fallback = FileHash::MtimeFallback(1700000000);

        assert!(content.is_content());
        assert!(!fallback.is_content());
        assert_ne!(content, fallback);

        let json = serde_json::to_string(&fallback).unwrap();
        assert!(json.contains("mtime_fallback"));
        let back: FileHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fallback);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = IndexSnapshot::empty();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert!(snapshot.files.is_empty());
        assert!(snapshot.directories.is_empty());
    }

    #[test]
    fn test_snapshot_round_trip_with_records() {
        let mut snapshot = IndexSnapshot::empty();
        let record = sample_record();
        let mut entry = DirectoryEntry {
            path: PathBuf::from("/data/files"),
            files: BTreeSet::new(),
        };
        entry.files.insert(record.path.clone());
        snapshot.directories.insert(entry.path.clone(), entry);
        snapshot.files.insert(record.path.clone(), record);

        let serialized = serde_json::to_string_pretty(&snapshot).unwrap();
        let deserialized: IndexSnapshot = serde_json::from_str(&serialized).unwrap();
        assert_eq!(snapshot, deserialized);
    }
}
