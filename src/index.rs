use crate::extract::{Extraction, FileType};
use crate::models::{DirectoryEntry, FileRecord, IndexSnapshot, IndexSummary};
use crate::utils;
use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable catalog of indexed files, persisted as a single JSON snapshot.
///
/// Every mutation rewrites the whole snapshot through a temp file rename,
/// so a crash mid-write leaves the previous snapshot intact. All paths are
/// absolutized before use as keys.
pub struct FileIndex {
    index_file: PathBuf,
    inner: Mutex<IndexSnapshot>,
}

impl FileIndex {
    /// Load the index from disk, or start empty if the snapshot is
    /// missing or unreadable
    pub fn open(index_file: impl Into<PathBuf>) -> Result<Self> {
        let index_file = index_file.into();
        let snapshot = match std::fs::read_to_string(&index_file) {
            Ok(raw) => match serde_json::from_str::<IndexSnapshot>(&raw) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    eprintln!(
                        "Warning: index snapshot {} is corrupt ({}), starting empty",
                        index_file.display(),
                        e
                    );
                    IndexSnapshot::empty()
                }
            },
            Err(_) => IndexSnapshot::empty(),
        };

        Ok(Self {
            index_file,
            inner: Mutex::new(snapshot),
        })
    }

    /// Whether a file is absent from the index or has changed since it
    /// was last indexed
    pub fn file_needs_update(&self, path: &Path) -> bool {
        let abs = utils::absolute(path);
        let snapshot = self.inner.lock().expect("index lock poisoned");
        match snapshot.files.get(&abs) {
            Some(record) => utils::file_hash(&abs) != record.hash,
            None => true,
        }
    }

    /// Record a successful extraction, then persist
    pub fn add_file(&self, path: &Path, extraction: &Extraction) -> Result<()> {
        let abs = utils::absolute(path);
        let hash = utils::file_hash(&abs);
        let size = std::fs::metadata(&abs).map(|m| m.len()).unwrap_or(0);

        let record = FileRecord {
            path: abs.clone(),
            filename: extraction.filename.clone(),
            hash,
            file_type: extraction.file_type,
            size,
            last_indexed: Utc::now(),
            metadata: extraction.metadata.clone(),
        };

        {
            let mut snapshot = self.inner.lock().expect("index lock poisoned");
            if let Some(parent) = abs.parent() {
                let entry = snapshot
                    .directories
                    .entry(parent.to_path_buf())
                    .or_insert_with(|| DirectoryEntry {
                        path: parent.to_path_buf(),
                        files: Default::default(),
                    });
                entry.files.insert(abs.clone());
            }
            snapshot.files.insert(abs, record);
            snapshot.last_updated = Utc::now();
        }

        self.persist()
    }

    /// Drop a file from the index, then persist. Removing an unknown
    /// path is a no-op.
    pub fn remove_file(&self, path: &Path) -> Result<()> {
        let abs = utils::absolute(path);
        let removed = {
            let mut snapshot = self.inner.lock().expect("index lock poisoned");
            let removed = snapshot.files.remove(&abs).is_some();
            if removed {
                if let Some(parent) = abs.parent() {
                    let now_empty = match snapshot.directories.get_mut(parent) {
                        Some(entry) => {
                            entry.files.remove(&abs);
                            entry.files.is_empty()
                        }
                        None => false,
                    };
                    if now_empty {
                        snapshot.directories.remove(parent);
                    }
                }
                snapshot.last_updated = Utc::now();
            }
            removed
        };

        if removed {
            self.persist()?;
        }
        Ok(())
    }

    pub fn get_file(&self, path: &Path) -> Option<FileRecord> {
        let abs = utils::absolute(path);
        let snapshot = self.inner.lock().expect("index lock poisoned");
        snapshot.files.get(&abs).cloned()
    }

    /// All records, sorted by path for deterministic iteration
    pub fn all_files(&self) -> Vec<FileRecord> {
        let snapshot = self.inner.lock().expect("index lock poisoned");
        let mut records: Vec<FileRecord> = snapshot.files.values().cloned().collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records
    }

    pub fn files_by_type(&self, file_type: FileType) -> Vec<FileRecord> {
        self.all_files()
            .into_iter()
            .filter(|record| record.file_type == file_type)
            .collect()
    }

    pub fn files_in_directory(&self, directory: &Path) -> Vec<FileRecord> {
        let abs = utils::absolute(directory);
        let snapshot = self.inner.lock().expect("index lock poisoned");
        let mut records: Vec<FileRecord> = match snapshot.directories.get(&abs) {
            Some(entry) => entry
                .files
                .iter()
                .filter_map(|path| snapshot.files.get(path).cloned())
                .collect(),
            None => Vec::new(),
        };
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records
    }

    pub fn summary(&self) -> IndexSummary {
        let snapshot = self.inner.lock().expect("index lock poisoned");

        let mut file_types: BTreeMap<String, usize> = BTreeMap::new();
        for record in snapshot.files.values() {
            *file_types
                .entry(record.file_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        let mut directories: BTreeMap<PathBuf, usize> = BTreeMap::new();
        for entry in snapshot.directories.values() {
            directories.insert(entry.path.clone(), entry.files.len());
        }

        IndexSummary {
            total_files: snapshot.files.len(),
            file_types,
            directories,
            last_updated: snapshot
                .last_updated
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        }
    }

    /// Remove every record and persist the empty snapshot
    pub fn clear(&self) -> Result<()> {
        {
            let mut snapshot = self.inner.lock().expect("index lock poisoned");
            *snapshot = IndexSnapshot::empty();
        }
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let serialized = {
            let snapshot = self.inner.lock().expect("index lock poisoned");
            serde_json::to_string_pretty(&*snapshot)
                .context("failed to serialize index snapshot")?
        };

        if let Some(parent) = self.index_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create index directory {}", parent.display())
                })?;
            }
        }

        let tmp = self.index_file.with_extension("json.tmp");
        std::fs::write(&tmp, serialized)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.index_file)
            .with_context(|| format!("failed to persist index snapshot {}", self.index_file.display()))?;
        Ok(())
    }
}
