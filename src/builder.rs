use crate::batch::{BatchProcessor, ExtractionJob, JobStatus};
use crate::extract::FileType;
use crate::index::FileIndex;
use crate::utils;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

/// Outcome of indexing one directory
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryReport {
    pub directory: PathBuf,
    pub total_files: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub duration_secs: f64,
}

/// Outcome of indexing a set of directories
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    pub total_files: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub details: Vec<DirectoryReport>,
}

/// Walks directories, stages changed files, runs them through the batch
/// processor and commits successful extractions to the index.
///
/// Files are staged under `staging_dir` via symlink (copy as fallback) so
/// the processor only ever sees a flat directory. Staged names that would
/// collide get a numeric prefix; the original path is recovered through a
/// name map when committing.
pub struct IndexBuilder {
    index: Arc<FileIndex>,
    processor: BatchProcessor,
    staging_dir: PathBuf,
}

impl IndexBuilder {
    pub fn new(index: Arc<FileIndex>, max_workers: usize, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            index,
            processor: BatchProcessor::new(max_workers),
            staging_dir: staging_dir.into(),
        }
    }

    pub fn index(&self) -> &Arc<FileIndex> {
        &self.index
    }

    pub fn processor(&self) -> &BatchProcessor {
        &self.processor
    }

    /// Index one directory tree. With `force` every supported file is
    /// re-extracted; otherwise unchanged files are skipped.
    pub async fn index_directory<F>(
        &self,
        directory: &Path,
        force: bool,
        mut on_job: F,
    ) -> Result<DirectoryReport>
    where
        F: FnMut(&ExtractionJob),
    {
        let started = Instant::now();
        let directory = utils::absolute(directory);
        if !directory.is_dir() {
            bail!("{} is not a directory", directory.display());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&directory) {
            let entry = entry
                .with_context(|| format!("failed to walk directory {}", directory.display()))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();

        // Drop records for files that no longer exist on disk
        for record in self.index.all_files() {
            if record.path.starts_with(&directory) && !record.path.exists() {
                self.index.remove_file(&record.path)?;
            }
        }

        let mut errors = 0usize;
        let mut skipped = 0usize;
        let total_files = files.len();

        let to_stage: Vec<PathBuf> = files
            .into_iter()
            .filter(|path| {
                if force || self.index.file_needs_update(path) {
                    true
                } else {
                    skipped += 1;
                    false
                }
            })
            .collect();

        self.reset_staging()?;
        let mut origin_by_name: HashMap<String, PathBuf> = HashMap::new();
        for path in to_stage {
            let base = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let mut staged_name = base.clone();
            let mut counter = 1usize;
            while origin_by_name.contains_key(&staged_name) {
                staged_name = format!("{}__{}", counter, base);
                counter += 1;
            }

            match stage_file(&path, &self.staging_dir.join(&staged_name)) {
                Ok(()) => {
                    origin_by_name.insert(staged_name, path);
                }
                Err(e) => {
                    eprintln!("Warning: could not stage {}: {}", path.display(), e);
                    errors += 1;
                }
            }
        }

        let mut persist_error: Option<anyhow::Error> = None;
        self.processor
            .process_directory(&self.staging_dir, |job| {
                if job.status == JobStatus::Completed {
                    if let (Some(origin), Some(extraction)) =
                        (origin_by_name.get(&job.filename), job.result.as_ref())
                    {
                        let mut committed = extraction.clone();
                        committed.filename = origin
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_else(|| committed.filename.clone());
                        if let Err(e) = self.index.add_file(origin, &committed) {
                            if persist_error.is_none() {
                                persist_error = Some(e);
                            }
                        }
                    }
                }
                on_job(job);
            })
            .await?;

        if let Some(e) = persist_error {
            return Err(e);
        }

        let mut indexed = 0usize;
        for job in self.processor.jobs() {
            match job.status {
                JobStatus::Completed => indexed += 1,
                JobStatus::Failed => errors += 1,
                _ => {}
            }
        }

        self.clean_staging();

        Ok(DirectoryReport {
            directory,
            total_files,
            indexed,
            skipped,
            errors,
            duration_secs: started.elapsed().as_secs_f64(),
        })
    }

    /// Index several directories in sequence, aggregating the reports
    pub async fn update_index<F>(
        &self,
        directories: &[PathBuf],
        force: bool,
        mut on_job: F,
    ) -> Result<UpdateReport>
    where
        F: FnMut(&ExtractionJob),
    {
        let mut report = UpdateReport {
            total_files: 0,
            indexed: 0,
            skipped: 0,
            errors: 0,
            details: Vec::new(),
        };

        for directory in directories {
            let detail = self.index_directory(directory, force, &mut on_job).await?;
            report.total_files += detail.total_files;
            report.indexed += detail.indexed;
            report.skipped += detail.skipped;
            report.errors += detail.errors;
            report.details.push(detail);
        }

        Ok(report)
    }

    /// Count of supported files a run over `directories` would consider
    pub fn candidate_count(&self, directories: &[PathBuf]) -> usize {
        directories
            .iter()
            .filter(|d| d.is_dir())
            .map(|d| {
                WalkDir::new(d)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .filter(|e| FileType::from_path(e.path()) != FileType::Unknown)
                    .count()
            })
            .sum()
    }

    fn reset_staging(&self) -> Result<()> {
        self.clean_staging();
        std::fs::create_dir_all(&self.staging_dir).with_context(|| {
            format!(
                "failed to create staging directory {}",
                self.staging_dir.display()
            )
        })
    }

    fn clean_staging(&self) {
        if self.staging_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.staging_dir) {
                eprintln!(
                    "Warning: could not clean staging directory {}: {}",
                    self.staging_dir.display(),
                    e
                );
            }
        }
    }
}

#[cfg(unix)]
fn stage_file(origin: &Path, staged: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(origin, staged).or_else(|_| std::fs::copy(origin, staged).map(|_| ()))
}

#[cfg(windows)]
fn stage_file(origin: &Path, staged: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(origin, staged)
        .or_else(|_| std::fs::copy(origin, staged).map(|_| ()))
}
