use crate::extract::{Extraction, ExtractorFactory, FileType};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};

/// Lifecycle of one extraction job. Terminal states are final; a job is
/// never resumed or retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One unit of work: a single file converted into content plus status
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    pub filename: String,
    pub path: PathBuf,
    pub file_type: FileType,
    pub status: JobStatus,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    pub error: Option<String>,
    pub result: Option<Extraction>,
}

impl ExtractionJob {
    fn new(path: PathBuf, file_type: FileType) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            filename,
            path,
            file_type,
            status: JobStatus::Pending,
            started_at: None,
            ended_at: None,
            error: None,
            result: None,
        }
    }

    fn begin(&mut self) {
        self.status = JobStatus::Processing;
        self.started_at = Some(Instant::now());
    }

    fn complete(&mut self, result: Extraction) {
        self.status = JobStatus::Completed;
        self.ended_at = Some(Instant::now());
        self.result = Some(result);
    }

    fn fail(&mut self, error: String) {
        self.status = JobStatus::Failed;
        self.ended_at = Some(Instant::now());
        self.error = Some(error);
    }

    /// Job duration in seconds (elapsed so far if still running)
    pub fn duration_secs(&self) -> f64 {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => end.duration_since(start).as_secs_f64(),
            (Some(start), None) => start.elapsed().as_secs_f64(),
            _ => 0.0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Counts by job status plus the derived completion fraction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub fraction: f64,
}

enum JobEvent {
    Started(usize),
    Finished(usize, Result<Extraction, String>),
}

/// Processes a set of files concurrently with a bounded worker pool.
///
/// Workers emit start/finish events on a channel; the aggregator loop in
/// `process_files` is the only writer of the job list, so a failure in
/// one file never corrupts the others. `progress` and `jobs` are safe to
/// call while a run is in flight.
pub struct BatchProcessor {
    max_workers: usize,
    jobs: Arc<Mutex<Vec<ExtractionJob>>>,
}

pub const DEFAULT_MAX_WORKERS: usize = 4;

impl BatchProcessor {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            jobs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Process all regular files directly inside a directory
    pub async fn process_directory<F>(&self, directory: &Path, callback: F) -> Result<Vec<Extraction>>
    where
        F: FnMut(&ExtractionJob),
    {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(directory)
            .await
            .with_context(|| format!("failed to read directory {}", directory.display()))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("failed to read directory {}", directory.display()))?
        {
            let path = entry.path();
            if path.is_file() {
                let file_type = FileType::from_path(&path);
                files.push((path, file_type));
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        self.process_files(files, callback).await
    }

    /// Process an explicit list of (path, type) pairs. The callback runs
    /// synchronously in the aggregator, exactly once per job, in
    /// completion order. Returns the payloads of completed jobs.
    pub async fn process_files<F>(
        &self,
        files: Vec<(PathBuf, FileType)>,
        mut callback: F,
    ) -> Result<Vec<Extraction>>
    where
        F: FnMut(&ExtractionJob),
    {
        let total = files.len();
        {
            let mut jobs = self.jobs.lock().expect("job list lock poisoned");
            *jobs = files
                .iter()
                .map(|(path, file_type)| ExtractionJob::new(path.clone(), *file_type))
                .collect();
        }

        if total == 0 {
            return Ok(Vec::new());
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let semaphore = Arc::new(Semaphore::new(self.max_workers));

        for (idx, (path, file_type)) in files.into_iter().enumerate() {
            let tx = tx.clone();
            let semaphore = Arc::clone(&semaphore);
            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                if tx.send(JobEvent::Started(idx)).is_err() {
                    return;
                }
                let outcome = run_extraction(&path, file_type).await;
                let _ = tx.send(JobEvent::Finished(idx, outcome));
            });
        }
        drop(tx);

        let mut completed = Vec::new();
        let mut terminal = 0usize;
        while let Some(event) = rx.recv().await {
            match event {
                JobEvent::Started(idx) => {
                    let mut jobs = self.jobs.lock().expect("job list lock poisoned");
                    jobs[idx].begin();
                }
                JobEvent::Finished(idx, outcome) => {
                    let snapshot = {
                        let mut jobs = self.jobs.lock().expect("job list lock poisoned");
                        match outcome {
                            Ok(extraction) => jobs[idx].complete(extraction),
                            Err(message) => jobs[idx].fail(message),
                        }
                        jobs[idx].clone()
                    };
                    if let Some(ref extraction) = snapshot.result {
                        completed.push(extraction.clone());
                    }
                    callback(&snapshot);
                    terminal += 1;
                    if terminal == total {
                        break;
                    }
                }
            }
        }

        Ok(completed)
    }

    /// Progress counts over the current (or last) run
    pub fn progress(&self) -> Progress {
        let jobs = self.jobs.lock().expect("job list lock poisoned");
        let total = jobs.len();
        let mut pending = 0;
        let mut processing = 0;
        let mut completed = 0;
        let mut failed = 0;
        for job in jobs.iter() {
            match job.status {
                JobStatus::Pending => pending += 1,
                JobStatus::Processing => processing += 1,
                JobStatus::Completed => completed += 1,
                JobStatus::Failed => failed += 1,
            }
        }
        let fraction = if total == 0 {
            1.0
        } else {
            (completed + failed) as f64 / total as f64
        };
        Progress {
            total,
            pending,
            processing,
            completed,
            failed,
            fraction,
        }
    }

    /// Status of a specific job by file name
    pub fn job_status(&self, filename: &str) -> Option<ExtractionJob> {
        let jobs = self.jobs.lock().expect("job list lock poisoned");
        jobs.iter().find(|job| job.filename == filename).cloned()
    }

    /// Snapshot of all jobs
    pub fn jobs(&self) -> Vec<ExtractionJob> {
        self.jobs.lock().expect("job list lock poisoned").clone()
    }
}

impl Default for BatchProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}

async fn run_extraction(path: &Path, file_type: FileType) -> Result<Extraction, String> {
    let source = ExtractorFactory::for_type(path, file_type).map_err(|e| e.to_string())?;

    let content = source
        .extract()
        .await
        .map_err(|e| format!("error processing {}: {}", path.display(), e))?;

    // Metadata is best-effort and never fails the job
    let metadata = source.metadata().await.unwrap_or(None);

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(Extraction {
        filename,
        file_type,
        content,
        metadata,
    })
}
