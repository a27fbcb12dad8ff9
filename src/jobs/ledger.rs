//! Job ledger
//!
//! The ledger holds at most one job: the run currently in flight or the last
//! one that did not finish cleanly. Implementors provide load/save/clear; the
//! lifecycle operations are built on top of those.
//!
//! ## Concurrency Safety
//! The file ledger takes an exclusive `fs2` lock around each load, save and
//! clear, and writes through a temp file + rename, so the document on disk is
//! never half-written. `clear_job_if` reads, compares and removes under one
//! lock so a delayed clear cannot remove a record saved by a newer run.

use super::{JobStatus, OrganizeJob};
use crate::plan::OrganizePlan;
use crate::utils::IgnorePoison;
use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const JOB_FILE: &str = "current_job.json";
const LOCK_FILE: &str = "current_job.lock";

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job ID mismatch: expected {expected}, got {actual}")]
    Mismatch { expected: String, actual: String },
}

/// Durable record of organize runs
#[async_trait]
pub trait JobLedger: Send + Sync {
    /// Load the current job (if any)
    async fn load_job(&self) -> Result<Option<OrganizeJob>, JobError>;

    /// Persist the job, replacing any previous record
    async fn save_job(&self, job: &OrganizeJob) -> Result<(), JobError>;

    /// Remove the current job record
    async fn clear_job(&self) -> Result<(), JobError>;

    /// Start a new job for `target_folder` and return its id
    async fn start_job(&self, target_folder: &str) -> Result<String, JobError> {
        let job = OrganizeJob::new(target_folder);
        self.save_job(&job).await?;
        tracing::info!(job_id = %job.job_id, folder = %target_folder, "Started organize job");
        Ok(job.job_id)
    }

    /// Attach the plan that is about to be executed
    async fn set_job_plan(&self, job_id: &str, plan: &OrganizePlan) -> Result<(), JobError> {
        let mut job = self.load_matching(job_id).await?;
        job.set_plan(plan.clone());
        self.save_job(&job).await
    }

    /// Record a completed operation and the index it ran at
    async fn complete_job_operation(
        &self,
        job_id: &str,
        op_id: &str,
        index: usize,
    ) -> Result<(), JobError> {
        let mut job = self.load_matching(job_id).await?;
        job.complete_operation(op_id);
        job.set_current_op(index);
        self.save_job(&job).await
    }

    /// Mark the job as failed
    async fn fail_job(&self, job_id: &str, error: &str) -> Result<(), JobError> {
        let mut job = self.load_matching(job_id).await?;
        job.mark_failed(error);
        self.save_job(&job).await
    }

    /// Mark the job as completed
    async fn complete_job(&self, job_id: &str) -> Result<(), JobError> {
        let mut job = self.load_matching(job_id).await?;
        job.mark_completed();
        self.save_job(&job).await
    }

    /// Clear the record only if it still belongs to `job_id`.
    /// Returns whether anything was removed. Implementors should override this
    /// when another writer can save between the load and the clear.
    async fn clear_job_if(&self, job_id: &str) -> Result<bool, JobError> {
        match self.load_job().await? {
            Some(job) if job.job_id == job_id => {
                self.clear_job().await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Check for interrupted jobs on startup.
    /// Returns the job if it was left without a terminal status.
    async fn check_interrupted_job(&self) -> Result<Option<OrganizeJob>, JobError> {
        if let Some(mut job) = self.load_job().await? {
            if job.status == JobStatus::Running {
                // Job was running when app closed - mark as interrupted
                job.mark_interrupted();
                self.save_job(&job).await?;
                return Ok(Some(job));
            } else if job.status == JobStatus::Interrupted {
                return Ok(Some(job));
            }
            // Completed or failed jobs can be ignored
        }
        Ok(None)
    }

    #[doc(hidden)]
    async fn load_matching(&self, job_id: &str) -> Result<OrganizeJob, JobError> {
        let job = self
            .load_job()
            .await?
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        if job.job_id != job_id {
            return Err(JobError::Mismatch {
                expected: job.job_id,
                actual: job_id.to_string(),
            });
        }
        Ok(job)
    }
}

/// Job ledger backed by a JSON file in the config directory
pub struct FileJobLedger {
    dir: PathBuf,
}

impl FileJobLedger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn job_path(&self) -> PathBuf {
        self.dir.join(JOB_FILE)
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, JobError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, JobError> + Send + 'static,
    {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || f(&dir))
            .await
            .map_err(|e| JobError::Io(format!("Task failed: {}", e)))?
    }
}

fn ensure_dir(dir: &Path) -> Result<(), JobError> {
    fs::create_dir_all(dir)
        .map_err(|e| JobError::Io(format!("Failed to create config directory: {}", e)))
}

/// Acquire an exclusive lock for the ledger.
/// The returned handle must be kept alive while holding the lock.
fn acquire_lock(dir: &Path) -> Result<File, JobError> {
    ensure_dir(dir)?;
    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(dir.join(LOCK_FILE))
        .map_err(|e| JobError::Io(format!("Failed to open lock file: {}", e)))?;

    lock_file
        .lock_exclusive()
        .map_err(|e| JobError::Io(format!("Failed to acquire lock: {}", e)))?;

    Ok(lock_file)
}

fn read_job(dir: &Path) -> Result<Option<OrganizeJob>, JobError> {
    let path = dir.join(JOB_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(&path)
        .map_err(|e| JobError::Io(format!("Failed to read job file: {}", e)))?;

    let job: OrganizeJob = serde_json::from_str(&json)
        .map_err(|e| JobError::Serialization(format!("Failed to parse job file: {}", e)))?;

    Ok(Some(job))
}

fn write_job(dir: &Path, job: &OrganizeJob) -> Result<(), JobError> {
    let path = dir.join(JOB_FILE);
    let temp_path = dir.join(format!("{}.tmp", JOB_FILE));

    let json = serde_json::to_string_pretty(job)
        .map_err(|e| JobError::Serialization(format!("Failed to serialize job: {}", e)))?;

    fs::write(&temp_path, json)
        .map_err(|e| JobError::Io(format!("Failed to write job temp file: {}", e)))?;

    // Atomic rename
    fs::rename(&temp_path, &path)
        .map_err(|e| JobError::Io(format!("Failed to rename job file: {}", e)))
}

#[async_trait]
impl JobLedger for FileJobLedger {
    async fn load_job(&self) -> Result<Option<OrganizeJob>, JobError> {
        let job = self
            .blocking(|dir| {
                if !dir.join(JOB_FILE).exists() {
                    return Ok(None);
                }
                let _lock = acquire_lock(dir)?;
                read_job(dir)
            })
            .await?;

        if let Some(job) = &job {
            tracing::debug!(job_id = %job.job_id, status = ?job.status, "Loaded job");
        }
        Ok(job)
    }

    async fn save_job(&self, job: &OrganizeJob) -> Result<(), JobError> {
        let owned = job.clone();
        self.blocking(move |dir| {
            let _lock = acquire_lock(dir)?;
            write_job(dir, &owned)
        })
        .await?;

        tracing::debug!(job_id = %job.job_id, status = ?job.status, "Saved job state");
        Ok(())
    }

    async fn clear_job(&self) -> Result<(), JobError> {
        let removed = self
            .blocking(|dir| {
                let path = dir.join(JOB_FILE);
                if !path.exists() {
                    return Ok(false);
                }
                let _lock = acquire_lock(dir)?;
                fs::remove_file(&path)
                    .map_err(|e| JobError::Io(format!("Failed to delete job file: {}", e)))?;
                Ok(true)
            })
            .await?;

        if removed {
            tracing::debug!("Cleared job state");
        }
        Ok(())
    }

    async fn clear_job_if(&self, job_id: &str) -> Result<bool, JobError> {
        let expected = job_id.to_string();
        let removed = self
            .blocking(move |dir| {
                let path = dir.join(JOB_FILE);
                if !path.exists() {
                    return Ok(false);
                }
                let _lock = acquire_lock(dir)?;
                match read_job(dir)? {
                    Some(job) if job.job_id == expected => {
                        fs::remove_file(&path).map_err(|e| {
                            JobError::Io(format!("Failed to delete job file: {}", e))
                        })?;
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            })
            .await?;

        if removed {
            tracing::debug!(job_id = %job_id, "Cleared job state");
        }
        Ok(removed)
    }
}

/// Job ledger that lives only as long as the process
#[derive(Default)]
pub struct MemoryJobLedger {
    job: Mutex<Option<OrganizeJob>>,
}

impl MemoryJobLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the ledger with an existing record
    pub fn with_job(job: OrganizeJob) -> Self {
        Self {
            job: Mutex::new(Some(job)),
        }
    }
}

#[async_trait]
impl JobLedger for MemoryJobLedger {
    async fn load_job(&self) -> Result<Option<OrganizeJob>, JobError> {
        Ok(self.job.lock_ignore_poison().clone())
    }

    async fn save_job(&self, job: &OrganizeJob) -> Result<(), JobError> {
        *self.job.lock_ignore_poison() = Some(job.clone());
        Ok(())
    }

    async fn clear_job(&self) -> Result<(), JobError> {
        *self.job.lock_ignore_poison() = None;
        Ok(())
    }

    async fn clear_job_if(&self, job_id: &str) -> Result<bool, JobError> {
        let mut job = self.job.lock_ignore_poison();
        if job.as_ref().map(|j| j.job_id == job_id).unwrap_or(false) {
            *job = None;
            return Ok(true);
        }
        Ok(false)
    }
}
