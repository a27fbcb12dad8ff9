//! Job tracking for a single run
//!
//! Wraps the job ledger for the executor. A ledger failure never stops the
//! run: it is logged, and from then on the run continues in memory without
//! crash-recovery coverage.

use crate::jobs::{JobError, JobLedger};
use crate::plan::OrganizePlan;
use std::sync::Arc;
use std::time::Duration;

pub struct JobTracker {
    ledger: Arc<dyn JobLedger>,
    job_id: String,
    /// The job id came from the ledger (not an ephemeral fallback)
    persistent: bool,
    /// Every write so far was acknowledged
    active: bool,
    completed: Vec<String>,
    clear_delay: Duration,
}

impl JobTracker {
    pub fn new(
        ledger: Arc<dyn JobLedger>,
        job_id: impl Into<String>,
        persistent: bool,
        clear_delay: Duration,
    ) -> Self {
        Self {
            ledger,
            job_id: job_id.into(),
            persistent,
            active: persistent,
            completed: Vec::new(),
            clear_delay,
        }
    }

    /// Obtain a job id from the ledger, falling back to an in-memory id
    pub async fn start(
        ledger: Arc<dyn JobLedger>,
        target_folder: &str,
        clear_delay: Duration,
    ) -> Self {
        match ledger.start_job(target_folder).await {
            Ok(job_id) => Self::new(ledger, job_id, true, clear_delay),
            Err(e) => {
                let job_id = format!("local-{}", uuid::Uuid::new_v4());
                tracing::warn!(
                    error = %e,
                    job_id = %job_id,
                    "Job ledger unavailable, run continues without crash recovery"
                );
                Self::new(ledger, job_id, false, clear_delay)
            }
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn completed(&self) -> &[String] {
        &self.completed
    }

    fn degrade(&mut self, action: &str, err: JobError) {
        if self.active {
            tracing::warn!(
                job_id = %self.job_id,
                error = %err,
                "Failed to {}; crash recovery disabled for this run",
                action
            );
        }
        self.active = false;
    }

    /// Persist the plan that is about to run
    pub async fn set_plan(&mut self, plan: &OrganizePlan) {
        if !self.active {
            return;
        }
        if let Err(e) = self.ledger.set_job_plan(&self.job_id, plan).await {
            self.degrade("persist job plan", e);
        }
    }

    /// Record a successful operation
    pub async fn record_completed(&mut self, op_id: &str, index: usize) {
        if !self.completed.iter().any(|id| id == op_id) {
            self.completed.push(op_id.to_string());
        }
        if !self.active {
            return;
        }
        if let Err(e) = self
            .ledger
            .complete_job_operation(&self.job_id, op_id, index)
            .await
        {
            self.degrade("record completed operation", e);
        }
    }

    /// Record that the run failed. Attempted even after earlier write failures
    /// so the record does not look interrupted on the next start.
    pub async fn record_failure(&mut self, error: &str) {
        if !self.persistent {
            return;
        }
        if let Err(e) = self.ledger.fail_job(&self.job_id, error).await {
            self.degrade("mark job failed", e);
        }
    }

    /// Drop a run that never reached execution, removing its job record
    pub async fn discard(self) {
        if !self.persistent {
            return;
        }
        if let Err(e) = self.ledger.clear_job_if(&self.job_id).await {
            tracing::warn!(job_id = %self.job_id, error = %e, "Failed to clear abandoned job");
        }
    }

    /// Mark the job completed and clear it after the grace delay
    pub async fn record_completion(&mut self) {
        if !self.persistent {
            return;
        }
        if let Err(e) = self.ledger.complete_job(&self.job_id).await {
            self.degrade("mark job completed", e);
        }

        let ledger = Arc::clone(&self.ledger);
        let job_id = self.job_id.clone();
        let delay = self.clear_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match ledger.clear_job_if(&job_id).await {
                Ok(true) => tracing::debug!(job_id = %job_id, "Cleared completed job"),
                Ok(false) => {}
                Err(e) => tracing::warn!(job_id = %job_id, error = %e, "Failed to clear job"),
            }
        });
    }
}
