//! Organize job persistence
//!
//! A job is the durable record of one execution run. It is created when a run
//! starts, receives the plan when execution begins, is updated after every
//! completed operation and cleared on success or dismissal. A job found at
//! startup without a terminal status means the previous process exited
//! uncleanly.

pub mod ledger;

pub use ledger::*;

use crate::plan::OrganizePlan;
use crate::utils::folder_name;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of an organize job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is currently running
    Running,
    /// Job completed successfully
    Completed,
    /// Job failed with an error
    Failed,
    /// Job was interrupted (app crashed/closed)
    Interrupted,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Persistent state for an organize job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizeJob {
    /// Unique job identifier
    pub job_id: String,
    /// Target folder being organized
    pub target_folder: String,
    /// Human-readable folder name
    pub folder_name: String,
    pub started_at: DateTime<Utc>,
    pub status: JobStatus,
    /// The organization plan, set once execution starts
    pub plan: Option<OrganizePlan>,
    /// Hash of the plan at the time it was persisted
    pub plan_hash: Option<String>,
    /// IDs of operations that have completed, in completion order
    pub completed_ops: Vec<String>,
    /// Index of the last completed operation
    pub current_op_index: Option<usize>,
    pub last_updated_at: DateTime<Utc>,
    /// Error message if failed
    pub error: Option<String>,
    /// Total operations count
    pub total_ops: usize,
}

impl OrganizeJob {
    /// Create a new job for a folder
    pub fn new(target_folder: &str) -> Self {
        let now = Utc::now();
        Self {
            job_id: format!("job-{}", uuid::Uuid::new_v4()),
            target_folder: target_folder.to_string(),
            folder_name: folder_name(target_folder),
            started_at: now,
            status: JobStatus::Running,
            plan: None,
            plan_hash: None,
            completed_ops: Vec::new(),
            current_op_index: None,
            last_updated_at: now,
            error: None,
            total_ops: 0,
        }
    }

    /// Update the job with a plan
    pub fn set_plan(&mut self, plan: OrganizePlan) {
        self.total_ops = plan.operations.len();
        self.plan_hash = Some(plan.compute_hash());
        self.plan = Some(plan);
        self.update_timestamp();
    }

    /// Mark an operation as completed.
    ///
    /// Returns false when the id is already recorded or is not part of the plan,
    /// so the completed set can only grow and never exceeds the plan size.
    pub fn complete_operation(&mut self, op_id: &str) -> bool {
        if self.completed_ops.iter().any(|id| id == op_id) {
            return false;
        }
        if let Some(plan) = &self.plan {
            if !plan.operations.iter().any(|op| op.op_id == op_id) {
                tracing::warn!(job_id = %self.job_id, op_id = %op_id, "Ignoring unknown operation");
                return false;
            }
        }
        self.completed_ops.push(op_id.to_string());
        self.update_timestamp();
        true
    }

    /// Set current operation index
    pub fn set_current_op(&mut self, index: usize) {
        self.current_op_index = Some(index);
        self.update_timestamp();
    }

    /// Mark job as completed
    pub fn mark_completed(&mut self) {
        self.status = JobStatus::Completed;
        self.current_op_index = None;
        self.update_timestamp();
    }

    /// Mark job as failed
    pub fn mark_failed(&mut self, error: &str) {
        self.status = JobStatus::Failed;
        self.error = Some(error.to_string());
        self.update_timestamp();
    }

    /// Mark job as interrupted (called on recovery)
    pub fn mark_interrupted(&mut self) {
        if self.status == JobStatus::Running {
            self.status = JobStatus::Interrupted;
            self.update_timestamp();
        }
    }

    pub fn completed_count(&self) -> usize {
        self.completed_ops.len()
    }

    fn update_timestamp(&mut self) {
        self.last_updated_at = Utc::now();
    }
}

/// What the UI shows about a job abandoned by an unclean exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterruptedJobSummary {
    pub job_id: String,
    pub folder_name: String,
    pub target_folder: String,
    pub completed_count: usize,
    pub total_count: usize,
    pub started_at: DateTime<Utc>,
}

impl From<&OrganizeJob> for InterruptedJobSummary {
    fn from(job: &OrganizeJob) -> Self {
        Self {
            job_id: job.job_id.clone(),
            folder_name: job.folder_name.clone(),
            target_folder: job.target_folder.clone(),
            completed_count: job.completed_count(),
            total_count: job.total_ops,
            started_at: job.started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::OrganizeOperation;

    fn plan() -> OrganizePlan {
        OrganizePlan {
            plan_id: "plan-1".to_string(),
            description: "test".to_string(),
            target_folder: "/T".to_string(),
            operations: vec![
                OrganizeOperation::create_folder("op-1", "/T/Docs"),
                OrganizeOperation::move_op("op-2", "/T/a.pdf", "/T/Docs/a.pdf"),
            ],
            simplification_recommended: None,
        }
    }

    #[test]
    fn test_new_job() {
        let job = OrganizeJob::new("/Users/me/Downloads");
        assert!(job.job_id.starts_with("job-"));
        assert_eq!(job.folder_name, "Downloads");
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.total_ops, 0);
        assert!(job.plan.is_none());
    }

    #[test]
    fn test_completed_set_is_monotonic_and_bounded() {
        let mut job = OrganizeJob::new("/T");
        job.set_plan(plan());
        assert_eq!(job.total_ops, 2);
        assert!(job.plan_hash.is_some());

        assert!(job.complete_operation("op-1"));
        assert!(!job.complete_operation("op-1"));
        assert!(!job.complete_operation("op-99"));
        assert!(job.complete_operation("op-2"));

        assert_eq!(job.completed_ops, vec!["op-1", "op-2"]);
        assert!(job.completed_count() <= job.total_ops);
    }

    #[test]
    fn test_status_transitions() {
        let mut job = OrganizeJob::new("/T");
        job.mark_interrupted();
        assert_eq!(job.status, JobStatus::Interrupted);
        assert!(!job.status.is_terminal());

        let mut failed = OrganizeJob::new("/T");
        failed.mark_failed("disk full");
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("disk full"));
        // Terminal jobs are never re-marked
        failed.mark_interrupted();
        assert_eq!(failed.status, JobStatus::Failed);

        let mut done = OrganizeJob::new("/T");
        done.set_current_op(3);
        done.mark_completed();
        assert_eq!(done.current_op_index, None);
        assert!(done.status.is_terminal());
    }

    #[test]
    fn test_summary() {
        let mut job = OrganizeJob::new("/T/Photos");
        job.set_plan(plan());
        job.complete_operation("op-1");
        let summary = InterruptedJobSummary::from(&job);
        assert_eq!(summary.folder_name, "Photos");
        assert_eq!(summary.completed_count, 1);
        assert_eq!(summary.total_count, 2);
    }
}
