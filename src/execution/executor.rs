//! Execution Engine
//!
//! Runs a plan's operations strictly in order, one at a time. The first
//! failure halts the run; operations already applied stay applied.

use super::state::{ExecutionProgress, ExecutionReport};
use super::tracker::JobTracker;
use crate::error::OrganizeError;
use crate::fs_ops::FileOperations;
use crate::ghost::GhostOverlay;
use crate::plan::{OperationType, OrganizeOperation, OrganizePlan};
use std::sync::Arc;

/// Sequential executor for organize plans
pub struct PlanExecutor {
    fs: Arc<dyn FileOperations>,
    ghost: GhostOverlay,
}

impl PlanExecutor {
    pub fn new(fs: Arc<dyn FileOperations>, ghost: GhostOverlay) -> Self {
        Self { fs, ghost }
    }

    /// Execute `plan`, reporting progress before and after every operation.
    ///
    /// `is_current` is checked around each dispatch. Once it returns false the
    /// run stops before the next operation and leaves the overlay and the job
    /// record to the newer run.
    pub async fn execute<P, C>(
        &self,
        plan: &OrganizePlan,
        tracker: &mut JobTracker,
        mut on_progress: P,
        is_current: C,
    ) -> Result<ExecutionReport, OrganizeError>
    where
        P: FnMut(ExecutionProgress),
        C: Fn() -> bool,
    {
        let total = plan.len();
        tracing::info!(
            job_id = %tracker.job_id(),
            plan_id = %plan.plan_id,
            operations = total,
            "Executing organize plan"
        );

        tracker.set_plan(plan).await;

        for (index, op) in plan.operations.iter().enumerate() {
            if !is_current() {
                tracing::warn!(
                    job_id = %tracker.job_id(),
                    completed = index,
                    total,
                    "Run superseded, stopping before next operation"
                );
                return Err(OrganizeError::InvalidState(format!(
                    "Run superseded after {} of {} operations",
                    index, total
                )));
            }

            let description = op.description();
            on_progress(ExecutionProgress {
                completed: index,
                total,
                current_index: Some(index),
                current_op_id: Some(op.op_id.clone()),
                current_description: Some(description.clone()),
            });

            tracing::debug!(
                op_id = %op.op_id,
                index,
                op_type = op.op_type.as_str(),
                "Executing operation"
            );

            if let Err(message) = dispatch_operation(self.fs.as_ref(), op).await {
                let err = OrganizeError::OperationExecution {
                    op_id: op.op_id.clone(),
                    index,
                    description,
                    message,
                };
                tracing::warn!(
                    job_id = %tracker.job_id(),
                    op_id = %op.op_id,
                    index,
                    error = %err,
                    "Operation failed, halting run"
                );
                if is_current() {
                    tracker.record_failure(&err.to_string()).await;
                }
                return Err(err);
            }

            // A newer run owns the overlay and the job record once this one is superseded
            if is_current() {
                self.ghost.mark_operation_completed(&op.op_id);
                tracker.record_completed(&op.op_id, index).await;
            }

            on_progress(ExecutionProgress {
                completed: index + 1,
                total,
                current_index: Some(index),
                current_op_id: Some(op.op_id.clone()),
                current_description: Some(description),
            });
        }

        tracker.record_completion().await;

        tracing::info!(
            job_id = %tracker.job_id(),
            completed = total,
            persisted = tracker.is_active(),
            "Organize plan executed"
        );

        Ok(ExecutionReport {
            job_id: tracker.job_id().to_string(),
            plan_id: plan.plan_id.clone(),
            completed_count: tracker.completed().len(),
            total_count: total,
            completed_ops: tracker.completed().to_vec(),
            persisted: tracker.is_active(),
        })
    }
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, String> {
    value
        .as_deref()
        .ok_or_else(|| format!("Missing required field '{}'", field))
}

/// Route one operation to the filesystem collaborator
pub async fn dispatch_operation(
    fs: &dyn FileOperations,
    op: &OrganizeOperation,
) -> Result<(), String> {
    match op.op_type {
        OperationType::CreateFolder => fs.create_directory(required(&op.path, "path")?).await,
        OperationType::Move => {
            fs.move_path(
                required(&op.source, "source")?,
                required(&op.destination, "destination")?,
            )
            .await
        }
        OperationType::Rename => {
            let old_path = required(&op.path, "path")?;
            let new_path = op
                .rename_target()
                .ok_or_else(|| "Missing required field 'newName'".to_string())?;
            fs.rename(old_path, &new_path).await
        }
        OperationType::Trash => fs.delete_to_trash(required(&op.path, "path")?).await,
        OperationType::Copy => {
            fs.copy(
                required(&op.source, "source")?,
                required(&op.destination, "destination")?,
            )
            .await
        }
    }
}
