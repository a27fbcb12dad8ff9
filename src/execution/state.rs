//! Organizer state published to the UI

use crate::plan::{OrganizePlan, PlanRiskSummary};
use serde::{Deserialize, Serialize};

/// Phase of the organize state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizePhase {
    #[default]
    Idle,
    /// Waiting for the user to choose a strategy
    AwaitingInstruction,
    Scanning,
    Analyzing,
    /// Plan received and previewed, waiting for accept/reject/edit
    Planning,
    Executing,
    Complete,
    Failed,
}

impl OrganizePhase {
    /// Phases in which a run is set up but nothing has touched the disk
    pub fn is_pre_execution(&self) -> bool {
        matches!(
            self,
            Self::AwaitingInstruction | Self::Scanning | Self::Analyzing | Self::Planning
        )
    }
}

/// Per-operation execution progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionProgress {
    pub completed: usize,
    pub total: usize,
    pub current_index: Option<usize>,
    pub current_op_id: Option<String>,
    pub current_description: Option<String>,
}

/// Why a run stopped, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFailure {
    pub op_id: Option<String>,
    pub index: Option<usize>,
    /// Description of the failing operation (or the failing phase)
    pub description: String,
    /// Raw error text
    pub error: String,
}

/// Everything the UI needs to render the organizer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizeSnapshot {
    pub phase: OrganizePhase,
    pub target_folder: Option<String>,
    pub job_id: Option<String>,
    pub plan: Option<OrganizePlan>,
    pub risk_summary: Option<PlanRiskSummary>,
    pub progress: Option<ExecutionProgress>,
    pub failure: Option<RunFailure>,
    pub is_executing: bool,
    /// The job ledger could not be written; this run has no crash recovery
    pub persistence_degraded: bool,
}

/// Outcome of a fully executed plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub job_id: String,
    pub plan_id: String,
    pub completed_count: usize,
    pub total_count: usize,
    pub completed_ops: Vec<String>,
    /// Whether every step reached the job ledger
    pub persisted: bool,
}
