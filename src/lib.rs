//! Sentinel organizer core
//!
//! Validates AI-generated organize plans, previews them as a ghost overlay on
//! top of real directory listings, and executes them one operation at a time
//! with a crash-safe job record.

pub mod ai;
pub mod config;
pub mod edit;
pub mod error;
pub mod execution;
pub mod fs_ops;
pub mod ghost;
pub mod jobs;
pub mod plan;
pub mod utils;

pub use ai::{PlanningService, ThoughtEvent, ThoughtReceiver, ThoughtSender};
pub use config::OrganizerConfig;
pub use edit::PlanEditor;
pub use error::OrganizeError;
pub use execution::{
    ExecutionProgress, ExecutionReport, OrganizeController, OrganizePhase, OrganizeSnapshot,
};
pub use fs_ops::{FileOperations, LocalFileOperations};
pub use ghost::{FileEntry, GhostOverlay, OverlayEntry, RenderState};
pub use jobs::{FileJobLedger, InterruptedJobSummary, JobLedger, MemoryJobLedger};
pub use plan::{validate_plan, OperationType, OrganizeOperation, OrganizePlan, RiskLevel};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Reads `RUST_LOG`; defaults to warn for dependencies and info for this
/// crate (run summaries visible). Use `RUST_LOG=debug` for per-operation logs.
/// Does nothing if a subscriber is already installed.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,sentinel_organizer=info")),
        )
        .try_init();
}
