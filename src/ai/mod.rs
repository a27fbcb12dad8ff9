//! AI planning service seam
//!
//! The planning logic lives outside this crate. The organizer only needs a
//! raw plan back and forwards the service's exploration events to the UI as
//! advisory "thoughts".

pub mod thoughts;

pub use thoughts::*;

use async_trait::async_trait;

/// Produces organize plans for a folder
#[async_trait]
pub trait PlanningService: Send + Sync {
    /// Explore the folder before planning. Default does nothing.
    async fn scan(&self, _target_folder: &str, _thoughts: ThoughtSender) -> Result<(), String> {
        Ok(())
    }

    /// Generate a plan for `target_folder` following the user's `intent`.
    ///
    /// The result is untyped; it goes through plan validation before use.
    async fn plan(
        &self,
        target_folder: &str,
        intent: &str,
        thoughts: ThoughtSender,
    ) -> Result<serde_json::Value, String>;
}
