//! Execution Module
//!
//! The organize state machine and the sequential plan executor behind it.
//! Per-operation progress and the final outcome are published through a
//! `watch` channel; the job ledger is updated as each operation completes.

pub mod controller;
pub mod executor;
pub mod state;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::*;
pub use executor::*;
pub use state::*;
pub use tracker::*;
