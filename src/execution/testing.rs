//! In-memory collaborators for execution tests

use crate::ai::{ExpandableDetail, PlanningService, ThoughtSender};
use crate::fs_ops::FileOperations;
use crate::jobs::{JobError, JobLedger, OrganizeJob};
use crate::utils::IgnorePoison;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;

/// Records every call; optionally fails on one path or sleeps per call
#[derive(Default)]
pub struct RecordingFileOperations {
    calls: Mutex<Vec<String>>,
    fail_on: Option<(String, String)>,
    delay: Option<Duration>,
}

impl RecordingFileOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(path: &str, message: &str) -> Self {
        Self {
            fail_on: Some((path.to_string(), message.to_string())),
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock_ignore_poison().clone()
    }

    async fn record(&self, call: String, paths: &[&str]) -> Result<(), String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock_ignore_poison().push(call);
        match &self.fail_on {
            Some((path, message)) if paths.contains(&path.as_str()) => Err(message.clone()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl FileOperations for RecordingFileOperations {
    async fn create_directory(&self, path: &str) -> Result<(), String> {
        self.record(format!("create_directory {}", path), &[path])
            .await
    }

    async fn move_path(&self, source: &str, destination: &str) -> Result<(), String> {
        self.record(
            format!("move {} -> {}", source, destination),
            &[source, destination],
        )
        .await
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), String> {
        self.record(
            format!("rename {} -> {}", old_path, new_path),
            &[old_path, new_path],
        )
        .await
    }

    async fn delete_to_trash(&self, path: &str) -> Result<(), String> {
        self.record(format!("trash {}", path), &[path]).await
    }

    async fn copy(&self, source: &str, destination: &str) -> Result<(), String> {
        self.record(
            format!("copy {} -> {}", source, destination),
            &[source, destination],
        )
        .await
    }
}

/// Returns a fixed payload (or error) and remembers the intents it saw
pub struct StaticPlanner {
    payload: Result<Value, String>,
    intents: Mutex<Vec<String>>,
}

impl StaticPlanner {
    pub fn new(payload: Value) -> Self {
        Self {
            payload: Ok(payload),
            intents: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            payload: Err(message.to_string()),
            intents: Mutex::new(Vec::new()),
        }
    }

    pub fn intents(&self) -> Vec<String> {
        self.intents.lock_ignore_poison().clone()
    }
}

#[async_trait]
impl PlanningService for StaticPlanner {
    async fn plan(
        &self,
        target_folder: &str,
        intent: &str,
        thoughts: ThoughtSender,
    ) -> Result<Value, String> {
        self.intents.lock_ignore_poison().push(intent.to_string());
        thoughts.emit(
            "thinking",
            "Grouping files by type",
            Some(vec![ExpandableDetail::new("Folder", target_folder)]),
        );
        self.payload.clone()
    }
}

/// Ledger whose storage is gone
pub struct BrokenLedger;

#[async_trait]
impl JobLedger for BrokenLedger {
    async fn load_job(&self) -> Result<Option<OrganizeJob>, JobError> {
        Err(JobError::Io("disk unplugged".to_string()))
    }

    async fn save_job(&self, _job: &OrganizeJob) -> Result<(), JobError> {
        Err(JobError::Io("disk unplugged".to_string()))
    }

    async fn clear_job(&self) -> Result<(), JobError> {
        Err(JobError::Io("disk unplugged".to_string()))
    }
}
