//! Advisory thought stream
//!
//! Exploration events are UI feedback only. The channel is bounded and sends
//! never wait: when it is full or nobody listens, events are dropped.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Expandable detail shown under a thought
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandableDetail {
    pub label: String,
    pub value: String,
}

impl ExpandableDetail {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// One exploration event from the planning service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThoughtEvent {
    /// Phase tag such as "indexing", "searching" or "thinking"
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Vec<ExpandableDetail>>,
}

/// Sending half of the thought channel
#[derive(Debug, Clone)]
pub struct ThoughtSender {
    tx: mpsc::Sender<ThoughtEvent>,
    dropped: Arc<AtomicU64>,
}

pub type ThoughtReceiver = mpsc::Receiver<ThoughtEvent>;

/// Create a bounded thought channel
pub fn thought_channel(capacity: usize) -> (ThoughtSender, ThoughtReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        ThoughtSender {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        rx,
    )
}

impl ThoughtSender {
    /// Emit an event without waiting. Returns false if it was dropped.
    pub fn emit(
        &self,
        kind: &str,
        content: impl Into<String>,
        detail: Option<Vec<ExpandableDetail>>,
    ) -> bool {
        self.send(ThoughtEvent {
            kind: kind.to_string(),
            content: content.into(),
            detail,
        })
    }

    pub fn send(&self, event: ThoughtEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Number of events dropped so far on this channel
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
