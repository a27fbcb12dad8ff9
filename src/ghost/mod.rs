//! Ghost Overlay Engine
//!
//! A render-only projection of what a plan will do to a directory listing.
//! The overlay is built from a plan before any disk I/O, advanced as
//! operations complete, and thrown away on reset. It never touches the
//! filesystem.
//!
//! Source/destination pairs are kept as one association per operation with
//! two lookup indices (by source path, by destination path) instead of
//! back-pointers on the entries themselves.

pub mod merge;

pub use merge::*;

use crate::plan::{OperationType, OrganizePlan};
use crate::utils::IgnorePoison;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Render state of a path in the overlay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderState {
    #[default]
    Normal,
    Creating,
    Source,
    Destination,
    Deleting,
    Completed,
}

/// A path's ghost state as seen by a renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhostEntry {
    pub path: String,
    pub render_state: RenderState,
    pub operation_id: String,
    /// Counterpart path of the same operation (source <-> destination)
    pub linked_path: Option<String>,
    /// The path does not exist on disk yet
    pub is_virtual: bool,
}

/// Counts per render state plus outstanding settle timers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhostStats {
    pub creating: usize,
    pub source: usize,
    pub destination: usize,
    pub deleting: usize,
    pub completed: usize,
    pub virtual_entries: usize,
    pub pending_timers: usize,
}

#[derive(Debug, Clone)]
struct GhostSlot {
    render_state: RenderState,
    operation_id: String,
    is_virtual: bool,
}

#[derive(Debug, Clone)]
struct OperationLink {
    source: String,
    destination: String,
}

#[derive(Default)]
struct GhostState {
    slots: HashMap<String, GhostSlot>,
    /// op_id -> source/destination pair
    links: HashMap<String, OperationLink>,
    by_source: HashMap<String, String>,
    by_destination: HashMap<String, String>,
    /// Pending removal timers keyed by path
    timers: HashMap<String, JoinHandle<()>>,
    /// Bumped on every reset; timers from an older generation do nothing
    generation: u64,
}

impl GhostState {
    fn register(&mut self, path: &str, render_state: RenderState, op_id: &str, is_virtual: bool) {
        // Last registration wins when a plan touches one path twice
        if let Some(previous) = self.slots.get(path) {
            if previous.operation_id != op_id {
                tracing::debug!(
                    path = %path,
                    previous_op = %previous.operation_id,
                    op_id = %op_id,
                    "Ghost path registered by more than one operation"
                );
            }
        }
        self.slots.insert(
            path.to_string(),
            GhostSlot {
                render_state,
                operation_id: op_id.to_string(),
                is_virtual,
            },
        );
    }

    fn link(&mut self, op_id: &str, source: &str, destination: &str) {
        self.links.insert(
            op_id.to_string(),
            OperationLink {
                source: source.to_string(),
                destination: destination.to_string(),
            },
        );
        self.by_source.insert(source.to_string(), op_id.to_string());
        self.by_destination
            .insert(destination.to_string(), op_id.to_string());
    }

    fn linked_path(&self, path: &str, op_id: &str) -> Option<String> {
        if self.by_source.get(path).map(String::as_str) == Some(op_id) {
            return self.links.get(op_id).map(|l| l.destination.clone());
        }
        if self.by_destination.get(path).map(String::as_str) == Some(op_id) {
            return self.links.get(op_id).map(|l| l.source.clone());
        }
        None
    }

    fn entry(&self, path: &str) -> Option<GhostEntry> {
        let slot = self.slots.get(path)?;
        Some(GhostEntry {
            path: path.to_string(),
            render_state: slot.render_state,
            operation_id: slot.operation_id.clone(),
            linked_path: self.linked_path(path, &slot.operation_id),
            is_virtual: slot.is_virtual,
        })
    }

    /// Remove a completed slot and drop the link once none of its paths remain
    fn remove_completed(&mut self, path: &str, op_id: &str) {
        let matches = self
            .slots
            .get(path)
            .map(|s| s.operation_id == op_id && s.render_state == RenderState::Completed)
            .unwrap_or(false);
        if !matches {
            return;
        }
        self.slots.remove(path);

        let still_referenced = self.slots.values().any(|s| s.operation_id == op_id);
        if !still_referenced {
            if let Some(link) = self.links.remove(op_id) {
                if self.by_source.get(&link.source).map(String::as_str) == Some(op_id) {
                    self.by_source.remove(&link.source);
                }
                if self.by_destination.get(&link.destination).map(String::as_str) == Some(op_id) {
                    self.by_destination.remove(&link.destination);
                }
            }
        }
    }

    fn clear(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
        self.slots.clear();
        self.links.clear();
        self.by_source.clear();
        self.by_destination.clear();
        self.generation += 1;
    }
}

/// Shared handle to the ghost overlay of the current organize run
#[derive(Clone)]
pub struct GhostOverlay {
    state: Arc<Mutex<GhostState>>,
    settle_delay: Duration,
}

impl GhostOverlay {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(GhostState::default())),
            settle_delay,
        }
    }

    /// Replace the overlay with the projection of `plan`
    pub fn build_from_plan(&self, plan: &OrganizePlan) {
        let mut state = self.state.lock_ignore_poison();
        state.clear();

        for op in &plan.operations {
            let op_id = op.op_id.as_str();
            match op.op_type {
                OperationType::CreateFolder => {
                    if let Some(path) = op.path.as_deref() {
                        state.register(path, RenderState::Creating, op_id, true);
                    }
                }
                OperationType::Move => {
                    if let (Some(source), Some(destination)) =
                        (op.source.as_deref(), op.destination.as_deref())
                    {
                        state.register(source, RenderState::Source, op_id, false);
                        state.register(destination, RenderState::Destination, op_id, true);
                        state.link(op_id, source, destination);
                    }
                }
                OperationType::Rename => {
                    if let (Some(path), Some(new_path)) = (op.path.as_deref(), op.rename_target()) {
                        state.register(path, RenderState::Source, op_id, false);
                        state.register(&new_path, RenderState::Destination, op_id, true);
                        state.link(op_id, path, &new_path);
                    }
                }
                OperationType::Trash => {
                    if let Some(path) = op.path.as_deref() {
                        state.register(path, RenderState::Deleting, op_id, false);
                    }
                }
                OperationType::Copy => {
                    // The copy source stays Normal; only the new path is shown
                    if let (Some(source), Some(destination)) =
                        (op.source.as_deref(), op.destination.as_deref())
                    {
                        state.register(destination, RenderState::Destination, op_id, true);
                        state.link(op_id, source, destination);
                    }
                }
            }
        }

        tracing::debug!(
            plan_id = %plan.plan_id,
            entries = state.slots.len(),
            "Built ghost overlay"
        );
    }

    /// Mark every path of `op_id` completed and schedule its removal
    pub fn mark_operation_completed(&self, op_id: &str) {
        let mut state = self.state.lock_ignore_poison();

        let paths: Vec<String> = state
            .slots
            .iter()
            .filter(|(_, slot)| slot.operation_id == op_id)
            .map(|(path, _)| path.clone())
            .collect();

        if paths.is_empty() {
            return;
        }

        for path in &paths {
            if let Some(slot) = state.slots.get_mut(path) {
                slot.render_state = RenderState::Completed;
            }
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                // No runtime to host the settle timer; drop the entries right away
                for path in &paths {
                    state.remove_completed(path, op_id);
                }
                return;
            }
        };

        let generation = state.generation;
        for path in paths {
            let shared = Arc::clone(&self.state);
            let delay = self.settle_delay;
            let timer_path = path.clone();
            let timer_op = op_id.to_string();

            let handle = runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                let mut state = shared.lock_ignore_poison();
                if state.generation != generation {
                    return;
                }
                state.timers.remove(&timer_path);
                state.remove_completed(&timer_path, &timer_op);
            });

            if let Some(previous) = state.timers.insert(path, handle) {
                previous.abort();
            }
        }
    }

    /// Clear the map and cancel every pending removal
    pub fn reset(&self) {
        let mut state = self.state.lock_ignore_poison();
        state.clear();
    }

    pub fn get(&self, path: &str) -> Option<GhostEntry> {
        self.state.lock_ignore_poison().entry(path)
    }

    /// Snapshot of all entries, sorted by path
    pub fn entries(&self) -> Vec<GhostEntry> {
        let state = self.state.lock_ignore_poison();
        let mut entries: Vec<GhostEntry> = state
            .slots
            .keys()
            .filter_map(|path| state.entry(path))
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    pub fn len(&self) -> usize {
        self.state.lock_ignore_poison().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_timer_count(&self) -> usize {
        self.state.lock_ignore_poison().timers.len()
    }

    pub fn generation(&self) -> u64 {
        self.state.lock_ignore_poison().generation
    }

    pub fn stats(&self) -> GhostStats {
        let state = self.state.lock_ignore_poison();
        let mut stats = GhostStats {
            pending_timers: state.timers.len(),
            ..GhostStats::default()
        };
        for slot in state.slots.values() {
            match slot.render_state {
                RenderState::Creating => stats.creating += 1,
                RenderState::Source => stats.source += 1,
                RenderState::Destination => stats.destination += 1,
                RenderState::Deleting => stats.deleting += 1,
                RenderState::Completed => stats.completed += 1,
                RenderState::Normal => {}
            }
            if slot.is_virtual {
                stats.virtual_entries += 1;
            }
        }
        stats
    }

    /// Merge real directory entries with the overlay for display
    pub fn merge(&self, real_entries: &[FileEntry], current_directory: &str) -> Vec<OverlayEntry> {
        let entries = self.entries();
        merge::merge_entries(&entries, real_entries, current_directory)
    }
}

impl Default for GhostOverlay {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::DEFAULT_GHOST_SETTLE_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::OrganizeOperation;

    fn plan(operations: Vec<OrganizeOperation>) -> OrganizePlan {
        OrganizePlan {
            plan_id: "plan-1".to_string(),
            description: "test".to_string(),
            target_folder: "/T".to_string(),
            operations,
            simplification_recommended: None,
        }
    }

    #[test]
    fn test_build_create_and_move() {
        let overlay = GhostOverlay::default();
        overlay.build_from_plan(&plan(vec![
            OrganizeOperation::create_folder("op-1", "/T/Docs"),
            OrganizeOperation::move_op("op-2", "/T/a.pdf", "/T/Docs/a.pdf"),
        ]));

        assert_eq!(overlay.len(), 3);

        let docs = overlay.get("/T/Docs").unwrap();
        assert_eq!(docs.render_state, RenderState::Creating);
        assert!(docs.is_virtual);
        assert_eq!(docs.linked_path, None);

        let source = overlay.get("/T/a.pdf").unwrap();
        assert_eq!(source.render_state, RenderState::Source);
        assert!(!source.is_virtual);
        assert_eq!(source.linked_path.as_deref(), Some("/T/Docs/a.pdf"));

        let destination = overlay.get("/T/Docs/a.pdf").unwrap();
        assert_eq!(destination.render_state, RenderState::Destination);
        assert!(destination.is_virtual);
        assert_eq!(destination.linked_path.as_deref(), Some("/T/a.pdf"));
        assert_eq!(destination.operation_id, "op-2");
    }

    #[test]
    fn test_build_rename_trash_copy() {
        let overlay = GhostOverlay::default();
        overlay.build_from_plan(&plan(vec![
            OrganizeOperation::rename("op-1", "/T/IMG_1.jpg", "beach.jpg"),
            OrganizeOperation::trash("op-2", "/T/old.txt"),
            OrganizeOperation::copy("op-3", "/T/notes.md", "/T/Backup/notes.md"),
        ]));

        let renamed = overlay.get("/T/beach.jpg").unwrap();
        assert_eq!(renamed.render_state, RenderState::Destination);
        assert_eq!(renamed.linked_path.as_deref(), Some("/T/IMG_1.jpg"));
        assert_eq!(
            overlay.get("/T/IMG_1.jpg").unwrap().linked_path.as_deref(),
            Some("/T/beach.jpg")
        );

        let trashed = overlay.get("/T/old.txt").unwrap();
        assert_eq!(trashed.render_state, RenderState::Deleting);
        assert!(!trashed.is_virtual);

        // Copy source is left untouched
        assert!(overlay.get("/T/notes.md").is_none());
        let copied = overlay.get("/T/Backup/notes.md").unwrap();
        assert_eq!(copied.linked_path.as_deref(), Some("/T/notes.md"));
    }

    #[test]
    fn test_conflicting_roles_last_registration_wins() {
        let overlay = GhostOverlay::default();
        overlay.build_from_plan(&plan(vec![
            OrganizeOperation::move_op("op-1", "/T/a.pdf", "/T/Docs/a.pdf"),
            OrganizeOperation::trash("op-2", "/T/a.pdf"),
        ]));

        let entry = overlay.get("/T/a.pdf").unwrap();
        assert_eq!(entry.render_state, RenderState::Deleting);
        assert_eq!(entry.operation_id, "op-2");
        assert_eq!(entry.linked_path, None);
        // The destination still points back to its own source path
        assert_eq!(
            overlay.get("/T/Docs/a.pdf").unwrap().linked_path.as_deref(),
            Some("/T/a.pdf")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_entries_removed_after_settle_delay() {
        let overlay = GhostOverlay::new(Duration::from_millis(1500));
        overlay.build_from_plan(&plan(vec![OrganizeOperation::trash("op-1", "/T/old.txt")]));

        assert_eq!(overlay.get("/T/old.txt").unwrap().render_state, RenderState::Deleting);

        overlay.mark_operation_completed("op-1");
        assert_eq!(overlay.get("/T/old.txt").unwrap().render_state, RenderState::Completed);
        assert_eq!(overlay.pending_timer_count(), 1);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(overlay.get("/T/old.txt").is_some());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(overlay.get("/T/old.txt").is_none());
        assert_eq!(overlay.pending_timer_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_timers_and_is_idempotent() {
        let overlay = GhostOverlay::new(Duration::from_millis(100));
        overlay.build_from_plan(&plan(vec![
            OrganizeOperation::create_folder("op-1", "/T/Docs"),
            OrganizeOperation::move_op("op-2", "/T/a.pdf", "/T/Docs/a.pdf"),
        ]));
        overlay.mark_operation_completed("op-2");
        assert_eq!(overlay.pending_timer_count(), 2);

        overlay.reset();
        assert!(overlay.is_empty());
        assert_eq!(overlay.pending_timer_count(), 0);

        overlay.reset();
        assert!(overlay.is_empty());
        assert_eq!(overlay.pending_timer_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_does_not_touch_new_map() {
        let overlay = GhostOverlay::new(Duration::from_millis(100));
        let first = plan(vec![OrganizeOperation::trash("op-1", "/T/old.txt")]);
        overlay.build_from_plan(&first);
        let generation = overlay.generation();
        overlay.mark_operation_completed("op-1");

        // Detach the timer so the rebuild cannot abort it
        let detached: Vec<_> = overlay.state.lock_ignore_poison().timers.drain().collect();
        assert_eq!(detached.len(), 1);

        // A new plan reuses the same op id and path before the timer fires
        overlay.build_from_plan(&first);
        assert_eq!(overlay.generation(), generation + 1);
        overlay.state.lock_ignore_poison().slots.get_mut("/T/old.txt").unwrap().render_state =
            RenderState::Completed;

        tokio::time::sleep(Duration::from_millis(200)).await;
        for (_, handle) in detached {
            handle.await.unwrap();
        }
        let entry = overlay.get("/T/old.txt").unwrap();
        assert_eq!(entry.render_state, RenderState::Completed);
    }

    #[test]
    fn test_mark_completed_without_runtime_removes_immediately() {
        let overlay = GhostOverlay::default();
        overlay.build_from_plan(&plan(vec![OrganizeOperation::create_folder("op-1", "/T/Docs")]));
        overlay.mark_operation_completed("op-1");
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_stats() {
        let overlay = GhostOverlay::default();
        overlay.build_from_plan(&plan(vec![
            OrganizeOperation::create_folder("op-1", "/T/Docs"),
            OrganizeOperation::move_op("op-2", "/T/a.pdf", "/T/Docs/a.pdf"),
            OrganizeOperation::trash("op-3", "/T/old.txt"),
        ]));
        let stats = overlay.stats();
        assert_eq!(stats.creating, 1);
        assert_eq!(stats.source, 1);
        assert_eq!(stats.destination, 1);
        assert_eq!(stats.deleting, 1);
        assert_eq!(stats.virtual_entries, 2);
        assert_eq!(stats.pending_timers, 0);
    }
}
