//! Merging real directory listings with the ghost overlay

use super::{GhostEntry, RenderState};
use crate::plan::{file_name, parent_path};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A directory entry as read from disk by the listing renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<u64>,
}

impl FileEntry {
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        let path = path.into();
        Self {
            name: file_name(&path),
            path,
            is_directory: false,
            size,
            modified_at: None,
        }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: file_name(&path),
            path,
            is_directory: true,
            size: 0,
            modified_at: None,
        }
    }
}

/// A listing entry decorated with its ghost state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayEntry {
    #[serde(flatten)]
    pub entry: FileEntry,
    pub render_state: RenderState,
    pub operation_id: Option<String>,
    pub linked_path: Option<String>,
    pub is_virtual: bool,
}

/// Trailing separators are not significant when comparing directories
fn normalize_dir(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() && !path.is_empty() {
        // Keep the root as-is
        &path[..1]
    } else {
        trimmed
    }
}

/// Merge `real_entries` with `ghosts` for the listing of `current_directory`.
///
/// Real entries take their ghost state when one exists. Virtual ghosts whose
/// parent is `current_directory` and that have no real counterpart are
/// synthesized; a name without an extension is shown as a directory.
/// The result lists directories first, then sorts by name.
pub fn merge_entries(
    ghosts: &[GhostEntry],
    real_entries: &[FileEntry],
    current_directory: &str,
) -> Vec<OverlayEntry> {
    let by_path: HashMap<&str, &GhostEntry> =
        ghosts.iter().map(|g| (g.path.as_str(), g)).collect();
    let real_paths: HashSet<&str> = real_entries.iter().map(|e| e.path.as_str()).collect();
    let current = normalize_dir(current_directory);

    let mut merged: Vec<OverlayEntry> = real_entries
        .iter()
        .map(|entry| match by_path.get(entry.path.as_str()) {
            Some(ghost) => OverlayEntry {
                entry: entry.clone(),
                render_state: ghost.render_state,
                operation_id: Some(ghost.operation_id.clone()),
                linked_path: ghost.linked_path.clone(),
                // It is on disk, whatever the plan predicted
                is_virtual: false,
            },
            None => OverlayEntry {
                entry: entry.clone(),
                render_state: RenderState::Normal,
                operation_id: None,
                linked_path: None,
                is_virtual: false,
            },
        })
        .collect();

    for ghost in ghosts {
        if !ghost.is_virtual || real_paths.contains(ghost.path.as_str()) {
            continue;
        }
        if normalize_dir(&parent_path(&ghost.path)) != current {
            continue;
        }
        let is_directory = Path::new(&ghost.path).extension().is_none();
        merged.push(OverlayEntry {
            entry: FileEntry {
                name: file_name(&ghost.path),
                path: ghost.path.clone(),
                is_directory,
                size: 0,
                modified_at: None,
            },
            render_state: ghost.render_state,
            operation_id: Some(ghost.operation_id.clone()),
            linked_path: ghost.linked_path.clone(),
            is_virtual: true,
        });
    }

    merged.sort_by(|a, b| {
        b.entry
            .is_directory
            .cmp(&a.entry.is_directory)
            .then_with(|| a.entry.name.cmp(&b.entry.name))
    });

    merged
}
