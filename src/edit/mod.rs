//! Plan Edit Model
//!
//! A user-editable copy of a plan. Operations can be switched off one at a
//! time or per destination folder, and destinations/new names can be edited
//! freely. Paths are not checked here; the filesystem rejects what it must at
//! execution time.

use crate::plan::{OrganizeOperation, OrganizePlan};
use serde::{Deserialize, Serialize};

/// An operation in the edit view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableOperation {
    #[serde(flatten)]
    pub operation: OrganizeOperation,
    pub enabled: bool,
    pub is_modified: bool,
    pub original_destination: Option<String>,
    pub original_new_name: Option<String>,
}

impl EditableOperation {
    fn new(operation: OrganizeOperation) -> Self {
        Self {
            original_destination: operation.destination.clone(),
            original_new_name: operation.new_name.clone(),
            operation,
            enabled: true,
            is_modified: false,
        }
    }

    fn refresh_modified(&mut self) {
        self.is_modified = self.operation.destination != self.original_destination
            || self.operation.new_name != self.original_new_name;
    }

    /// Folder this operation is grouped under in the edit view
    pub fn group_folder(&self) -> Option<String> {
        group_key(&self.operation)
    }
}

/// Destination folder group shown in the edit view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationGroup {
    pub folder: String,
    pub total: usize,
    pub enabled: usize,
}

fn normalize(folder: &str) -> &str {
    let trimmed = folder.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        folder
    } else {
        trimmed
    }
}

#[derive(Debug, Clone)]
pub struct PlanEditor {
    plan_id: String,
    description: String,
    target_folder: String,
    simplification_recommended: Option<bool>,
    operations: Vec<EditableOperation>,
}

impl PlanEditor {
    /// Open the edit view on a copy of `plan`; everything starts enabled
    pub fn open(plan: &OrganizePlan) -> Self {
        Self {
            plan_id: plan.plan_id.clone(),
            description: plan.description.clone(),
            target_folder: plan.target_folder.clone(),
            simplification_recommended: plan.simplification_recommended,
            operations: plan
                .operations
                .iter()
                .cloned()
                .map(EditableOperation::new)
                .collect(),
        }
    }

    pub fn plan_id(&self) -> &str {
        &self.plan_id
    }

    pub fn operations(&self) -> &[EditableOperation] {
        &self.operations
    }

    pub fn get(&self, op_id: &str) -> Option<&EditableOperation> {
        self.operations.iter().find(|op| op.operation.op_id == op_id)
    }

    fn get_mut(&mut self, op_id: &str) -> Option<&mut EditableOperation> {
        self.operations
            .iter_mut()
            .find(|op| op.operation.op_id == op_id)
    }

    /// Flip one operation. Returns its new enabled state.
    pub fn toggle_operation(&mut self, op_id: &str) -> Option<bool> {
        let op = self.get_mut(op_id)?;
        op.enabled = !op.enabled;
        Some(op.enabled)
    }

    /// Toggle every operation grouped under `folder`.
    ///
    /// If any member is enabled the whole group is switched off, otherwise
    /// it is switched on. Returns the new state, or `None` for an empty group.
    pub fn toggle_operation_group(&mut self, folder: &str) -> Option<bool> {
        let folder = normalize(folder).to_string();
        let members: Vec<usize> = self
            .operations
            .iter()
            .enumerate()
            .filter(|(_, op)| op.group_folder().as_deref() == Some(folder.as_str()))
            .map(|(idx, _)| idx)
            .collect();

        if members.is_empty() {
            return None;
        }

        let any_enabled = members.iter().any(|&idx| self.operations[idx].enabled);
        let new_state = !any_enabled;
        for idx in members {
            self.operations[idx].enabled = new_state;
        }

        tracing::debug!(folder = %folder, enabled = new_state, "Toggled operation group");
        Some(new_state)
    }

    /// Change where a move or copy goes. Returns false for unknown ids.
    pub fn update_operation_destination(&mut self, op_id: &str, destination: &str) -> bool {
        match self.get_mut(op_id) {
            Some(op) => {
                op.operation.destination = Some(destination.to_string());
                op.refresh_modified();
                true
            }
            None => false,
        }
    }

    /// Change the new name of a rename. Returns false for unknown ids.
    pub fn update_operation_new_name(&mut self, op_id: &str, new_name: &str) -> bool {
        match self.get_mut(op_id) {
            Some(op) => {
                op.operation.new_name = Some(new_name.to_string());
                op.refresh_modified();
                true
            }
            None => false,
        }
    }

    /// Destination groups in order of first appearance
    pub fn groups(&self) -> Vec<OperationGroup> {
        let mut groups: Vec<OperationGroup> = Vec::new();
        for op in &self.operations {
            let Some(folder) = op.group_folder() else {
                continue;
            };
            let idx = match groups.iter().position(|g| g.folder == folder) {
                Some(idx) => idx,
                None => {
                    groups.push(OperationGroup {
                        folder,
                        total: 0,
                        enabled: 0,
                    });
                    groups.len() - 1
                }
            };
            groups[idx].total += 1;
            if op.enabled {
                groups[idx].enabled += 1;
            }
        }
        groups
    }

    pub fn enabled_count(&self) -> usize {
        self.operations.iter().filter(|op| op.enabled).count()
    }

    /// Whether anything differs from the opened plan
    pub fn has_changes(&self) -> bool {
        self.operations.iter().any(|op| !op.enabled || op.is_modified)
    }

    /// Build the plan to execute: enabled operations only, original order
    pub fn apply(&self) -> OrganizePlan {
        let operations: Vec<OrganizeOperation> = self
            .operations
            .iter()
            .filter(|op| op.enabled)
            .map(|op| {
                let mut operation = op.operation.clone();
                operation.attach_risk_level();
                operation
            })
            .collect();

        OrganizePlan {
            plan_id: self.plan_id.clone(),
            description: self.description.clone(),
            target_folder: self.target_folder.clone(),
            operations,
            simplification_recommended: self.simplification_recommended,
        }
    }
}

/// Group key for a plan operation, exposed for renderers that group without an editor
pub fn group_key(op: &OrganizeOperation) -> Option<String> {
    op.destination_folder().map(|f| normalize(&f).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> OrganizePlan {
        OrganizePlan {
            plan_id: "plan-1".to_string(),
            description: "Sort documents".to_string(),
            target_folder: "/T".to_string(),
            operations: vec![
                OrganizeOperation::create_folder("op-1", "/T/Docs"),
                OrganizeOperation::move_op("op-2", "/T/a.pdf", "/T/Docs/a.pdf"),
                OrganizeOperation::move_op("op-3", "/T/b.pdf", "/T/Docs/b.pdf"),
                OrganizeOperation::rename("op-4", "/T/IMG_1.jpg", "beach.jpg"),
                OrganizeOperation::trash("op-5", "/T/old.txt"),
            ],
            simplification_recommended: None,
        }
    }

    #[test]
    fn test_round_trip_without_edits() {
        let original = plan();
        let editor = PlanEditor::open(&original);
        assert!(!editor.has_changes());
        assert_eq!(editor.apply(), original);
    }

    #[test]
    fn test_disabled_operations_are_dropped_in_order() {
        let mut editor = PlanEditor::open(&plan());
        assert_eq!(editor.toggle_operation("op-2"), Some(false));
        assert_eq!(editor.toggle_operation("op-5"), Some(false));
        assert_eq!(editor.toggle_operation("missing"), None);

        let applied = editor.apply();
        let ids: Vec<_> = applied.operations.iter().map(|o| o.op_id.as_str()).collect();
        assert_eq!(ids, vec!["op-1", "op-3", "op-4"]);
    }

    #[test]
    fn test_group_toggle_any_enabled_turns_group_off() {
        let mut editor = PlanEditor::open(&plan());
        // 2 of 3 operations targeting /T/Docs stay enabled
        editor.toggle_operation("op-3");

        assert_eq!(editor.toggle_operation_group("/T/Docs"), Some(false));
        for id in ["op-1", "op-2", "op-3"] {
            assert!(!editor.get(id).unwrap().enabled);
        }
        // Operations in other groups are untouched
        assert!(editor.get("op-4").unwrap().enabled);

        assert_eq!(editor.toggle_operation_group("/T/Docs/"), Some(true));
        for id in ["op-1", "op-2", "op-3"] {
            assert!(editor.get(id).unwrap().enabled);
        }

        assert_eq!(editor.toggle_operation_group("/Elsewhere"), None);
    }

    #[test]
    fn test_groups() {
        let mut editor = PlanEditor::open(&plan());
        editor.toggle_operation("op-2");
        let groups = editor.groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[0],
            OperationGroup {
                folder: "/T/Docs".to_string(),
                total: 3,
                enabled: 2
            }
        );
        assert_eq!(groups[1].folder, "/T");
        assert_eq!(groups[1].total, 2);
    }

    #[test]
    fn test_field_edits_track_modification() {
        let mut editor = PlanEditor::open(&plan());
        assert!(editor.update_operation_destination("op-2", "/T/Papers/a.pdf"));
        assert!(editor.update_operation_new_name("op-4", "sunset.jpg"));
        assert!(!editor.update_operation_new_name("nope", "x"));

        assert!(editor.get("op-2").unwrap().is_modified);
        assert_eq!(
            editor.get("op-2").unwrap().original_destination.as_deref(),
            Some("/T/Docs/a.pdf")
        );

        // Editing back to the original clears the flag
        editor.update_operation_new_name("op-4", "beach.jpg");
        assert!(!editor.get("op-4").unwrap().is_modified);

        let applied = editor.apply();
        assert_eq!(
            applied.operations[1].destination.as_deref(),
            Some("/T/Papers/a.pdf")
        );
        // The edited move now groups under its new folder
        assert!(editor.groups().iter().any(|g| g.folder == "/T/Papers"));
    }

    #[test]
    fn test_group_key_matches_editor_grouping() {
        let op = OrganizeOperation::copy("c", "/T/x.png", "/T/Images/x.png");
        assert_eq!(group_key(&op).as_deref(), Some("/T/Images"));
    }
}
