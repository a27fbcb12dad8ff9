//! Organize plan model
//!
//! Typed representation of the plan returned by the planning service. Plans
//! arrive untyped and go through [`validator::validate_plan`] before anything
//! else in the crate sees them.

pub mod validator;

pub use validator::*;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Kind of filesystem operation in a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    #[serde(alias = "createFolder")]
    CreateFolder,
    Move,
    Rename,
    #[serde(alias = "quarantine")]
    Trash,
    Copy,
}

impl OperationType {
    /// Parse the type tag used by the planning service
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "create_folder" | "createFolder" => Some(Self::CreateFolder),
            "move" => Some(Self::Move),
            "rename" => Some(Self::Rename),
            "trash" | "quarantine" => Some(Self::Trash),
            "copy" => Some(Self::Copy),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateFolder => "create_folder",
            Self::Move => "move",
            Self::Rename => "rename",
            Self::Trash => "trash",
            Self::Copy => "copy",
        }
    }

    /// Risk derived from the type alone
    pub fn risk_level(&self) -> RiskLevel {
        match self {
            Self::CreateFolder | Self::Copy => RiskLevel::Low,
            Self::Move | Self::Rename => RiskLevel::Medium,
            Self::Trash => RiskLevel::High,
        }
    }
}

/// Coarse destructiveness classification of an operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

/// A single operation in the organize plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizeOperation {
    pub op_id: String,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    /// Always derived from `op_type`, never taken from input
    #[serde(default)]
    pub risk_level: RiskLevel,
}

impl OrganizeOperation {
    fn base(op_id: impl Into<String>, op_type: OperationType) -> Self {
        Self {
            op_id: op_id.into(),
            op_type,
            source: None,
            destination: None,
            path: None,
            new_name: None,
            risk_level: op_type.risk_level(),
        }
    }

    pub fn create_folder(op_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::base(op_id, OperationType::CreateFolder)
        }
    }

    pub fn move_op(
        op_id: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            source: Some(source.into()),
            destination: Some(destination.into()),
            ..Self::base(op_id, OperationType::Move)
        }
    }

    pub fn rename(
        op_id: impl Into<String>,
        path: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Self {
            path: Some(path.into()),
            new_name: Some(new_name.into()),
            ..Self::base(op_id, OperationType::Rename)
        }
    }

    pub fn trash(op_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::base(op_id, OperationType::Trash)
        }
    }

    pub fn copy(
        op_id: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            source: Some(source.into()),
            destination: Some(destination.into()),
            ..Self::base(op_id, OperationType::Copy)
        }
    }

    /// Re-derive the risk level from the operation type
    pub fn attach_risk_level(&mut self) {
        self.risk_level = self.op_type.risk_level();
    }

    /// Path produced by a rename: the parent of `path` joined with `new_name`
    pub fn rename_target(&self) -> Option<String> {
        let path = self.path.as_deref()?;
        let new_name = self.new_name.as_deref()?;
        Some(join_path(&parent_path(path), new_name))
    }

    /// Folder that receives the result of this operation, used for grouping in the edit view
    pub fn destination_folder(&self) -> Option<String> {
        match self.op_type {
            OperationType::CreateFolder => self.path.clone(),
            OperationType::Move | OperationType::Copy => {
                self.destination.as_deref().map(parent_path)
            }
            OperationType::Rename | OperationType::Trash => self.path.as_deref().map(parent_path),
        }
    }

    /// Get a human-readable description of this operation
    pub fn description(&self) -> String {
        let or_unknown = |value: &Option<String>| value.clone().unwrap_or_else(|| "?".to_string());
        match self.op_type {
            OperationType::CreateFolder => format!("Create folder: {}", or_unknown(&self.path)),
            OperationType::Move => format!(
                "Move {} -> {}",
                or_unknown(&self.source),
                or_unknown(&self.destination)
            ),
            OperationType::Rename => format!(
                "Rename {} to {}",
                or_unknown(&self.path),
                or_unknown(&self.new_name)
            ),
            OperationType::Trash => format!("Move to trash: {}", or_unknown(&self.path)),
            OperationType::Copy => format!(
                "Copy {} -> {}",
                or_unknown(&self.source),
                or_unknown(&self.destination)
            ),
        }
    }
}

/// The full organize plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizePlan {
    pub plan_id: String,
    pub description: String,
    pub target_folder: String,
    pub operations: Vec<OrganizeOperation>,
    /// Whether folder structure simplification is recommended (set when 0 operations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simplification_recommended: Option<bool>,
}

/// Number of operations per risk level, shown in the plan preview
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRiskSummary {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl OrganizePlan {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn attach_risk_levels(&mut self) {
        for op in &mut self.operations {
            op.attach_risk_level();
        }
    }

    pub fn risk_summary(&self) -> PlanRiskSummary {
        let mut summary = PlanRiskSummary::default();
        for op in &self.operations {
            match op.op_type.risk_level() {
                RiskLevel::Low => summary.low += 1,
                RiskLevel::Medium => summary.medium += 1,
                RiskLevel::High => summary.high += 1,
            }
        }
        summary
    }

    /// Highest risk level among the operations, `None` for an empty plan
    pub fn max_risk(&self) -> Option<RiskLevel> {
        self.operations.iter().map(|op| op.op_type.risk_level()).max()
    }

    /// Compute a hash of the plan.
    /// Stored on the job so the executed plan can be matched with the previewed one.
    pub fn compute_hash(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();

        self.plan_id.hash(&mut hasher);

        // Hash all operations in order
        for op in &self.operations {
            op.op_id.hash(&mut hasher);
            op.op_type.hash(&mut hasher);
            op.source.hash(&mut hasher);
            op.destination.hash(&mut hasher);
            op.path.hash(&mut hasher);
            op.new_name.hash(&mut hasher);
        }

        self.target_folder.hash(&mut hasher);

        format!("{:016x}", hasher.finish())
    }
}

/// Parent directory of a path string ("" when there is none)
pub fn parent_path(path: &str) -> String {
    Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Final component of a path string
pub fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

pub fn join_path(parent: &str, name: &str) -> String {
    Path::new(parent).join(name).to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_derivation() {
        assert_eq!(OperationType::CreateFolder.risk_level(), RiskLevel::Low);
        assert_eq!(OperationType::Copy.risk_level(), RiskLevel::Low);
        assert_eq!(OperationType::Move.risk_level(), RiskLevel::Medium);
        assert_eq!(OperationType::Rename.risk_level(), RiskLevel::Medium);
        assert_eq!(OperationType::Trash.risk_level(), RiskLevel::High);
    }

    #[test]
    fn test_rename_target_uses_parent() {
        let op = OrganizeOperation::rename("op-1", "/T/IMG_001.jpg", "beach.jpg");
        assert_eq!(op.rename_target().as_deref(), Some("/T/beach.jpg"));
    }

    #[test]
    fn test_destination_folder() {
        assert_eq!(
            OrganizeOperation::create_folder("a", "/T/Docs").destination_folder(),
            Some("/T/Docs".to_string())
        );
        assert_eq!(
            OrganizeOperation::move_op("b", "/T/a.pdf", "/T/Docs/a.pdf").destination_folder(),
            Some("/T/Docs".to_string())
        );
        assert_eq!(
            OrganizeOperation::rename("c", "/T/Docs/x.txt", "y.txt").destination_folder(),
            Some("/T/Docs".to_string())
        );
    }

    #[test]
    fn test_risk_summary() {
        let plan = OrganizePlan {
            plan_id: "plan-1".to_string(),
            description: "test".to_string(),
            target_folder: "/T".to_string(),
            operations: vec![
                OrganizeOperation::create_folder("a", "/T/Docs"),
                OrganizeOperation::move_op("b", "/T/a.pdf", "/T/Docs/a.pdf"),
                OrganizeOperation::trash("c", "/T/old.txt"),
            ],
            simplification_recommended: None,
        };
        let summary = plan.risk_summary();
        assert_eq!((summary.low, summary.medium, summary.high), (1, 1, 1));
        assert_eq!(plan.max_risk(), Some(RiskLevel::High));
    }

    #[test]
    fn test_hash_changes_with_operations() {
        let mut plan = OrganizePlan {
            plan_id: "plan-1".to_string(),
            description: "test".to_string(),
            target_folder: "/T".to_string(),
            operations: vec![OrganizeOperation::create_folder("a", "/T/Docs")],
            simplification_recommended: None,
        };
        let before = plan.compute_hash();
        assert_eq!(before, plan.compute_hash());

        plan.operations.push(OrganizeOperation::trash("b", "/T/old.txt"));
        assert_ne!(before, plan.compute_hash());
    }

    #[test]
    fn test_serializes_type_tag() {
        let op = OrganizeOperation::create_folder("a", "/T/Docs");
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "create_folder");
        assert_eq!(json["opId"], "a");
        assert_eq!(json["riskLevel"], "low");
        assert!(json.get("source").is_none());
    }
}
