//! Plan validation
//!
//! Turns the untyped payload returned by the planning service into an
//! [`OrganizePlan`]. A malformed top-level shape is fatal; a malformed single
//! operation is dropped and counted.

use super::{OperationType, OrganizeOperation, OrganizePlan};
use crate::error::OrganizeError;
use serde_json::Value;
use std::collections::HashSet;

/// Validate a raw plan payload
pub fn validate_plan(raw: &Value) -> Result<OrganizePlan, OrganizeError> {
    let object = raw
        .as_object()
        .ok_or_else(|| OrganizeError::plan_validation("plan is not an object", raw))?;

    let plan_id = required_string(object, "planId", raw)?;
    let description = required_string(object, "description", raw)?;
    let target_folder = required_string(object, "targetFolder", raw)?;

    let raw_operations = object
        .get("operations")
        .and_then(Value::as_array)
        .ok_or_else(|| OrganizeError::plan_validation("'operations' is not an array", raw))?;

    let simplification_recommended = object
        .get("simplificationRecommended")
        .and_then(Value::as_bool);

    let mut operations = Vec::with_capacity(raw_operations.len());
    let mut dropped = 0usize;
    let mut seen_ids = HashSet::new();

    for (idx, op) in raw_operations.iter().enumerate() {
        // The overlay and the job record are keyed by op id, so ids must be unique
        let parsed = parse_operation(idx, op).and_then(|operation| {
            if seen_ids.insert(operation.op_id.clone()) {
                Ok(operation)
            } else {
                Err(OrganizeError::OperationInvalid {
                    index: idx,
                    reason: format!("duplicate opId '{}'", operation.op_id),
                })
            }
        });
        match parsed {
            Ok(operation) => operations.push(operation),
            Err(e) => {
                dropped += 1;
                tracing::debug!(error = %e, "Dropping malformed operation");
            }
        }
    }

    if dropped > 0 {
        tracing::warn!(
            plan_id = %plan_id,
            dropped = dropped,
            kept = operations.len(),
            "Dropped {} malformed operation(s) from plan",
            dropped
        );
    }

    Ok(OrganizePlan {
        plan_id,
        description,
        target_folder,
        operations,
        simplification_recommended,
    })
}

fn required_string(
    object: &serde_json::Map<String, Value>,
    key: &str,
    raw: &Value,
) -> Result<String, OrganizeError> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| OrganizeError::plan_validation(format!("'{}' must be a string", key), raw))
}

fn non_empty<'a>(op: &'a Value, key: &str) -> Option<&'a str> {
    op.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Parse and validate a single operation
pub fn parse_operation(idx: usize, op: &Value) -> Result<OrganizeOperation, OrganizeError> {
    let invalid = |reason: String| OrganizeError::OperationInvalid { index: idx, reason };

    let op_id = non_empty(op, "opId")
        .ok_or_else(|| invalid("missing required field 'opId'".to_string()))?
        .to_string();

    let type_tag = non_empty(op, "type")
        .ok_or_else(|| invalid(format!("operation '{}' missing required field 'type'", op_id)))?;

    let op_type = OperationType::parse(type_tag)
        .ok_or_else(|| invalid(format!("operation '{}' has unknown type '{}'", op_id, type_tag)))?;

    // Validate operation-specific required fields
    let required: &[&str] = match op_type {
        OperationType::Move | OperationType::Copy => &["source", "destination"],
        OperationType::CreateFolder | OperationType::Trash => &["path"],
        OperationType::Rename => &["path", "newName"],
    };
    for field in required {
        if non_empty(op, field).is_none() {
            return Err(invalid(format!(
                "operation '{}' ({}) missing required field '{}'",
                op_id,
                op_type.as_str(),
                field
            )));
        }
    }

    Ok(OrganizeOperation {
        op_id,
        op_type,
        source: non_empty(op, "source").map(String::from),
        destination: non_empty(op, "destination").map(String::from),
        path: non_empty(op, "path").map(String::from),
        new_name: non_empty(op, "newName").map(String::from),
        risk_level: op_type.risk_level(),
    })
}
