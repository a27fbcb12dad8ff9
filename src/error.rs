use crate::jobs::JobError;
use serde::Serialize;

/// Maximum number of characters of a rejected payload kept in a validation error
pub const PAYLOAD_DUMP_LIMIT: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum OrganizeError {
    /// The plan payload did not have the expected top-level shape.
    /// Nothing has been applied to disk when this is raised.
    #[error("Invalid plan: {message} (received: {payload})")]
    PlanValidation { message: String, payload: String },

    /// A single operation was malformed. The validator drops these and only counts them.
    #[error("Invalid operation at index {index}: {reason}")]
    OperationInvalid { index: usize, reason: String },

    /// A filesystem call failed. Operations before `index` stay applied.
    #[error("{description} failed: {message}")]
    OperationExecution {
        op_id: String,
        index: usize,
        description: String,
        message: String,
    },

    #[error("Job persistence error: {0}")]
    Persistence(String),

    #[error("Planning failed: {0}")]
    Planning(String),

    #[error("{0}")]
    InvalidState(String),
}

impl OrganizeError {
    /// Build a validation error with a truncated dump of what was received
    pub fn plan_validation(message: impl Into<String>, payload: &serde_json::Value) -> Self {
        Self::PlanValidation {
            message: message.into(),
            payload: truncate_payload(&payload.to_string()),
        }
    }
}

fn truncate_payload(dump: &str) -> String {
    if dump.chars().count() <= PAYLOAD_DUMP_LIMIT {
        return dump.to_string();
    }
    let truncated: String = dump.chars().take(PAYLOAD_DUMP_LIMIT).collect();
    format!("{}...", truncated)
}

impl From<JobError> for OrganizeError {
    fn from(err: JobError) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl Serialize for OrganizeError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_dump_is_truncated() {
        let long = serde_json::Value::String("x".repeat(2000));
        let err = OrganizeError::plan_validation("operations is not an array", &long);
        match err {
            OrganizeError::PlanValidation { payload, .. } => {
                assert_eq!(payload.chars().count(), PAYLOAD_DUMP_LIMIT + 3);
                assert!(payload.ends_with("..."));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_execution_error_serializes_as_message() {
        let err = OrganizeError::OperationExecution {
            op_id: "op-2".to_string(),
            index: 2,
            description: "Move /T/a.pdf -> /T/Docs/a.pdf".to_string(),
            message: "Permission denied".to_string(),
        };
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Move /T/a.pdf -> /T/Docs/a.pdf failed: Permission denied\"");
    }
}
