use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::table::TableName;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("column `{column}` is not valid for table `{table}`")]
    UnknownColumn { table: TableName, column: String },
}

/// Failures reported back to the calling agent.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("unknown tool `{name}`")]
    UnknownTool { name: String },
    #[error("invalid arguments for `{tool}`: {message}")]
    InvalidArgument { tool: String, message: String },
    #[error("snapshot `{snapshot_id}` was not found")]
    SnapshotNotFound { snapshot_id: String },
    #[error("column `{column}` is not valid for table `{table}`")]
    UnknownColumn { table: TableName, column: String },
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl ToolError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool { .. } => "unknown_tool",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::SnapshotNotFound { .. } => "snapshot_not_found",
            Self::UnknownColumn { .. } => "unknown_column",
            Self::BackendUnavailable(_) => "backend_unavailable",
        }
    }

    /// JSON-RPC error code used when the failure is raised as a protocol error.
    pub fn error_code(&self) -> i32 {
        match self {
            Self::UnknownTool { .. } | Self::InvalidArgument { .. } => -32602,
            Self::SnapshotNotFound { .. } | Self::UnknownColumn { .. } => -32002,
            Self::BackendUnavailable(_) => -32603,
        }
    }

    /// Caller mistakes are protocol errors; everything else is a failed tool result.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::UnknownTool { .. } | Self::InvalidArgument { .. })
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::UnknownTool { .. } => Some("List the available tools and retry with a registered name."),
            Self::InvalidArgument { .. } => {
                Some("Check the tool's input schema; call ipf_get_filter_help for filter syntax.")
            }
            Self::SnapshotNotFound { .. } => {
                Some("Call ipf_get_snapshots to list the snapshot ids the platform knows.")
            }
            Self::UnknownColumn { .. } => {
                Some("Call ipf_describe_columns to list the columns valid for this table.")
            }
            Self::BackendUnavailable(_) => None,
        }
    }

    pub fn to_payload(&self, correlation_id: &str) -> Value {
        let mut payload = json!({
            "error": self.kind(),
            "message": self.to_string(),
            "correlation_id": correlation_id,
        });
        if let Some(hint) = self.hint() {
            payload["hint"] = json!(hint);
        }
        payload
    }
}

impl From<QueryError> for ToolError {
    fn from(value: QueryError) -> Self {
        match value {
            QueryError::UnknownColumn { table, column } => Self::UnknownColumn { table, column },
        }
    }
}
