use ipf_core::{TableName, ToolError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("could not reach the platform: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("platform unavailable: {0}")]
    Unavailable(String),
    #[error("platform returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("could not decode platform response: {0}")]
    Decode(String),
    #[error("column `{column}` is not valid for table `{table}`")]
    UnknownColumn { table: TableName, column: String },
    #[error("snapshot `{0}` was not found")]
    SnapshotNotFound(String),
}

impl BackendError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

impl From<BackendError> for ToolError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::UnknownColumn { table, column } => {
                ToolError::UnknownColumn { table, column }
            }
            BackendError::SnapshotNotFound(snapshot_id) => {
                ToolError::SnapshotNotFound { snapshot_id }
            }
            other if other.is_auth_failure() => ToolError::BackendUnavailable(format!(
                "{other}; check that IPF_TOKEN is a valid API token"
            )),
            other => ToolError::BackendUnavailable(other.to_string()),
        }
    }
}
