use async_trait::async_trait;
use ipf_core::{QueryError, SnapshotCatalog, TableQuery, TableResult};

use crate::error::BackendError;

/// Read access to one platform instance.
///
/// Implementations expect `query.snapshot_id` to be a concrete id; resolving
/// `$last` and friends is the caller's job.
#[async_trait]
pub trait IpfBackend: Send + Sync {
    /// URL shown to the agent in status output. Never carries credentials.
    fn base_url(&self) -> &str;

    async fn list_snapshots(&self) -> Result<SnapshotCatalog, BackendError>;

    async fn fetch_table(&self, query: &TableQuery) -> Result<TableResult, BackendError>;

    async fn platform_version(&self) -> Result<String, BackendError>;
}

impl From<QueryError> for BackendError {
    fn from(value: QueryError) -> Self {
        match value {
            QueryError::UnknownColumn { table, column } => Self::UnknownColumn { table, column },
        }
    }
}
