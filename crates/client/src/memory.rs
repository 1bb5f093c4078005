use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use ipf_core::domain::query::project_row;
use ipf_core::{
    Row, SnapshotCatalog, SnapshotId, SnapshotSummary, TableName, TableQuery, TableResult,
};
use tokio::sync::RwLock;

use crate::backend::IpfBackend;
use crate::error::BackendError;

/// Backend over fixed in-process data. Applies filters and projections the
/// way the platform does.
pub struct InMemoryBackend {
    base_url: String,
    version: String,
    snapshots: Vec<SnapshotSummary>,
    tables: HashMap<(SnapshotId, TableName), Vec<Row>>,
    unavailable: AtomicBool,
    requests: RwLock<Vec<TableQuery>>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self {
            base_url: "memory://ipfabric".to_string(),
            version: "7.0.0".to_string(),
            snapshots: Vec::new(),
            tables: HashMap::new(),
            unavailable: AtomicBool::new(false),
            requests: RwLock::new(Vec::new()),
        }
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, snapshot: SnapshotSummary) -> Self {
        self.snapshots.retain(|existing| existing.id != snapshot.id);
        self.snapshots.push(snapshot);
        self
    }

    pub fn with_rows(mut self, snapshot_id: &str, table: TableName, rows: Vec<Row>) -> Self {
        self.tables.insert((SnapshotId::from(snapshot_id), table), rows);
        self
    }

    /// Makes every later call fail as if the platform were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Table queries received so far, oldest first.
    pub async fn requests(&self) -> Vec<TableQuery> {
        self.requests.read().await.clone()
    }

    fn ensure_available(&self) -> Result<(), BackendError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl IpfBackend for InMemoryBackend {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn list_snapshots(&self) -> Result<SnapshotCatalog, BackendError> {
        self.ensure_available()?;
        Ok(SnapshotCatalog::new(self.snapshots.clone()))
    }

    async fn fetch_table(&self, query: &TableQuery) -> Result<TableResult, BackendError> {
        self.ensure_available()?;
        query.validate()?;

        if !self.snapshots.iter().any(|snapshot| snapshot.id == query.snapshot_id) {
            return Err(BackendError::SnapshotNotFound(query.snapshot_id.to_string()));
        }
        self.requests.write().await.push(query.clone());

        let columns = query.effective_columns();
        let rows = self
            .tables
            .get(&(query.snapshot_id.clone(), query.table))
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filter.matches(row))
                    .map(|row| project_row(row, &columns))
                    .collect()
            })
            .unwrap_or_default();

        Ok(TableResult::new(query.table, query.snapshot_id.clone(), rows))
    }

    async fn platform_version(&self) -> Result<String, BackendError> {
        self.ensure_available()?;
        Ok(self.version.clone())
    }
}
