use ipf_client::IpfBackend;
use ipf_core::domain::snapshot::LATEST_ALIAS;
use ipf_core::{SnapshotId, SnapshotRef, ToolError};
use tokio::sync::RwLock;
use tracing::info;

/// Per-process session state: the snapshot queries run against by default.
#[derive(Debug, Default)]
pub struct Session {
    active: RwLock<SnapshotRef>,
}

impl Session {
    pub fn new(initial: SnapshotRef) -> Self {
        Self { active: RwLock::new(initial) }
    }

    pub async fn active_snapshot(&self) -> SnapshotRef {
        self.active.read().await.clone()
    }

    /// Points the session at `requested` once the platform confirms it exists.
    /// Returns the previous reference and the concrete id now active. On error
    /// the session is left as it was.
    pub async fn set_snapshot(
        &self,
        backend: &dyn IpfBackend,
        requested: &str,
    ) -> Result<(SnapshotRef, SnapshotId), ToolError> {
        let resolved = resolve_in_catalog(backend, requested).await?;

        let previous = {
            let mut active = self.active.write().await;
            std::mem::replace(&mut *active, SnapshotRef::Id(resolved.clone()))
        };

        info!(
            event_name = "session.snapshot_changed",
            previous = %previous,
            snapshot_id = %resolved,
            "active snapshot changed"
        );
        Ok((previous, resolved))
    }

    /// Concrete snapshot for one call: the explicit id when given, otherwise
    /// the active snapshot with `Latest` resolved against the platform.
    pub async fn resolve(
        &self,
        backend: &dyn IpfBackend,
        requested: Option<&str>,
    ) -> Result<SnapshotId, ToolError> {
        if let Some(requested) = requested {
            return resolve_in_catalog(backend, requested).await;
        }

        match self.active_snapshot().await {
            SnapshotRef::Id(id) => Ok(id),
            SnapshotRef::Latest => resolve_in_catalog(backend, LATEST_ALIAS).await,
        }
    }
}

async fn resolve_in_catalog(
    backend: &dyn IpfBackend,
    requested: &str,
) -> Result<SnapshotId, ToolError> {
    let catalog = backend.list_snapshots().await?;
    catalog
        .resolve(requested)
        .map(|snapshot| snapshot.id.clone())
        .ok_or_else(|| ToolError::SnapshotNotFound { snapshot_id: requested.trim().to_string() })
}
