use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Platform alias for the newest loaded snapshot.
pub const LATEST_ALIAS: &str = "$last";
/// Platform alias for the loaded snapshot before the newest one.
pub const PREVIOUS_ALIAS: &str = "$prev";
/// Platform alias for the newest locked snapshot.
pub const LAST_LOCKED_ALIAS: &str = "$lastLocked";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(pub String);

impl SnapshotId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SnapshotId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// What the session points at: the newest loaded snapshot, or a pinned id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SnapshotRef {
    #[default]
    Latest,
    Id(SnapshotId),
}

impl fmt::Display for SnapshotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str(LATEST_ALIAS),
            Self::Id(id) => f.write_str(id.as_str()),
        }
    }
}

impl Serialize for SnapshotRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl SnapshotRef {
    /// Builds a reference from a configured value; the latest alias maps to `Latest`.
    pub fn from_configured(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") | Some(LATEST_ALIAS) => Self::Latest,
            Some(id) => Self::Id(SnapshotId(id.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotState {
    Loaded,
    Unloaded,
    Loading,
    Unloading,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub id: SnapshotId,
    pub name: Option<String>,
    pub note: Option<String>,
    pub state: SnapshotState,
    pub status: Option<String>,
    pub locked: bool,
    pub device_count: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SnapshotSummary {
    pub fn new(id: impl Into<String>, state: SnapshotState) -> Self {
        Self {
            id: SnapshotId(id.into()),
            name: None,
            note: None,
            state,
            status: None,
            locked: false,
            device_count: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state == SnapshotState::Loaded
    }
}

/// Snapshots known to the platform, newest first.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SnapshotCatalog {
    snapshots: Vec<SnapshotSummary>,
}

impl SnapshotCatalog {
    pub fn new(mut snapshots: Vec<SnapshotSummary>) -> Self {
        // Unfinished captures sort after finished ones; ties keep platform order.
        snapshots.sort_by(|left, right| {
            let left_ts = left.finished_at.or(left.started_at);
            let right_ts = right.finished_at.or(right.started_at);
            match (left_ts, right_ts) {
                (Some(l), Some(r)) => r.cmp(&l),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
        Self { snapshots }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SnapshotSummary> {
        self.snapshots.iter()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn into_vec(self) -> Vec<SnapshotSummary> {
        self.snapshots
    }

    pub fn latest_loaded(&self) -> Option<&SnapshotSummary> {
        self.snapshots.iter().find(|snapshot| snapshot.is_loaded())
    }

    pub fn find(&self, id: &str) -> Option<&SnapshotSummary> {
        self.snapshots.iter().find(|snapshot| snapshot.id.as_str() == id)
    }

    /// Resolves an exact id or one of the platform aliases to a known snapshot.
    pub fn resolve(&self, requested: &str) -> Option<&SnapshotSummary> {
        let requested = requested.trim();
        match requested {
            LATEST_ALIAS => self.latest_loaded(),
            PREVIOUS_ALIAS => self.snapshots.iter().filter(|s| s.is_loaded()).nth(1),
            LAST_LOCKED_ALIAS => self.snapshots.iter().find(|s| s.is_loaded() && s.locked),
            id => self.find(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{SnapshotCatalog, SnapshotRef, SnapshotState, SnapshotSummary};

    fn snapshot(id: &str, state: SnapshotState, day: u32, locked: bool) -> SnapshotSummary {
        let mut summary = SnapshotSummary::new(id, state);
        summary.finished_at = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).single();
        summary.locked = locked;
        summary
    }

    fn catalog() -> SnapshotCatalog {
        SnapshotCatalog::new(vec![
            snapshot("snap-old", SnapshotState::Loaded, 1, true),
            snapshot("snap-unloaded", SnapshotState::Unloaded, 9, false),
            snapshot("snap-new", SnapshotState::Loaded, 5, false),
        ])
    }

    #[test]
    fn catalog_orders_newest_first() {
        let ids: Vec<_> = catalog().iter().map(|s| s.id.0.clone()).collect();
        assert_eq!(ids, vec!["snap-unloaded", "snap-new", "snap-old"]);
    }

    #[test]
    fn latest_alias_skips_unloaded_snapshots() {
        let catalog = catalog();
        assert_eq!(catalog.resolve("$last").map(|s| s.id.as_str()), Some("snap-new"));
        assert_eq!(catalog.resolve("$prev").map(|s| s.id.as_str()), Some("snap-old"));
        assert_eq!(catalog.resolve("$lastLocked").map(|s| s.id.as_str()), Some("snap-old"));
    }

    #[test]
    fn exact_ids_resolve_regardless_of_state() {
        let catalog = catalog();
        assert!(catalog.resolve("snap-unloaded").is_some());
        assert!(catalog.resolve("snap-missing").is_none());
    }

    #[test]
    fn configured_reference_defaults_to_latest() {
        assert_eq!(SnapshotRef::from_configured(None), SnapshotRef::Latest);
        assert_eq!(SnapshotRef::from_configured(Some("  ")), SnapshotRef::Latest);
        assert_eq!(SnapshotRef::from_configured(Some("$last")), SnapshotRef::Latest);
        assert_eq!(SnapshotRef::from_configured(Some("abc")).to_string(), "abc");
        assert_eq!(SnapshotRef::Latest.to_string(), "$last");
    }
}
