//! Table comparison between two snapshots.
//!
//! Without key columns rows are compared whole, as a multiset: a row counts as
//! unchanged only if an identical row exists on the other side. With key
//! columns rows are paired by key and differing pairs are reported as changes.

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::Serialize;
use serde_json::Value;

use crate::domain::query::{project_row, Row};
use crate::domain::snapshot::SnapshotId;
use crate::domain::table::TableName;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    FullRow,
    Keyed,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RowChange {
    pub key: Row,
    pub changed_columns: Vec<String>,
    pub before: Row,
    pub after: Row,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableComparison {
    pub table: TableName,
    pub snapshot_a: SnapshotId,
    pub snapshot_b: SnapshotId,
    pub mode: ComparisonMode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key_columns: Vec<String>,
    pub added: Vec<Row>,
    pub removed: Vec<Row>,
    pub changed: Vec<RowChange>,
    pub unchanged_count: usize,
}

impl TableComparison {
    pub fn is_identical(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Compares `rows_a` (the baseline) with `rows_b`. Added rows exist only in
/// `b`, removed rows only in `a`.
pub fn compare_rows(
    table: TableName,
    snapshot_a: SnapshotId,
    rows_a: &[Row],
    snapshot_b: SnapshotId,
    rows_b: &[Row],
    key_columns: &[String],
) -> TableComparison {
    let mode = if key_columns.is_empty() { ComparisonMode::FullRow } else { ComparisonMode::Keyed };
    let key_of = |row: &Row| -> String {
        match mode {
            ComparisonMode::FullRow => canonical(row),
            ComparisonMode::Keyed => canonical(&project_row(row, key_columns)),
        }
    };

    let mut pending: HashMap<String, VecDeque<usize>> = HashMap::new();
    for (index, row) in rows_a.iter().enumerate() {
        pending.entry(key_of(row)).or_default().push_back(index);
    }

    let mut matched = vec![false; rows_a.len()];
    let mut added = Vec::new();
    let mut changed = Vec::new();
    let mut unchanged_count = 0;

    for row in rows_b {
        let Some(index) = pending.get_mut(&key_of(row)).and_then(VecDeque::pop_front) else {
            added.push(row.clone());
            continue;
        };
        matched[index] = true;

        let before = &rows_a[index];
        let changed_columns = differing_columns(before, row);
        if changed_columns.is_empty() {
            unchanged_count += 1;
        } else {
            changed.push(RowChange {
                key: project_row(row, key_columns),
                changed_columns,
                before: before.clone(),
                after: row.clone(),
            });
        }
    }

    let removed = rows_a
        .iter()
        .zip(matched)
        .filter(|(_, matched)| !matched)
        .map(|(row, _)| row.clone())
        .collect();

    TableComparison {
        table,
        snapshot_a,
        snapshot_b,
        mode,
        key_columns: key_columns.to_vec(),
        added,
        removed,
        changed,
        unchanged_count,
    }
}

fn canonical(row: &Row) -> String {
    Value::Object(row.clone()).to_string()
}

fn differing_columns(before: &Row, after: &Row) -> Vec<String> {
    let columns: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    columns
        .into_iter()
        .filter(|column| before.get(*column) != after.get(*column))
        .cloned()
        .collect()
}
