use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::filter::TableFilter;
use crate::domain::snapshot::SnapshotId;
use crate::domain::table::TableName;
use crate::errors::QueryError;

/// One table record, column name to value.
pub type Row = Map<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub struct TableQuery {
    pub table: TableName,
    pub filter: TableFilter,
    pub columns: Option<Vec<String>>,
    pub snapshot_id: SnapshotId,
}

impl TableQuery {
    pub fn new(table: TableName, snapshot_id: SnapshotId) -> Self {
        Self { table, filter: TableFilter::default(), columns: None, snapshot_id }
    }

    pub fn with_filter(mut self, filter: TableFilter) -> Self {
        self.filter = filter;
        self
    }

    /// An empty column list means "all columns", same as omitting it.
    pub fn with_columns(mut self, columns: Option<Vec<String>>) -> Self {
        self.columns = columns.filter(|columns| !columns.is_empty());
        self
    }

    /// Rejects requested or filtered columns the table does not have.
    pub fn validate(&self) -> Result<(), QueryError> {
        let requested = self.columns.iter().flatten().map(String::as_str);
        for column in requested.chain(self.filter.columns()) {
            if !self.table.has_column(column) {
                return Err(QueryError::UnknownColumn {
                    table: self.table,
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn effective_columns(&self) -> Vec<String> {
        match &self.columns {
            Some(columns) => columns.clone(),
            None => self.table.columns().iter().map(|column| column.to_string()).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableResult {
    pub table: TableName,
    pub snapshot_id: SnapshotId,
    pub count: usize,
    pub rows: Vec<Row>,
}

impl TableResult {
    pub fn new(table: TableName, snapshot_id: SnapshotId, rows: Vec<Row>) -> Self {
        Self { table, snapshot_id, count: rows.len(), rows }
    }
}

/// Keeps only the requested columns; absent ones come back as null.
pub fn project_row(row: &Row, columns: &[String]) -> Row {
    columns
        .iter()
        .map(|column| (column.clone(), row.get(column).cloned().unwrap_or(Value::Null)))
        .collect()
}
