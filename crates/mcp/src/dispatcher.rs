//! Routes a named tool call to its handler.

use std::sync::Arc;

use ipf_client::IpfBackend;
use ipf_core::{
    compare_rows, SnapshotId, SnapshotRef, TableComparison, TableFilter, TableName, TableQuery,
    TableResult, ToolError,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::registry::{ToolKind, ToolRegistry};
use crate::session::Session;
use crate::tools::{
    filter_help, ColumnListing, CompareTableArgs, ConnectionStatus, DescribeColumnsArgs, NoArgs,
    SetSnapshotArgs, SnapshotChange, SnapshotListing, TableArgs, ToolOutput,
};

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    session: Arc<Session>,
    backend: Arc<dyn IpfBackend>,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry, session: Session, backend: Arc<dyn IpfBackend>) -> Self {
        Self { registry: Arc::new(registry), session: Arc::new(session), backend }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<ToolOutput, ToolError> {
        let kind = self.registry.lookup(name)?;
        let arguments = Value::Object(arguments.unwrap_or_default());
        debug!(event_name = "tool.call.dispatched", tool = name, "dispatching tool call");

        match kind {
            ToolKind::FilterHelp => {
                parse_args::<NoArgs>(name, arguments)?;
                Ok(ToolOutput::FilterHelp(filter_help()))
            }
            ToolKind::ConnectionStatus => {
                parse_args::<NoArgs>(name, arguments)?;
                Ok(ToolOutput::Connection(self.connection_status().await))
            }
            ToolKind::GetSnapshots => {
                parse_args::<NoArgs>(name, arguments)?;
                self.snapshots().await.map(ToolOutput::Snapshots)
            }
            ToolKind::SetSnapshot => {
                let args: SetSnapshotArgs = parse_args(name, arguments)?;
                self.set_snapshot(name, args).await.map(ToolOutput::SnapshotChanged)
            }
            ToolKind::GetTable(table) => {
                let args: TableArgs = parse_args(name, arguments)?;
                self.get_table(name, table, args).await.map(ToolOutput::Table)
            }
            ToolKind::DescribeColumns => {
                let args: DescribeColumnsArgs = parse_args(name, arguments)?;
                Ok(ToolOutput::Columns(ColumnListing::for_table(args.table)))
            }
            ToolKind::CompareTable => {
                let args: CompareTableArgs = parse_args(name, arguments)?;
                self.compare_table(name, args).await.map(ToolOutput::Comparison)
            }
        }
    }

    async fn connection_status(&self) -> ConnectionStatus {
        let active_snapshot = self.session.active_snapshot().await;
        let url = self.backend.base_url().to_string();
        match self.backend.platform_version().await {
            Ok(version) => ConnectionStatus {
                url,
                connected: true,
                platform_version: Some(version),
                active_snapshot,
                error: None,
            },
            Err(error) => ConnectionStatus {
                url,
                connected: false,
                platform_version: None,
                active_snapshot,
                error: Some(ToolError::from(error).to_string()),
            },
        }
    }

    async fn snapshots(&self) -> Result<SnapshotListing, ToolError> {
        let catalog = self.backend.list_snapshots().await?;
        let active_snapshot = self.session.active_snapshot().await;
        let resolved_snapshot = match &active_snapshot {
            SnapshotRef::Id(id) => Some(id.clone()),
            SnapshotRef::Latest => catalog.latest_loaded().map(|snapshot| snapshot.id.clone()),
        };
        Ok(SnapshotListing { active_snapshot, resolved_snapshot, snapshots: catalog.into_vec() })
    }

    async fn set_snapshot(
        &self,
        tool: &str,
        args: SetSnapshotArgs,
    ) -> Result<SnapshotChange, ToolError> {
        if args.snapshot_id.trim().is_empty() {
            return Err(invalid(tool, "snapshot_id must not be empty"));
        }
        let (previous, active_snapshot) =
            self.session.set_snapshot(self.backend.as_ref(), &args.snapshot_id).await?;
        let message = format!("Snapshot set to {active_snapshot}");
        Ok(SnapshotChange { previous, active_snapshot, message })
    }

    async fn get_table(
        &self,
        tool: &str,
        table: TableName,
        args: TableArgs,
    ) -> Result<TableResult, ToolError> {
        let filter = parse_filter(tool, args.filters.as_ref())?;
        let requested = explicit_snapshot(tool, "snapshot_id", args.snapshot_id.as_deref())?;
        let snapshot_id = self.session.resolve(self.backend.as_ref(), requested).await?;
        let query =
            TableQuery::new(table, snapshot_id).with_filter(filter).with_columns(args.columns);
        query.validate()?;

        Ok(self.backend.fetch_table(&query).await?)
    }

    async fn compare_table(
        &self,
        tool: &str,
        args: CompareTableArgs,
    ) -> Result<TableComparison, ToolError> {
        let requested_a = explicit_snapshot(tool, "snapshot_a", args.snapshot_a.as_deref())?;
        let requested_b = explicit_snapshot(tool, "snapshot_b", Some(&args.snapshot_b))?;
        let filter = parse_filter(tool, args.filters.as_ref())?;
        let key_columns = args.key_columns.unwrap_or_default();
        check_key_columns(tool, args.table, &key_columns, args.columns.as_deref())?;

        let backend = self.backend.as_ref();
        let snapshot_a = self.session.resolve(backend, requested_a).await?;
        let snapshot_b = self.session.resolve(backend, requested_b).await?;

        let query_for = |snapshot_id: SnapshotId| {
            TableQuery::new(args.table, snapshot_id)
                .with_filter(filter.clone())
                .with_columns(args.columns.clone())
        };
        let query_a = query_for(snapshot_a);
        let query_b = query_for(snapshot_b);
        query_a.validate()?;

        let rows_a = backend.fetch_table(&query_a).await?.rows;
        let rows_b = backend.fetch_table(&query_b).await?.rows;

        Ok(compare_rows(
            args.table,
            query_a.snapshot_id,
            &rows_a,
            query_b.snapshot_id,
            &rows_b,
            &key_columns,
        ))
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|error| invalid(tool, &error.to_string()))
}

fn parse_filter(tool: &str, raw: Option<&Map<String, Value>>) -> Result<TableFilter, ToolError> {
    match raw {
        Some(raw) => TableFilter::from_json(raw).map_err(|error| invalid(tool, &error.to_string())),
        None => Ok(TableFilter::default()),
    }
}

/// An explicitly passed snapshot id must not be blank.
fn explicit_snapshot<'a>(
    tool: &str,
    field: &str,
    requested: Option<&'a str>,
) -> Result<Option<&'a str>, ToolError> {
    match requested.map(str::trim) {
        Some("") => Err(invalid(tool, &format!("{field} must not be empty"))),
        other => Ok(other),
    }
}

fn check_key_columns(
    tool: &str,
    table: TableName,
    key_columns: &[String],
    selected: Option<&[String]>,
) -> Result<(), ToolError> {
    for key in key_columns {
        if !table.has_column(key) {
            return Err(ToolError::UnknownColumn { table, column: key.clone() });
        }
        if let Some(selected) = selected.filter(|selected| !selected.is_empty()) {
            if !selected.contains(key) {
                return Err(invalid(
                    tool,
                    &format!("key column `{key}` must also be listed in columns"),
                ));
            }
        }
    }
    Ok(())
}

fn invalid(tool: &str, message: &str) -> ToolError {
    ToolError::InvalidArgument { tool: tool.to_string(), message: message.to_string() }
}
