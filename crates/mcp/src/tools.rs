//! Tool argument and result types.
//!
//! Tools fall into four categories:
//! - Session: connection status and the active snapshot
//! - Inventory: one fetch tool per platform table
//! - Reference: filter syntax and column catalogs
//! - Analysis: comparing a table across two snapshots

use ipf_core::{
    FilterOperator, SnapshotId, SnapshotRef, SnapshotSummary, TableComparison, TableName,
    TableResult,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub struct SessionTools;

pub struct InventoryTools;

pub struct ReferenceTools;

pub struct AnalysisTools;

pub trait ToolCategory {
    fn category_name() -> &'static str
    where
        Self: Sized;
    fn tool_names() -> Vec<&'static str>
    where
        Self: Sized;
}

impl ToolCategory for SessionTools {
    fn category_name() -> &'static str {
        "session"
    }
    fn tool_names() -> Vec<&'static str> {
        vec!["ipf_get_connection_status", "ipf_get_snapshots", "ipf_set_snapshot"]
    }
}

impl ToolCategory for InventoryTools {
    fn category_name() -> &'static str {
        "inventory"
    }
    fn tool_names() -> Vec<&'static str> {
        TableName::ALL.iter().map(TableName::tool_name).collect()
    }
}

impl ToolCategory for ReferenceTools {
    fn category_name() -> &'static str {
        "reference"
    }
    fn tool_names() -> Vec<&'static str> {
        vec!["ipf_get_filter_help", "ipf_describe_columns"]
    }
}

impl ToolCategory for AnalysisTools {
    fn category_name() -> &'static str {
        "analysis"
    }
    fn tool_names() -> Vec<&'static str> {
        vec!["ipf_compare_table"]
    }
}

/// `(category, tool names)` for every category, in display order.
pub fn categories() -> Vec<(&'static str, Vec<&'static str>)> {
    vec![
        (SessionTools::category_name(), SessionTools::tool_names()),
        (InventoryTools::category_name(), InventoryTools::tool_names()),
        (ReferenceTools::category_name(), ReferenceTools::tool_names()),
        (AnalysisTools::category_name(), AnalysisTools::tool_names()),
    ]
}

// ============================================================================
// Arguments
// ============================================================================

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NoArgs {}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SetSnapshotArgs {
    /// Snapshot id from ipf_get_snapshots, or one of `$last`, `$prev`, `$lastLocked`.
    pub snapshot_id: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TableArgs {
    /// Column filters, e.g. {"vendor": ["eq", "cisco"]}. See ipf_get_filter_help.
    #[serde(default)]
    pub filters: Option<Map<String, Value>>,
    /// Columns to return. Omit for every column of the table.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    /// Query this snapshot instead of the active one.
    #[serde(default)]
    pub snapshot_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DescribeColumnsArgs {
    pub table: TableName,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CompareTableArgs {
    pub table: TableName,
    /// Snapshot to compare against the baseline.
    pub snapshot_b: String,
    /// Baseline snapshot. Defaults to the active snapshot.
    #[serde(default)]
    pub snapshot_a: Option<String>,
    #[serde(default)]
    pub filters: Option<Map<String, Value>>,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    /// Columns that identify a row across snapshots, e.g. ["hostname"]. Without
    /// them whole rows are compared and edits show up as a removal plus an addition.
    #[serde(default)]
    pub key_columns: Option<Vec<String>>,
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SnapshotListing {
    pub active_snapshot: SnapshotRef,
    pub resolved_snapshot: Option<SnapshotId>,
    pub snapshots: Vec<SnapshotSummary>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotChange {
    pub previous: SnapshotRef,
    pub active_snapshot: SnapshotId,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ColumnListing {
    pub table: TableName,
    pub tool: &'static str,
    pub columns: &'static [&'static str],
}

impl ColumnListing {
    pub fn for_table(table: TableName) -> Self {
        Self { table, tool: table.tool_name(), columns: table.columns() }
    }
}

#[derive(Debug, Serialize)]
pub struct ConnectionStatus {
    pub url: String,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_version: Option<String>,
    pub active_snapshot: SnapshotRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OperatorHelp {
    pub operator: &'static str,
    pub description: &'static str,
    pub example: &'static str,
}

#[derive(Debug, Serialize)]
pub struct FilterHelp {
    pub syntax: &'static str,
    pub operators: Vec<OperatorHelp>,
    pub tips: &'static [&'static str],
}

fn describe_operator(operator: FilterOperator) -> (&'static str, &'static str) {
    match operator {
        FilterOperator::Eq => ("Exact match (case-sensitive)", r#"{"vendor": ["eq", "cisco"]}"#),
        FilterOperator::Neq => ("Not equal", r#"{"devType": ["neq", "ap"]}"#),
        FilterOperator::Like => {
            ("Contains, case-insensitive", r#"{"hostname": ["like", "core"]}"#)
        }
        FilterOperator::Notlike => {
            ("Does not contain, case-insensitive", r#"{"hostname": ["notlike", "lab"]}"#)
        }
        FilterOperator::Reg => {
            ("Regular expression (case-sensitive)", r#"{"vendor": ["reg", "(cisco|arista)"]}"#)
        }
        FilterOperator::Nreg => {
            ("Does not match regular expression", r#"{"hostname": ["nreg", "^lab-"]}"#)
        }
        FilterOperator::Ireg => {
            ("Case-insensitive regular expression", r#"{"vendor": ["ireg", "(cisco|ARISTA)"]}"#)
        }
        FilterOperator::Nireg => (
            "Does not match case-insensitive regular expression",
            r#"{"siteName": ["nireg", "^LAB"]}"#,
        ),
        FilterOperator::Empty => {
            ("Value is empty (true) or present (false)", r#"{"primaryIp": ["empty", false]}"#)
        }
        FilterOperator::In => {
            ("Equals any of the listed values", r#"{"vendor": ["in", ["cisco", "juniper"]]}"#)
        }
    }
}

pub fn filter_help() -> FilterHelp {
    FilterHelp {
        syntax: r#"{"column": ["operator", value]}; a bare value means "eq". Multiple columns must all match."#,
        operators: FilterOperator::ALL
            .into_iter()
            .map(|operator| {
                let (description, example) = describe_operator(operator);
                OperatorHelp { operator: operator.as_str(), description, example }
            })
            .collect(),
        tips: &[
            "Column names are camelCase; call ipf_describe_columns to list them per table.",
            r"For IP addresses, use escaped dots in regex: '192\.168\.'",
            "Combine filters with columns to keep results small.",
        ],
    }
}

/// Anything a tool can return.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    FilterHelp(FilterHelp),
    Connection(ConnectionStatus),
    Snapshots(SnapshotListing),
    SnapshotChanged(SnapshotChange),
    Table(TableResult),
    Columns(ColumnListing),
    Comparison(TableComparison),
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;

    #[test]
    fn categories_do_not_overlap() {
        let mut seen = HashSet::new();
        for (category, names) in categories() {
            assert!(!names.is_empty(), "{category} should not be empty");
            for name in names {
                assert!(seen.insert(name), "{name} listed in more than one category");
            }
        }
        assert_eq!(seen.len(), 13);
    }

    #[test]
    fn filter_help_covers_every_operator() {
        let help = filter_help();
        assert_eq!(help.operators.len(), FilterOperator::ALL.len());
        for entry in &help.operators {
            let example: serde_json::Value =
                serde_json::from_str(entry.example).expect("example should be valid json");
            assert!(example.is_object(), "{} example should be an object", entry.operator);
        }
    }

    #[test]
    fn table_args_reject_unknown_fields() {
        let parsed: Result<TableArgs, _> =
            serde_json::from_value(json!({ "filters": {}, "limit": 10 }));
        assert!(parsed.is_err());

        let parsed: TableArgs = serde_json::from_value(json!({})).expect("empty args");
        assert!(parsed.filters.is_none() && parsed.columns.is_none());
    }

    #[test]
    fn compare_args_require_table_and_target() {
        let parsed: Result<CompareTableArgs, _> =
            serde_json::from_value(json!({ "table": "devices" }));
        assert!(parsed.is_err());

        let parsed: Result<CompareTableArgs, _> =
            serde_json::from_value(json!({ "table": "arp", "snapshot_b": "x" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn connection_status_hides_absent_fields() {
        let status = ConnectionStatus {
            url: "https://ipf.example.com".to_string(),
            connected: true,
            platform_version: Some("7.0.12".to_string()),
            active_snapshot: SnapshotRef::Latest,
            error: None,
        };
        let value = serde_json::to_value(status).expect("serialize");
        assert_eq!(value["active_snapshot"], json!("$last"));
        assert!(value.get("error").is_none());
    }
}
