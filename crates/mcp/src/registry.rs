//! The fixed tool catalog.

use std::collections::HashMap;
use std::sync::Arc;

use ipf_core::{TableName, ToolError};
use rmcp::model::Tool;
use schemars::JsonSchema;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::tools::{CompareTableArgs, DescribeColumnsArgs, NoArgs, SetSnapshotArgs, TableArgs};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolKind {
    FilterHelp,
    ConnectionStatus,
    GetSnapshots,
    SetSnapshot,
    GetTable(TableName),
    DescribeColumns,
    CompareTable,
}

impl ToolKind {
    pub fn all() -> Vec<ToolKind> {
        let mut kinds = vec![
            ToolKind::FilterHelp,
            ToolKind::ConnectionStatus,
            ToolKind::GetSnapshots,
            ToolKind::SetSnapshot,
        ];
        kinds.extend(TableName::ALL.into_iter().map(ToolKind::GetTable));
        kinds.push(ToolKind::DescribeColumns);
        kinds.push(ToolKind::CompareTable);
        kinds
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FilterHelp => "ipf_get_filter_help",
            Self::ConnectionStatus => "ipf_get_connection_status",
            Self::GetSnapshots => "ipf_get_snapshots",
            Self::SetSnapshot => "ipf_set_snapshot",
            Self::GetTable(table) => table.tool_name(),
            Self::DescribeColumns => "ipf_describe_columns",
            Self::CompareTable => "ipf_compare_table",
        }
    }

    /// Parameters the handler cannot run without.
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            Self::FilterHelp | Self::ConnectionStatus | Self::GetSnapshots | Self::GetTable(_) => {
                &[]
            }
            Self::SetSnapshot => &["snapshot_id"],
            Self::DescribeColumns => &["table"],
            Self::CompareTable => &["snapshot_b", "table"],
        }
    }

    fn description(&self) -> String {
        match self {
            Self::FilterHelp => "Get help on IP Fabric filter syntax and operators. \
                Read this before building filters for the table tools."
                .to_string(),
            Self::ConnectionStatus => "Check that the IP Fabric platform is reachable and report its \
                version and the active snapshot."
                .to_string(),
            Self::GetSnapshots => "List the snapshots known to IP Fabric, newest first, and the \
                snapshot queries currently run against."
                .to_string(),
            Self::SetSnapshot => "Set the active snapshot for all subsequent IP Fabric queries."
                .to_string(),
            Self::GetTable(table) => {
                let (filter_example, columns_example) = table.examples();
                format!(
                    "Get {} from IP Fabric. Runs against the active snapshot unless snapshot_id \
                     is given. Filter example: {filter_example}. Columns example: {columns_example}.",
                    table.label()
                )
            }
            Self::DescribeColumns => {
                "List the columns a table supports for filters and column selection.".to_string()
            }
            Self::CompareTable => "Compare one table between two snapshots and report added, \
                removed and changed rows. Pass key_columns to match rows by identity."
                .to_string(),
        }
    }

    fn input_schema(&self) -> Map<String, Value> {
        match self {
            Self::FilterHelp | Self::ConnectionStatus | Self::GetSnapshots => {
                schema_object::<NoArgs>()
            }
            Self::SetSnapshot => schema_object::<SetSnapshotArgs>(),
            Self::GetTable(_) => schema_object::<TableArgs>(),
            Self::DescribeColumns => schema_object::<DescribeColumnsArgs>(),
            Self::CompareTable => schema_object::<CompareTableArgs>(),
        }
    }
}

fn schema_object<T: JsonSchema>() -> Map<String, Value> {
    let schema = schemars::schema_for!(T);
    let mut object = match serde_json::to_value(&schema) {
        Ok(Value::Object(object)) => object,
        _ => Map::new(),
    };
    object.remove("$schema");
    object.remove("title");
    object.entry("type").or_insert_with(|| json!("object"));
    object.entry("properties").or_insert_with(|| json!({}));
    object
}

#[derive(Clone, Debug)]
pub struct ToolDescriptor {
    pub kind: ToolKind,
    pub name: &'static str,
    pub description: String,
    pub input_schema: Arc<Map<String, Value>>,
}

impl ToolDescriptor {
    fn new(kind: ToolKind) -> Self {
        Self {
            kind,
            name: kind.name(),
            description: kind.description(),
            input_schema: Arc::new(kind.input_schema()),
        }
    }

    pub fn to_mcp_tool(&self) -> Tool {
        Tool::new(self.name, self.description.clone(), self.input_schema.clone())
    }

    /// The `required` list of the input schema.
    pub fn schema_required(&self) -> Vec<String> {
        let mut required: Vec<String> = self
            .input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        required.sort();
        required
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool `{0}` is registered more than once")]
    DuplicateTool(String),
}

#[derive(Clone, Debug)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    by_name: HashMap<&'static str, ToolKind>,
}

impl ToolRegistry {
    pub fn new() -> Result<Self, RegistryError> {
        Self::from_kinds(ToolKind::all())
    }

    fn from_kinds(kinds: Vec<ToolKind>) -> Result<Self, RegistryError> {
        let mut tools = Vec::with_capacity(kinds.len());
        let mut by_name = HashMap::with_capacity(kinds.len());
        for kind in kinds {
            if by_name.insert(kind.name(), kind).is_some() {
                return Err(RegistryError::DuplicateTool(kind.name().to_string()));
            }
            tools.push(ToolDescriptor::new(kind));
        }
        Ok(Self { tools, by_name })
    }

    pub fn list_tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn lookup(&self, name: &str) -> Result<ToolKind, ToolError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ToolError::UnknownTool { name: name.to_string() })
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
