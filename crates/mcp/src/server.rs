//! MCP Server Implementation
//!
//! Exposes the tool registry over the Model Context Protocol. Caller mistakes
//! become JSON-RPC `invalid_params` errors; every other failure is a tool
//! result flagged `is_error` with a JSON body.

use std::sync::Arc;

use anyhow::Context;
use ipf_client::{HttpBackend, IpfBackend};
use ipf_core::config::AppConfig;
use ipf_core::SnapshotRef;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler, ServiceExt};
use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::dispatcher::Dispatcher;
use crate::registry::{ToolDescriptor, ToolRegistry};
use crate::session::Session;
use crate::tools::categories;

/// Outcome of one tool call before it is wrapped for the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResponse {
    pub is_error: bool,
    pub body: Value,
}

impl ToolResponse {
    pub fn into_call_result(self) -> CallToolResult {
        let text =
            serde_json::to_string_pretty(&self.body).unwrap_or_else(|_| self.body.to_string());
        if self.is_error {
            CallToolResult::error(vec![Content::text(text)])
        } else {
            CallToolResult::success(vec![Content::text(text)])
        }
    }
}

#[derive(Clone)]
pub struct IpfMcpServer {
    dispatcher: Dispatcher,
}

impl IpfMcpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Server over an arbitrary backend, starting at `initial` snapshot.
    pub fn with_backend(
        backend: Arc<dyn IpfBackend>,
        initial: SnapshotRef,
    ) -> anyhow::Result<Self> {
        let registry = ToolRegistry::new()?;
        Ok(Self::new(Dispatcher::new(registry, Session::new(initial), backend)))
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let backend = HttpBackend::from_config(&config.ipfabric)
            .context("failed to build IP Fabric HTTP client")?;
        let initial = SnapshotRef::from_configured(config.ipfabric.snapshot_id.as_deref());
        Self::with_backend(Arc::new(backend), initial)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.dispatcher.registry().list_tools().iter().map(ToolDescriptor::to_mcp_tool).collect()
    }

    pub async fn handle_call(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<ToolResponse, ErrorData> {
        let correlation_id = Uuid::new_v4().to_string();
        info!(
            event_name = "tool.call.started",
            tool = name,
            correlation_id = %correlation_id,
            "tool call started"
        );

        match self.dispatcher.call_tool(name, arguments).await {
            Ok(output) => {
                let body = serde_json::to_value(&output).map_err(|error| {
                    ErrorData::internal_error(format!("failed to encode tool result: {error}"), None)
                })?;
                info!(
                    event_name = "tool.call.completed",
                    tool = name,
                    correlation_id = %correlation_id,
                    "tool call completed"
                );
                Ok(ToolResponse { is_error: false, body })
            }
            Err(error) if error.is_caller_error() => {
                warn!(
                    event_name = "tool.call.rejected",
                    tool = name,
                    correlation_id = %correlation_id,
                    error_kind = error.kind(),
                    error = %error,
                    "tool call rejected"
                );
                let data = error.to_payload(&correlation_id);
                Err(ErrorData::invalid_params(error.to_string(), Some(data)))
            }
            Err(error) => {
                warn!(
                    event_name = "tool.call.failed",
                    tool = name,
                    correlation_id = %correlation_id,
                    error_kind = error.kind(),
                    error_code = error.error_code(),
                    error = %error,
                    "tool call failed"
                );
                Ok(ToolResponse { is_error: true, body: error.to_payload(&correlation_id) })
            }
        }
    }

    pub async fn run_stdio(self) -> anyhow::Result<()> {
        info!(event_name = "system.server.stdio_starting", "starting MCP server on stdio");

        let service = self.serve((tokio::io::stdin(), tokio::io::stdout())).await?;

        tokio::select! {
            quit = service.waiting() => {
                let reason = quit?;
                info!(event_name = "system.server.stopped", reason = ?reason, "MCP session ended");
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!(event_name = "system.server.stopping", "interrupt received, shutting down");
            }
        }
        Ok(())
    }

    fn instructions() -> String {
        let mut text = String::from(
            "IP Fabric network assurance tools. Queries run against the active snapshot; \
             list snapshots with ipf_get_snapshots and switch with ipf_set_snapshot. \
             Call ipf_get_filter_help before filtering.",
        );
        for (category, names) in categories() {
            text.push_str(&format!("\n{category}: {}", names.join(", ")));
        }
        text
    }
}

impl ServerHandler for IpfMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "ipf-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(Self::instructions()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let response = self.handle_call(&request.name, request.arguments).await?;
        Ok(response.into_call_result())
    }
}
