//! IP Fabric MCP (Model Context Protocol) Server
//!
//! Lets AI agents query an IP Fabric network assurance platform: list and
//! pick snapshots, fetch inventory tables with filters, and compare a table
//! across snapshots.
//!
//! ## Architecture
//!
//! - `IpfMcpServer`: rmcp `ServerHandler` over stdio
//! - `Dispatcher`: routes a tool name plus JSON arguments to its handler
//! - `ToolRegistry`: the fixed catalog of tools and their input schemas
//! - `Session`: the active snapshot shared by every call
//!
//! ## Example Usage
//!
//! ```no_run
//! use ipf_core::config::{AppConfig, LoadOptions};
//! use ipf_mcp::IpfMcpServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load(LoadOptions::default())?;
//!     IpfMcpServer::from_config(&config)?.run_stdio().await
//! }
//! ```

pub mod dispatcher;
pub mod registry;
pub mod server;
pub mod session;
pub mod tools;

pub use dispatcher::Dispatcher;
pub use registry::{RegistryError, ToolDescriptor, ToolKind, ToolRegistry};
pub use server::{IpfMcpServer, ToolResponse};
pub use session::Session;
pub use tools::ToolOutput;
