//! IP Fabric MCP Server Binary
//!
//! ## Usage
//!
//! ```bash
//! IPF_URL=https://ipfabric.example.com IPF_TOKEN=... ipf-mcp
//!
//! # Self-signed platform certificate, pinned snapshot
//! IPF_VERIFY=false IPF_SNAPSHOT_ID=$prev ipf-mcp
//! ```
//!
//! Settings may also come from `ipf-mcp.toml` or a `.env` file in the working
//! directory. Logs go to stderr; stdout carries the protocol.

use anyhow::Result;
use ipf_core::config::{AppConfig, LoadOptions, LogFormat};
use ipf_mcp::IpfMcpServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    let level = config.logging.level.trim().to_ascii_lowercase();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{level},rmcp=warn,reqwest=warn,hyper=warn,hyper_util=warn"))
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv_path = dotenvy::dotenv().ok();

    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    info!(
        event_name = "system.bootstrap.start",
        url = %config.ipfabric.url,
        api_version = %config.ipfabric.api_version,
        verify_tls = config.ipfabric.verify_tls,
        snapshot_id = config.ipfabric.snapshot_id.as_deref().unwrap_or("$last"),
        dotenv = dotenv_path.as_ref().map(|path| path.display().to_string()).as_deref(),
        "starting ipf-mcp"
    );

    let server = IpfMcpServer::from_config(&config)?;
    server.run_stdio().await?;

    info!(event_name = "system.server.shutdown", "ipf-mcp stopped");
    Ok(())
}
