//! Handler for the `serve` command.

use crate::config::BridgeConfig;
use crate::service::WhatsappService;
use anyhow::{anyhow, Result};
use rmcp::service::serve_server;
use tokio::runtime::Runtime;

/// Handle the `serve` command.
pub(crate) fn handle_serve_command(config: BridgeConfig, http: Option<String>) -> Result<()> {
    let service = WhatsappService::new(&config)?;
    let rt = Runtime::new()?;

    // HTTP transport mode
    if let Some(bind_addr) = http {
        #[cfg(feature = "http-transport")]
        return rt.block_on(crate::http_transport::serve_http(service, &bind_addr));

        #[cfg(not(feature = "http-transport"))]
        return Err(anyhow!(
            "cannot serve on {bind_addr}: http-transport feature is disabled; rebuild with --features http-transport"
        ));
    }

    // Default: stdio transport
    tracing::info!(
        target: "wamcp::serve",
        bridge = %config.base_url,
        "Starting MCP server on stdio"
    );
    let running = rt.block_on(async {
        serve_server(service, rmcp::transport::stdio())
            .await
            .map_err(|e| anyhow!("failed to start server: {e}"))
    })?;
    rt.block_on(async {
        running
            .waiting()
            .await
            .map_err(|e| anyhow!("server task ended: {e}"))
    })?;

    Ok(())
}
