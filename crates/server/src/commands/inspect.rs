//! Handlers for the `tools` and `status` commands.

use crate::config::BridgeConfig;
use crate::service::WhatsappService;
use crate::tool_schemas::all_tools;
use anyhow::Result;
use tokio::runtime::Runtime;

/// Prints each advertised tool as `name  description`.
pub(crate) fn handle_tools_command() -> Result<()> {
    let tools = all_tools();
    let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
    for tool in tools {
        println!(
            "{:<width$}  {}",
            tool.name,
            tool.description.as_deref().unwrap_or_default()
        );
    }
    Ok(())
}

/// Runs a single status check and prints the projected result.
pub(crate) fn handle_status_command(config: BridgeConfig) -> Result<()> {
    let service = WhatsappService::new(&config)?;
    let rt = Runtime::new()?;
    let status = rt.block_on(service.get_status());
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
