//! Process entry point: configuration, logging and command dispatch.

use crate::cli::{Cli, Commands};
use crate::commands::{handle_serve_command, handle_status_command, handle_tools_command};
use crate::config::{apply_config_to_env, http_bind_from_env, BridgeConfig};
use anyhow::Result;
use clap::Parser;

/// The main entry point for the `wamcp` application.
pub fn run() -> Result<()> {
    // stdout carries the MCP stdio protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Config file values only fill gaps; real environment variables win.
    apply_config_to_env();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { bridge, http }) => handle_serve_command(bridge.config()?, http),
        Some(Commands::Tools) => handle_tools_command(),
        Some(Commands::Status { bridge }) => handle_status_command(bridge.config()?),
        // Bare `wamcp` honors the same environment (and config file) as `serve`.
        None => handle_serve_command(BridgeConfig::from_env()?, http_bind_from_env()),
    }
}
