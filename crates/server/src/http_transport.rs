//! HTTP transport for remote MCP access.
//!
//! Serves the MCP Streamable HTTP protocol alongside a plain `GET /health`
//! probe. Every HTTP session is handed a clone of the same
//! [`WhatsappService`], so all sessions share one bridge client and one
//! response cache.

use crate::service::WhatsappService;
use anyhow::{Context, Result};
use axum::routing::get;
use axum::Json;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Router exposing only the health probe.
pub fn health_router() -> axum::Router {
    axum::Router::new().route("/health", get(health))
}

/// Starts the MCP server over HTTP on `bind_addr` (e.g. `"0.0.0.0:8001"`).
///
/// # Security
/// This endpoint has NO authentication. Only bind to localhost or trusted
/// network interfaces.
pub async fn serve_http(service: WhatsappService, bind_addr: &str) -> Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid bind address: {bind_addr}"))?;

    tracing::info!(
        target: "wamcp::http",
        bind = %addr,
        bridge = %service.bridge.base_url(),
        "Starting MCP server"
    );

    let session_manager = Arc::new(LocalSessionManager::default());
    let config = StreamableHttpServerConfig::default();
    let http_service = StreamableHttpService::new(
        move || Ok(service.clone()),
        session_manager,
        config,
    );

    let app = health_router().fallback_service(http_service);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    tracing::info!(target: "wamcp::http", bind = %addr, "MCP HTTP server listening");

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}
