//! This crate provides the core functionality for the `wamcp` application: an MCP
//! server that fronts a local WhatsApp bridge, trims its responses down to the
//! fields an agent needs, and caches the read-heavy ones for a short TTL.
//!
//! The main entry point is the `run` function. [`WhatsappService`] is the MCP
//! handler and can be served over any rmcp transport. Other parts of the crate
//! are considered internal and may change without notice.
//!
//! The `http-transport` feature (on by default) adds Streamable HTTP serving with
//! a `/health` probe. Build with `--no-default-features` for stdio only.

mod app;
pub mod bridge;
pub mod cache;
pub mod cli;
mod commands;
pub mod config;
mod handler;
#[cfg(feature = "http-transport")]
pub mod http_transport;
pub mod projection;
pub mod service;
pub mod tool_schemas;

pub use app::run;
pub use bridge::{BridgeClient, BridgeError};
pub use cache::{CacheKey, CacheRegion, MessageKey, ResponseCache, CACHE_TTL};
pub use config::BridgeConfig;
pub use service::{tool_result, MessageQuery, Recipient, WhatsappService};
