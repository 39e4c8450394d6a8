//! Configuration for the gateway.
//!
//! Settings are layered with the following precedence:
//! CLI arguments > Environment variables > Config file > defaults
//!
//! ## Configuration File Format
//!
//! ```toml
//! # ~/.wamcp/config.toml
//!
//! [bridge]
//! # Base URL of the WhatsApp bridge service
//! url = "http://localhost:3000"
//!
//! # Upper bound for a single bridge request, in milliseconds
//! timeout_ms = 60000
//!
//! [serve]
//! # Bind address for the streamable HTTP transport
//! http = "0.0.0.0:8001"
//! ```

use anyhow::{Context, Result};
use reqwest::Url;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the bridge base URL.
pub const ENV_BRIDGE_URL: &str = "WHATSAPP_BRIDGE_URL";
/// Environment variable holding the bridge request timeout in milliseconds.
pub const ENV_BRIDGE_TIMEOUT_MS: &str = "WHATSAPP_BRIDGE_TIMEOUT_MS";
/// Environment variable holding the HTTP bind address.
pub const ENV_HTTP: &str = "WAMCP_HTTP";
/// Environment variable overriding the config file location.
pub const ENV_CONFIG_PATH: &str = "WAMCP_CONFIG";

pub const DEFAULT_BRIDGE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_HTTP_BIND: &str = "0.0.0.0:8001";

/// Top-level configuration file structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bridge: BridgeSection,
    #[serde(default)]
    pub serve: ServeSection,
}

/// `[bridge]` table.
#[derive(Debug, Default, Deserialize)]
pub struct BridgeSection {
    pub url: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// `[serve]` table.
#[derive(Debug, Default, Deserialize)]
pub struct ServeSection {
    pub http: Option<String>,
}

/// Connection settings for the bridge client.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

impl BridgeConfig {
    /// Builds a config from an explicit URL string and timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid bridge url: {base_url}"))?;
        Ok(Self { base_url, timeout })
    }

    /// Reads `WHATSAPP_BRIDGE_URL` and `WHATSAPP_BRIDGE_TIMEOUT_MS`.
    ///
    /// A malformed URL is an error; a malformed timeout falls back to the default.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var(ENV_BRIDGE_URL).unwrap_or_else(|_| DEFAULT_BRIDGE_URL.to_string());
        let base_url = Url::parse(&base_url)
            .with_context(|| format!("invalid {ENV_BRIDGE_URL} url: {base_url}"))?;

        let timeout = parse_timeout_ms(std::env::var(ENV_BRIDGE_TIMEOUT_MS).ok().as_deref());

        Ok(Self { base_url, timeout })
    }
}

/// HTTP bind address from `WAMCP_HTTP`, if set and non-empty.
pub fn http_bind_from_env() -> Option<String> {
    std::env::var(ENV_HTTP).ok().filter(|s| !s.trim().is_empty())
}

/// Parses a millisecond timeout, falling back to [`DEFAULT_TIMEOUT_MS`] when
/// the value is missing or not a number.
pub fn parse_timeout_ms(raw: Option<&str>) -> Duration {
    let millis = match raw.map(str::trim) {
        None => DEFAULT_TIMEOUT_MS,
        Some(value) => value.parse::<u64>().unwrap_or_else(|_| {
            tracing::warn!(
                target: "wamcp::config",
                value,
                default_ms = DEFAULT_TIMEOUT_MS,
                "Ignoring unparsable bridge timeout"
            );
            DEFAULT_TIMEOUT_MS
        }),
    };
    Duration::from_millis(millis)
}

/// Returns the path to the config file (`$WAMCP_CONFIG` or `~/.wamcp/config.toml`).
fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|h| h.join(".wamcp").join("config.toml"))
}

/// Loads the configuration file if it exists.
///
/// Returns `Ok(None)` if the file doesn't exist and `Err` if it exists but
/// fails to parse.
pub fn load_config() -> Result<Option<Config>> {
    let Some(path) = config_path() else {
        return Ok(None);
    };

    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;

    tracing::debug!(
        target: "wamcp::config",
        path = %path.display(),
        "Loaded configuration file"
    );

    Ok(Some(config))
}

/// Copies config file values into the environment.
///
/// Only variables that are not already set are written, so CLI flags (read
/// through clap's `env` fallback) and real environment variables keep
/// priority. Call this before parsing CLI arguments.
pub fn apply_config_to_env() {
    match load_config() {
        Ok(Some(config)) => apply_to_env(&config),
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(
                target: "wamcp::config",
                error = %format!("{e:#}"),
                "Ignoring unreadable configuration file"
            );
        }
    }
}

fn apply_to_env(config: &Config) {
    fn set_if_absent(key: &str, value: &str) {
        if std::env::var(key).is_err() {
            std::env::set_var(key, value);
            tracing::trace!(
                target: "wamcp::config",
                key,
                "Set environment variable from config file"
            );
        }
    }

    if let Some(url) = &config.bridge.url {
        set_if_absent(ENV_BRIDGE_URL, url);
    }
    if let Some(ms) = config.bridge.timeout_ms {
        set_if_absent(ENV_BRIDGE_TIMEOUT_MS, &ms.to_string());
    }
    if let Some(http) = &config.serve.http {
        set_if_absent(ENV_HTTP, http);
    }
}
