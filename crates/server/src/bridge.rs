//! HTTP client for the WhatsApp bridge service.
//!
//! The bridge owns the WhatsApp session, message store, and delivery. This
//! module only issues requests against its `/api/*` surface and turns every
//! non-success outcome into a [`BridgeError`]. There are no retries: callers
//! treat an error as final for that call.

use crate::config::BridgeConfig;
use anyhow::{Context, Result};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Failure talking to the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Connection refused, DNS failure, timeout, or a broken transfer.
    #[error("bridge unreachable: {0}")]
    Unreachable(String),
    /// The bridge answered with a non-2xx status.
    #[error("bridge returned {status}: {message}")]
    Rejected { status: u16, message: String },
    /// A 2xx response whose body is not JSON.
    #[error("malformed bridge response: {0}")]
    Malformed(String),
}

impl BridgeError {
    fn from_transport(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Unreachable(format!("request timed out after {}s", timeout.as_secs_f64()))
        } else if err.is_connect() {
            Self::Unreachable(format!("connection failed: {err}"))
        } else {
            Self::Unreachable(err.to_string())
        }
    }

    /// Builds a rejection from the status and raw body text.
    ///
    /// Prefers the bridge's JSON `error` field, then the body text, then the
    /// canonical status reason.
    pub(crate) fn rejected(status: StatusCode, body: &str) -> Self {
        let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
            v.get("error")
                .and_then(|e| e.as_str())
                .map(|s| s.to_string())
        });
        let message = from_json
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        Self::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

/// Long-lived handle to the bridge.
///
/// Cloning is cheap; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    base_url: Url,
    timeout: Duration,
    http: reqwest::Client,
}

impl BridgeClient {
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;

        // `Url::join` drops the last path segment unless it ends in '/'.
        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            timeout: config.timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, BridgeError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| BridgeError::Unreachable(format!("invalid bridge path {path}: {e}")))
    }

    /// Issues one request and returns the decoded JSON body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, BridgeError> {
        let url = self.endpoint(path)?;
        tracing::debug!(
            target: "wamcp::bridge",
            method = %method,
            path,
            params = query.len(),
            "bridge request"
        );

        let mut builder = self.http.request(method.clone(), url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            let err = BridgeError::from_transport(&e, self.timeout);
            tracing::warn!(target: "wamcp::bridge", method = %method, path, error = %err, "bridge request failed");
            err
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BridgeError::from_transport(&e, self.timeout))?;

        if !status.is_success() {
            let err = BridgeError::rejected(status, &text);
            tracing::warn!(
                target: "wamcp::bridge",
                method = %method,
                path,
                status = status.as_u16(),
                error = %err,
                "bridge rejected request"
            );
            return Err(err);
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!(target: "wamcp::bridge", path, error = %e, "bridge body is not JSON");
            BridgeError::Malformed(e.to_string())
        })
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, BridgeError> {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value, BridgeError> {
        self.request(Method::POST, path, &[], body).await
    }
}
