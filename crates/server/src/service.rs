//! Tool handlers for the WhatsApp gateway.
//!
//! Each tool is one async method on [`WhatsappService`] that returns a JSON
//! object. Handlers decide, per call, whether to answer from the
//! [`ResponseCache`], fetch from the bridge, or both:
//!
//! - status, connect, send, and logout always go to the bridge; status (when
//!   connected) and logout clear the whole cache, sends clear the messages region
//! - message listings and chat history are cached per [`MessageKey`]; searches,
//!   non-zero offsets, and raw-data requests always bypass the cache
//! - the first chat page and the unfiltered contact list are cached as single
//!   entries; chat pagination and contact searches bypass them
//!
//! Bridge failures never escape a handler. They become
//! `{"success": false, "error": ...}` (or `{"status": "error", ...}` for the
//! status check) so one bad bridge call only fails one tool call.

use crate::bridge::{BridgeClient, BridgeError};
use crate::cache::{CacheKey, CacheRegion, MessageKey, ResponseCache};
use crate::config::BridgeConfig;
use crate::projection::{project_chat, project_contact, project_list, project_message};
use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use rmcp::model::{CallToolResult, Content};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map as JsonMap, Value};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

pub const MAX_MESSAGE_LIMIT: u32 = 100;
pub const MAX_SEARCH_LIMIT: u32 = 50;
pub const MAX_CONTACT_LIMIT: u32 = 200;
pub const MAX_CHAT_LIMIT: u32 = 100;
pub const MAX_HISTORY_LIMIT: u32 = 100;

const DEFAULT_MESSAGE_LIMIT: i64 = 50;
const DEFAULT_SEARCH_LIMIT: i64 = 20;
const DEFAULT_CONTACT_LIMIT: i64 = 100;
const DEFAULT_CHAT_LIMIT: i64 = 50;
const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Caps a requested limit at `max`; negative requests become zero.
pub fn clamp_limit(requested: i64, max: u32) -> u32 {
    requested.clamp(0, i64::from(max)) as u32
}

fn clamp_offset(requested: i64) -> u32 {
    u32::try_from(requested.max(0)).unwrap_or(u32::MAX)
}

/// Treats empty strings the same as a missing argument.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn failure(err: impl Display) -> Value {
    json!({ "success": false, "error": err.to_string() })
}

fn status_failure(err: impl Display) -> Value {
    json!({ "status": "error", "error": err.to_string() })
}

fn settle(result: Result<Value, BridgeError>) -> Value {
    result.unwrap_or_else(failure)
}

/// Who a message is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Phone number with country code and no `+`.
    Phone(String),
    /// Full WhatsApp JID, e.g. `14155551234@s.whatsapp.net`.
    Jid(String),
}

/// Parameters for `get_whatsapp_messages`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageQuery {
    pub chat_jid: Option<String>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
    pub include_raw: bool,
}

impl Default for MessageQuery {
    fn default() -> Self {
        Self {
            chat_jid: None,
            search: None,
            limit: DEFAULT_MESSAGE_LIMIT,
            offset: 0,
            include_raw: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SendArgs {
    phone: Option<String>,
    jid: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MessagesArgs {
    chat_jid: Option<String>,
    search: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    include_raw: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchArgs {
    query: Option<String>,
    limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct ContactsArgs {
    search: Option<String>,
    limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatsArgs {
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct HistoryArgs {
    chat_jid: Option<String>,
    limit: Option<i64>,
}

fn parse_args<T: DeserializeOwned + Default>(args: Option<&JsonMap<String, Value>>) -> Result<T> {
    match args {
        Some(map) => serde_json::from_value(Value::Object(map.clone()))
            .context("invalid tool arguments"),
        None => Ok(T::default()),
    }
}

/// Wraps a tool payload for MCP.
///
/// The compact JSON text keeps responses small; `is_error` mirrors the
/// payload's own failure marker.
pub fn tool_result(payload: Value) -> CallToolResult {
    let failed = payload.get("success") == Some(&Value::Bool(false))
        || payload.get("status").and_then(|s| s.as_str()) == Some("error");
    CallToolResult {
        content: vec![Content::text(payload.to_string())],
        structured_content: Some(payload),
        is_error: Some(failed),
        meta: None,
    }
}

/// The gateway service: one bridge client and one response cache shared by
/// every tool call.
#[derive(Clone)]
pub struct WhatsappService {
    pub(crate) bridge: BridgeClient,
    pub(crate) cache: Arc<Mutex<ResponseCache>>,
}

impl WhatsappService {
    /// Builds a service for the given bridge with an empty cache.
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        Ok(Self::with_cache(BridgeClient::new(config)?, ResponseCache::new()))
    }

    pub fn with_cache(bridge: BridgeClient, cache: ResponseCache) -> Self {
        Self {
            bridge,
            cache: Arc::new(Mutex::new(cache)),
        }
    }

    /// Shared handle to the response cache.
    pub fn cache(&self) -> Arc<Mutex<ResponseCache>> {
        Arc::clone(&self.cache)
    }

    fn invalidate(&self, region: Option<CacheRegion>) {
        self.cache.lock().invalidate(region);
    }

    /// Serves `key` from the cache when fresh, otherwise runs `fetch` and
    /// stores its result. Failed fetches are never stored, and neither are
    /// fetches overtaken by an invalidation of their region.
    async fn cached<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<Value, BridgeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, BridgeError>>,
    {
        let (hit, generation) = {
            let cache = self.cache.lock();
            (cache.fresh(&key), cache.generation(key.region()))
        };
        if let Some(hit) = hit {
            return Ok(hit);
        }
        let value = fetch().await?;
        self.cache
            .lock()
            .put_if_current(key, value.clone(), generation);
        Ok(value)
    }

    /// Dispatches an MCP tool call by name.
    ///
    /// Hyphenated aliases (`get-whatsapp-status`) are accepted alongside the
    /// canonical snake_case names. Errors are reserved for unknown tools and
    /// arguments of the wrong type.
    pub async fn handle_call(
        &self,
        name: &str,
        args: Option<&JsonMap<String, Value>>,
    ) -> Result<CallToolResult> {
        let canonical = name.replace('-', "_");
        tracing::debug!(target: "wamcp::tools", tool = %canonical, "tool call");

        let payload = match canonical.as_str() {
            "get_whatsapp_status" => self.get_status().await,
            "connect_whatsapp" => self.connect().await,
            "send_whatsapp_message" => {
                let args: SendArgs = parse_args(args)?;
                match (present(args.phone.as_deref()), present(args.message.as_deref())) {
                    (None, _) => failure("phone is required"),
                    (_, None) => failure("message is required"),
                    (Some(phone), Some(message)) => {
                        self.send_message(Recipient::Phone(phone.to_string()), message)
                            .await
                    }
                }
            }
            "send_whatsapp_message_to_jid" => {
                let args: SendArgs = parse_args(args)?;
                match (present(args.jid.as_deref()), present(args.message.as_deref())) {
                    (None, _) => failure("jid is required"),
                    (_, None) => failure("message is required"),
                    (Some(jid), Some(message)) => {
                        self.send_message(Recipient::Jid(jid.to_string()), message)
                            .await
                    }
                }
            }
            "get_whatsapp_messages" => {
                let args: MessagesArgs = parse_args(args)?;
                self.get_messages(MessageQuery {
                    chat_jid: args.chat_jid,
                    search: args.search,
                    limit: args.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT),
                    offset: args.offset.unwrap_or(0),
                    include_raw: args.include_raw.unwrap_or(false),
                })
                .await
            }
            "search_whatsapp_messages" => {
                let args: SearchArgs = parse_args(args)?;
                match present(args.query.as_deref()) {
                    None => failure("query is required"),
                    Some(query) => {
                        self.search_messages(query, args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
                            .await
                    }
                }
            }
            "get_whatsapp_contacts" => {
                let args: ContactsArgs = parse_args(args)?;
                self.get_contacts(
                    args.search.as_deref(),
                    args.limit.unwrap_or(DEFAULT_CONTACT_LIMIT),
                )
                .await
            }
            "get_whatsapp_chats" => {
                let args: ChatsArgs = parse_args(args)?;
                self.get_chats(
                    args.limit.unwrap_or(DEFAULT_CHAT_LIMIT),
                    args.offset.unwrap_or(0),
                )
                .await
            }
            "get_chat_history" => {
                let args: HistoryArgs = parse_args(args)?;
                match present(args.chat_jid.as_deref()) {
                    None => failure("chat_jid is required"),
                    Some(chat_jid) => {
                        self.get_chat_history(
                            chat_jid,
                            args.limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
                        )
                        .await
                    }
                }
            }
            "logout_whatsapp" => self.logout().await,
            other => return Err(anyhow!("unknown tool: {other}")),
        };

        Ok(tool_result(payload))
    }

    /// Checks the connection state. A `connected` answer clears every region.
    pub async fn get_status(&self) -> Value {
        match self.bridge.get("/api/status", &[]).await {
            Ok(data) => {
                let status = data.get("status").cloned().unwrap_or(Value::Null);
                if status.as_str() == Some("connected") {
                    self.invalidate(None);
                }
                json!({
                    "status": status,
                    "error": data.get("error").cloned().unwrap_or(Value::Null),
                    "sync_in_progress": data
                        .get("syncInProgress")
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false),
                })
            }
            Err(e) => status_failure(e),
        }
    }

    /// Asks the bridge to start (or resume) its WhatsApp session.
    pub async fn connect(&self) -> Value {
        let result = self.bridge.post("/api/status", None).await;
        if let Err(e) = &result {
            tracing::info!(target: "wamcp::tools", error = %e, "connect failed");
        }
        settle(result)
    }

    /// Sends a text message. Success clears the messages region only.
    pub async fn send_message(&self, recipient: Recipient, message: &str) -> Value {
        let body = match &recipient {
            Recipient::Phone(phone) => json!({ "phone": phone, "message": message }),
            Recipient::Jid(jid) => json!({ "jid": jid, "message": message }),
        };
        match self.bridge.post("/api/send", Some(&body)).await {
            Ok(result) => {
                self.invalidate(Some(CacheRegion::Messages));
                tracing::info!(target: "wamcp::tools", recipient = ?recipient, "message sent");
                json!({
                    "success": result.get("success").cloned().unwrap_or(Value::Null),
                    "message_id": result.get("messageId").cloned().unwrap_or(Value::Null),
                })
            }
            Err(e) => {
                tracing::info!(target: "wamcp::tools", recipient = ?recipient, error = %e, "send failed");
                failure(e)
            }
        }
    }

    /// Lists messages for one chat, across all chats, or by search term.
    pub async fn get_messages(&self, query: MessageQuery) -> Value {
        settle(self.try_get_messages(query).await)
    }

    async fn try_get_messages(&self, query: MessageQuery) -> Result<Value, BridgeError> {
        let limit = clamp_limit(query.limit, MAX_MESSAGE_LIMIT);
        let offset = clamp_offset(query.offset);
        let chat_jid = present(query.chat_jid.as_deref()).map(str::to_string);
        let search = present(query.search.as_deref()).map(str::to_string);
        let include_raw = query.include_raw;

        let mut params = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        if let Some(chat) = &chat_jid {
            params.push(("chat_jid", chat.clone()));
        }
        if let Some(term) = &search {
            params.push(("search", term.clone()));
        }

        let take = limit as usize;
        let shape = |data: Value| -> Value {
            let messages: Vec<Value> = project_list(&data, "messages", |m| {
                project_message(m, include_raw)
            });
            let count = messages.len();
            let messages: Vec<Value> = messages.into_iter().take(take).collect();
            match (&search, &chat_jid) {
                (Some(_), _) => json!({
                    "success": true,
                    "messages": messages,
                    "count": count,
                    "has_more": data.get("hasMore").and_then(|v| v.as_bool()).unwrap_or(false),
                }),
                (None, Some(chat)) => json!({
                    "success": true,
                    "messages": messages,
                    "count": count,
                    "chat_jid": chat,
                }),
                (None, None) => json!({
                    "success": true,
                    "messages": messages,
                    "count": count,
                }),
            }
        };

        if search.is_some() || offset > 0 || include_raw {
            tracing::debug!(
                target: "wamcp::tools",
                search = search.is_some(),
                offset,
                include_raw,
                "message query bypasses cache"
            );
            let data = self.bridge.get("/api/messages", &params).await?;
            return Ok(shape(data));
        }

        let key = CacheKey::Messages(MessageKey::Listing {
            chat_jid: chat_jid.clone(),
            limit,
            offset,
        });
        self.cached(key, || async move {
            let data = self.bridge.get("/api/messages", &params).await?;
            Ok(shape(data))
        })
        .await
    }

    /// Full-text search across all chats. Never cached.
    pub async fn search_messages(&self, query: &str, limit: i64) -> Value {
        let limit = clamp_limit(limit, MAX_SEARCH_LIMIT);
        let params = [("search", query.to_string()), ("limit", limit.to_string())];
        settle(self.bridge.get("/api/messages", &params).await.map(|data| {
            let results = project_list(&data, "messages", |m| project_message(m, false));
            json!({
                "success": true,
                "count": results.len(),
                "results": results,
            })
        }))
    }

    /// Lists contacts. The unfiltered list is cached; searches never are.
    pub async fn get_contacts(&self, search: Option<&str>, limit: i64) -> Value {
        let limit = clamp_limit(limit, MAX_CONTACT_LIMIT);
        let shape = |data: Value| {
            let contacts = project_list(&data, "contacts", project_contact);
            json!({
                "success": true,
                "count": contacts.len(),
                "contacts": contacts,
            })
        };

        let result = match present(search) {
            Some(term) => {
                let params = [("limit", limit.to_string()), ("search", term.to_string())];
                self.bridge.get("/api/contacts", &params).await.map(shape)
            }
            None => {
                self.cached(CacheKey::Contacts, || async move {
                    let params = [("limit", limit.to_string())];
                    self.bridge.get("/api/contacts", &params).await.map(shape)
                })
                .await
            }
        };
        settle(result)
    }

    /// Lists chats. Only the first page (`offset == 0`) is cached.
    pub async fn get_chats(&self, limit: i64, offset: i64) -> Value {
        let limit = clamp_limit(limit, MAX_CHAT_LIMIT);
        let offset = clamp_offset(offset);
        let params = [("limit", limit.to_string()), ("offset", offset.to_string())];

        let result = if offset > 0 {
            self.bridge.get("/api/chats", &params).await.map(|data| {
                let chats = project_list(&data, "chats", project_chat);
                json!({
                    "success": true,
                    "count": chats.len(),
                    "chats": chats,
                    "offset": offset,
                })
            })
        } else {
            self.cached(CacheKey::Chats, || async move {
                self.bridge.get("/api/chats", &params).await.map(|data| {
                    let chats = project_list(&data, "chats", project_chat);
                    json!({
                        "success": true,
                        "count": chats.len(),
                        "chats": chats,
                    })
                })
            })
            .await
        };
        settle(result)
    }

    /// Message history for one chat, cached per `(chat_jid, limit)`.
    pub async fn get_chat_history(&self, chat_jid: &str, limit: i64) -> Value {
        let limit = clamp_limit(limit, MAX_HISTORY_LIMIT);
        let key = CacheKey::Messages(MessageKey::History {
            chat_jid: chat_jid.to_string(),
            limit,
        });
        settle(
            self.cached(key, || async move {
                let params = [("chat_jid", chat_jid.to_string()), ("limit", limit.to_string())];
                let data = self.bridge.get("/api/messages", &params).await?;
                let messages = project_list(&data, "messages", |m| project_message(m, false));
                Ok(json!({
                    "success": true,
                    "chat_jid": chat_jid,
                    "count": messages.len(),
                    "messages": messages,
                }))
            })
            .await,
        )
    }

    /// Ends the WhatsApp session. Success clears every region.
    pub async fn logout(&self) -> Value {
        match self.bridge.post("/api/logout", None).await {
            Ok(data) => {
                self.invalidate(None);
                tracing::info!(target: "wamcp::tools", "logged out");
                data
            }
            Err(e) => failure(e),
        }
    }
}
