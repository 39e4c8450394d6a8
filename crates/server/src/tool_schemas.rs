//! MCP tool definitions for the WhatsApp gateway.
//!
//! Descriptions are deliberately short: every tool definition is sent to the
//! agent on `tools/list`, so verbose text costs tokens on every session.

use crate::service::{
    MAX_CHAT_LIMIT, MAX_CONTACT_LIMIT, MAX_HISTORY_LIMIT, MAX_MESSAGE_LIMIT, MAX_SEARCH_LIMIT,
};
use rmcp::model::{Tool, ToolAnnotations};
use serde_json::{json, Map as JsonMap, Value};
use std::sync::Arc;

/// Canonical names of every tool the gateway serves.
pub const TOOL_NAMES: &[&str] = &[
    "get_whatsapp_status",
    "connect_whatsapp",
    "send_whatsapp_message",
    "send_whatsapp_message_to_jid",
    "get_whatsapp_messages",
    "search_whatsapp_messages",
    "get_whatsapp_contacts",
    "get_whatsapp_chats",
    "get_chat_history",
    "logout_whatsapp",
];

/// Builds an object schema from a properties map and required field list.
///
/// Codex CLI expects every tool input_schema to include a JSON Schema "type",
/// so parameterless tools still get an explicit empty object.
fn object_schema(props: Value, required: &[&str]) -> Arc<JsonMap<String, Value>> {
    let mut schema = JsonMap::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), props);
    if !required.is_empty() {
        schema.insert("required".into(), json!(required));
    }
    schema.insert("additionalProperties".into(), json!(false));
    Arc::new(schema)
}

/// No schema `maximum`: oversized limits are clamped by the server, not
/// rejected by the client.
fn limit_prop(default: u32, max: u32) -> Value {
    json!({
        "type": "integer",
        "default": default,
        "description": format!("Max results (default {default}, max {max})")
    })
}

fn offset_prop() -> Value {
    json!({ "type": "integer", "default": 0, "description": "Pagination offset" })
}

fn tool(
    name: &'static str,
    description: &'static str,
    schema: Arc<JsonMap<String, Value>>,
    read_only: bool,
) -> Tool {
    let mut annotations = ToolAnnotations::default();
    annotations.read_only_hint = Some(read_only);
    Tool {
        name: name.into(),
        title: None,
        description: Some(description.into()),
        input_schema: schema,
        output_schema: None,
        annotations: Some(annotations),
        icons: None,
        meta: None,
    }
}

/// Returns every tool definition, in [`TOOL_NAMES`] order.
pub fn all_tools() -> Vec<Tool> {
    let empty = object_schema(json!({}), &[]);

    vec![
        tool(
            "get_whatsapp_status",
            "Check WhatsApp connection state.",
            empty.clone(),
            true,
        ),
        tool(
            "connect_whatsapp",
            "Initialize WhatsApp connection.",
            empty.clone(),
            false,
        ),
        tool(
            "send_whatsapp_message",
            "Send message to phone number.",
            object_schema(
                json!({
                    "phone": {
                        "type": "string",
                        "description": "Phone with country code, no + (e.g. \"14155551234\")"
                    },
                    "message": { "type": "string", "description": "Text to send" }
                }),
                &["phone", "message"],
            ),
            false,
        ),
        tool(
            "send_whatsapp_message_to_jid",
            "Send message to JID from contacts/chats.",
            object_schema(
                json!({
                    "jid": {
                        "type": "string",
                        "description": "WhatsApp JID (e.g. \"14155551234@s.whatsapp.net\")"
                    },
                    "message": { "type": "string", "description": "Text to send" }
                }),
                &["jid", "message"],
            ),
            false,
        ),
        tool(
            "get_whatsapp_messages",
            "Get messages from a chat or search across all chats.",
            object_schema(
                json!({
                    "chat_jid": { "type": "string", "description": "Specific chat JID (optional)" },
                    "search": { "type": "string", "description": "Search term (optional)" },
                    "limit": limit_prop(50, MAX_MESSAGE_LIMIT),
                    "offset": offset_prop(),
                    "include_raw": {
                        "type": "boolean",
                        "default": false,
                        "description": "Attach raw bridge data (uncached)"
                    }
                }),
                &[],
            ),
            true,
        ),
        tool(
            "search_whatsapp_messages",
            "Search messages across all chats.",
            object_schema(
                json!({
                    "query": { "type": "string", "description": "Search term" },
                    "limit": limit_prop(20, MAX_SEARCH_LIMIT)
                }),
                &["query"],
            ),
            true,
        ),
        tool(
            "get_whatsapp_contacts",
            "Get contacts list.",
            object_schema(
                json!({
                    "search": { "type": "string", "description": "Filter by name/phone (optional)" },
                    "limit": limit_prop(100, MAX_CONTACT_LIMIT)
                }),
                &[],
            ),
            true,
        ),
        tool(
            "get_whatsapp_chats",
            "Get chat conversations list.",
            object_schema(
                json!({
                    "limit": limit_prop(50, MAX_CHAT_LIMIT),
                    "offset": offset_prop()
                }),
                &[],
            ),
            true,
        ),
        tool(
            "get_chat_history",
            "Get message history for specific chat.",
            object_schema(
                json!({
                    "chat_jid": { "type": "string", "description": "Chat JID from get_whatsapp_chats" },
                    "limit": limit_prop(50, MAX_HISTORY_LIMIT)
                }),
                &["chat_jid"],
            ),
            true,
        ),
        tool(
            "logout_whatsapp",
            "Logout and clear session.",
            empty,
            false,
        ),
    ]
}
