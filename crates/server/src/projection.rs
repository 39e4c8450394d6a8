//! Reduces bridge records to the few fields an agent needs.
//!
//! Every function here is total: any JSON value is accepted and missing or
//! oddly-typed fields fall back to a default instead of failing.

use serde_json::{json, Map as JsonMap, Value};

/// Maximum number of characters of message content kept in a projection.
pub const MAX_CONTENT_CHARS: usize = 500;

fn field(raw: &Value, key: &str) -> Value {
    raw.get(key).cloned().unwrap_or(Value::Null)
}

/// Keeps the first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// The bridge stores booleans as SQLite integers, so accept both shapes.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

/// Projects a message to `{id, content, sender, timestamp, is_from_me, type}`.
///
/// Content is cut to [`MAX_CONTENT_CHARS`] characters. `raw_data` is attached
/// only when `include_raw` is set.
pub fn project_message(raw: &Value, include_raw: bool) -> Value {
    let content = raw.get("content").and_then(|v| v.as_str()).unwrap_or("");
    let message_type = non_empty_str(raw.get("message_type")).unwrap_or("text");

    let mut out = JsonMap::new();
    out.insert("id".into(), field(raw, "id"));
    out.insert(
        "content".into(),
        json!(truncate_chars(content, MAX_CONTENT_CHARS)),
    );
    out.insert("sender".into(), field(raw, "sender_jid"));
    out.insert("timestamp".into(), field(raw, "timestamp"));
    out.insert("is_from_me".into(), json!(truthy(raw.get("is_from_me"))));
    out.insert("type".into(), json!(message_type));
    if include_raw {
        out.insert("raw_data".into(), field(raw, "raw_data"));
    }
    Value::Object(out)
}

/// Projects a chat to `{jid, name, unread, last_message}`.
pub fn project_chat(raw: &Value) -> Value {
    let unread = raw
        .get("unread_count")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    json!({
        "jid": field(raw, "jid"),
        "name": field(raw, "name"),
        "unread": unread,
        "last_message": field(raw, "last_message_at"),
    })
}

/// Projects a contact to `{jid, name, phone}`, using `notify` when `name` is empty.
pub fn project_contact(raw: &Value) -> Value {
    let name = non_empty_str(raw.get("name"))
        .or_else(|| non_empty_str(raw.get("notify")))
        .map(|s| json!(s))
        .unwrap_or(Value::Null);
    json!({
        "jid": field(raw, "jid"),
        "name": name,
        "phone": field(raw, "phone"),
    })
}

/// Projects every element of the array stored under `key`.
///
/// A missing key or non-array value yields an empty list.
pub(crate) fn project_list(
    data: &Value,
    key: &str,
    project: impl Fn(&Value) -> Value,
) -> Vec<Value> {
    data.get(key)
        .and_then(|v| v.as_array())
        .map(|items| items.iter().map(project).collect())
        .unwrap_or_default()
}
