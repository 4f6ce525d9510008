//! Typed view of agent stream events.
//!
//! Each decoded payload carries a `delta` whose `content` list holds one
//! item per event. The upstream schema is loose and still evolving, so every
//! lookup here yields an absent value instead of an error: a missing or
//! mistyped field makes the item contribute nothing, it never fails the
//! payload.

use serde_json::{Map, Value};

use crate::models::Citation;

/// One result inside a `tool_results` item.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResultItem {
    /// A `json` result; each field is present only when well-formed
    Json {
        text: Option<String>,
        /// Never `Some("")`
        sql: Option<String>,
        search_results: Vec<Citation>,
    },
    /// Any other result type, or a `json` result without an object body
    Other,
}

/// One content item of a stream delta.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Free text token(s)
    TextDelta { text: String },
    /// Output of one or more tool invocations
    ToolResults { results: Vec<ToolResultItem> },
    /// Content type this client does not know; carries the type tag if any
    Unrecognized { kind: Option<String> },
}

impl StreamEvent {
    /// Classify a single `delta.content` item.
    pub fn from_content_item(item: &Value) -> Self {
        match str_field(item, "type") {
            Some("text") => StreamEvent::TextDelta {
                text: str_field(item, "text").unwrap_or_default().to_string(),
            },
            Some("tool_results") => StreamEvent::ToolResults {
                results: tool_results(item),
            },
            other => StreamEvent::Unrecognized {
                kind: other.map(String::from),
            },
        }
    }
}

impl ToolResultItem {
    /// Classify a single entry of `tool_results.content`.
    pub fn from_value(value: &Value) -> Self {
        if str_field(value, "type") != Some("json") {
            return ToolResultItem::Other;
        }
        let Some(json) = value.get("json").and_then(Value::as_object) else {
            return ToolResultItem::Other;
        };

        ToolResultItem::Json {
            text: json.get("text").and_then(Value::as_str).map(String::from),
            sql: json
                .get("sql")
                .and_then(Value::as_str)
                .filter(|sql| !sql.trim().is_empty())
                .map(String::from),
            search_results: search_results(json),
        }
    }
}

/// Find the delta object of a payload.
///
/// A top-level `delta` is preferred. `data.delta` is consulted when the
/// top-level field is absent or `null`; any other non-object top-level
/// value yields nothing.
pub fn locate_delta(payload: &Value) -> Option<&Map<String, Value>> {
    match payload.get("delta") {
        Some(delta) if !delta.is_null() => delta.as_object(),
        _ => payload
            .get("data")
            .and_then(|data| data.get("delta"))
            .and_then(Value::as_object),
    }
}

/// All content items of a payload, in order.
pub fn parse_events(payload: &Value) -> Vec<StreamEvent> {
    locate_delta(payload)
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_array)
        .map(|items| items.iter().map(StreamEvent::from_content_item).collect())
        .unwrap_or_default()
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn tool_results(item: &Value) -> Vec<ToolResultItem> {
    item.get("tool_results")
        .and_then(|results| results.get("content"))
        .and_then(Value::as_array)
        .map(|results| results.iter().map(ToolResultItem::from_value).collect())
        .unwrap_or_default()
}

fn search_results(json: &Map<String, Value>) -> Vec<Citation> {
    json.get("searchResults")
        .and_then(Value::as_array)
        .map(|hits| hits.iter().filter_map(citation_from_hit).collect())
        .unwrap_or_default()
}

fn citation_from_hit(hit: &Value) -> Option<Citation> {
    let hit = hit.as_object()?;
    Some(Citation {
        source_id: identifier(hit.get("source_id")),
        doc_id: identifier(hit.get("doc_id")),
    })
}

// Ids arrive as strings or numbers depending on the search service.
fn identifier(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
