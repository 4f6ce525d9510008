//! Folds decoded payloads into text, citations and SQL.
//!
//! Processing is strictly forward: text and citations are only appended,
//! and the SQL slot is only overwritten by a later non-empty statement.

use serde_json::Value;

use super::events::{parse_events, StreamEvent, ToolResultItem};
use crate::models::{AgentResult, Citation};

/// Running state of one agent stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventAccumulator {
    text: String,
    sql: Option<String>,
    citations: Vec<Citation>,
    payloads_seen: usize,
    items_ignored: usize,
}

impl EventAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one decoded payload.
    pub fn push_payload(&mut self, payload: &Value) {
        self.payloads_seen += 1;
        for event in parse_events(payload) {
            self.apply(event);
        }
    }

    /// Consuming form of [`push_payload`](Self::push_payload), for folds.
    pub fn accumulate(mut self, payload: &Value) -> Self {
        self.push_payload(payload);
        self
    }

    /// Apply one content item.
    pub fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::TextDelta { text } => self.text.push_str(&text),
            StreamEvent::ToolResults { results } => {
                for result in results {
                    self.apply_tool_result(result);
                }
            }
            StreamEvent::Unrecognized { kind } => {
                self.items_ignored += 1;
                tracing::trace!(kind = ?kind, "Ignoring unrecognized content item");
            }
        }
    }

    fn apply_tool_result(&mut self, result: ToolResultItem) {
        match result {
            ToolResultItem::Json {
                text,
                sql,
                search_results,
            } => {
                if let Some(text) = text {
                    self.text.push_str(&text);
                }
                if let Some(sql) = sql.filter(|s| !s.is_empty()) {
                    if self.sql.is_some() {
                        tracing::debug!("Replacing previously extracted SQL statement");
                    }
                    self.sql = Some(sql);
                }
                self.citations.extend(search_results);
            }
            ToolResultItem::Other => self.items_ignored += 1,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }

    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    /// Number of payloads applied so far.
    pub fn payloads_seen(&self) -> usize {
        self.payloads_seen
    }

    /// Content items and tool results skipped as unknown.
    pub fn items_ignored(&self) -> usize {
        self.items_ignored
    }

    /// Finish the stream phase; no execution result yet.
    pub fn into_result(self) -> AgentResult {
        AgentResult {
            text: self.text,
            citations: self.citations,
            sql: self.sql,
            execution_result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sse::decode_line;
    use serde_json::json;

    fn fold_lines(lines: &[&str]) -> AgentResult {
        lines
            .iter()
            .filter_map(|line| decode_line(line))
            .fold(EventAccumulator::new(), |acc, payload| acc.accumulate(&payload))
            .into_result()
    }

    fn sql_event(sql: &str) -> String {
        format!(
            "data: {}",
            json!({"delta": {"content": [{
                "type": "tool_results",
                "tool_results": {"content": [{"type": "json", "json": {"sql": sql}}]}
            }]}})
        )
    }

    fn search_event(hits: &[(&str, &str)]) -> String {
        let hits: Vec<Value> = hits
            .iter()
            .map(|(source, doc)| json!({"source_id": source, "doc_id": doc}))
            .collect();
        format!(
            "data: {}",
            json!({"delta": {"content": [{
                "type": "tool_results",
                "tool_results": {"content": [{"type": "json", "json": {"searchResults": hits}}]}
            }]}})
        )
    }

    #[test]
    fn test_only_framing_yields_empty_result() {
        let result = fold_lines(&["", "", "data: [DONE]", "", "data: [DONE]"]);
        assert_eq!(result, AgentResult::default());
        assert!(result.is_empty());
    }

    #[test]
    fn test_sql_last_write_wins() {
        let first = sql_event("SELECT 1");
        let second = sql_event("SELECT 2");
        let result = fold_lines(&[&first, "", &second, ""]);
        assert_eq!(result.sql.as_deref(), Some("SELECT 2"));
    }

    #[test]
    fn test_event_without_sql_never_clears_it() {
        let with_sql = sql_event("SELECT region FROM sales");
        let empty_sql = sql_event("");
        let result = fold_lines(&[
            &with_sql,
            r#"data: {"delta":{"content":[{"type":"text","text":"done"}]}}"#,
            &empty_sql,
        ]);
        assert_eq!(result.sql.as_deref(), Some("SELECT region FROM sales"));
        assert_eq!(result.text, "done");
    }

    #[test]
    fn test_unknown_item_ignored_text_kept() {
        let mut acc = EventAccumulator::new();
        acc.push_payload(&json!({"delta": {"content": [
            {"type": "fetched_table", "rows": []},
            {"type": "text", "text": "only this"}
        ]}}));

        assert_eq!(acc.text(), "only this");
        assert_eq!(acc.items_ignored(), 1);
        assert_eq!(acc.payloads_seen(), 1);
    }

    #[test]
    fn test_citation_order_keeps_duplicates() {
        let first = search_event(&[("s1", "d1"), ("s2", "d2")]);
        let second = search_event(&[("s1", "d1"), ("s3", "d3")]);
        let result = fold_lines(&[&first, &second]);

        assert_eq!(
            result.citations,
            vec![
                Citation::new("s1", "d1"),
                Citation::new("s2", "d2"),
                Citation::new("s1", "d1"),
                Citation::new("s3", "d3"),
            ]
        );
    }

    #[test]
    fn test_malformed_payload_between_valid_events() {
        let result = fold_lines(&[
            r#"data: {"delta":{"content":[{"type":"text","text":"Hello, "}]}}"#,
            r#"data: {"delta":{"content":[{"type":"text","text":"#,
            r#"data: {"delta":{"content":[{"type":"text","text":"world"}]}}"#,
        ]);
        assert_eq!(result.text, "Hello, world");
    }

    #[test]
    fn test_text_tokens_not_deduplicated() {
        let token = r#"data: {"delta":{"content":[{"type":"text","text":"ha"}]}}"#;
        let result = fold_lines(&[token, token, token]);
        assert_eq!(result.text, "hahaha");
    }

    #[test]
    fn test_end_to_end_stream_shape() {
        let result = fold_lines(&[
            r#"data: {"delta":{"content":[{"type":"text","text":"Sales grew "}]}}"#,
            r#"data: {"delta":{"content":[{"type":"tool_results","tool_results":{"content":[{"type":"json","json":{"sql":"SELECT 1","text":"10%."}}]}}]}}"#,
            "data: [DONE]",
        ]);
        assert_eq!(result.text, "Sales grew 10%.");
        assert_eq!(result.sql.as_deref(), Some("SELECT 1"));
        assert!(result.citations.is_empty());
        assert!(result.execution_result.is_none());
    }

    #[test]
    fn test_nested_data_delta() {
        let mut acc = EventAccumulator::new();
        acc.push_payload(&json!({
            "event": "message.delta",
            "data": {"id": "msg_1", "delta": {"content": [{"type": "text", "text": "nested"}]}}
        }));
        assert_eq!(acc.text(), "nested");
    }

    #[test]
    fn test_tool_results_missing_content_contributes_nothing() {
        let mut acc = EventAccumulator::new();
        acc.push_payload(&json!({"delta": {"content": [
            {"type": "tool_results", "tool_results": {"tool_use_id": "t1"}},
            {"type": "tool_results", "tool_results": {"content": [{"type": "json", "json": []}]}}
        ]}}));

        assert_eq!(acc.text(), "");
        assert_eq!(acc.sql(), None);
        assert!(acc.citations().is_empty());
        assert_eq!(acc.items_ignored(), 1);
    }
}
