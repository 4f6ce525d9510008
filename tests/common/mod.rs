//! Common test utilities for integration tests.
//!
//! Builds SSE bodies in the shape the agent endpoint emits and configs
//! pointed at a `wiremock` server.

use cortex_agent::config::AgentConfig;
use serde_json::{json, Value};

pub const TEST_TOKEN: &str = "test-pat-12345";

pub const AGENT_PATH: &str = "/api/v2/cortex/agent:run";
pub const STATEMENTS_PATH: &str = "/api/v2/statements";

/// Config aimed at a mock server.
pub fn test_config(base_url: &str) -> AgentConfig {
    AgentConfig::new(base_url, TEST_TOKEN)
}

/// A text delta payload.
pub fn text_event(text: &str) -> Value {
    json!({"delta": {"content": [{"type": "text", "text": text}]}})
}

/// A tool result payload carrying one `json` result.
pub fn tool_json_event(body: Value) -> Value {
    json!({"delta": {"content": [{
        "type": "tool_results",
        "tool_results": {"content": [{"type": "json", "json": body}]}
    }]}})
}

/// Render payloads as an SSE body terminated by `[DONE]`.
pub fn sse_body(events: &[Value]) -> String {
    let mut body = String::new();
    for event in events {
        body.push_str("event: message.delta\n");
        body.push_str(&format!("data: {}\n\n", event));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

/// A successful statement response.
pub fn statement_result() -> Value {
    json!({
        "resultSetMetaData": {"numRows": 1, "rowType": [{"name": "1", "type": "fixed"}]},
        "data": [["1"]],
        "code": "090001",
        "statementStatusUrl": "/api/v2/statements/01b2-handle"
    })
}
