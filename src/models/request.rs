use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Capability of a tool the agent may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolKind {
    /// Natural language to SQL over a semantic model
    #[serde(rename = "cortex_analyst_text_to_sql")]
    TextToSql,
    /// Retrieval over a search service
    #[serde(rename = "cortex_search")]
    Search,
    /// Server-side execution of generated SQL
    #[serde(rename = "sql_exec")]
    SqlExec,
}

/// Tool name and capability, as nested under `tool_spec` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub kind: ToolKind,
    pub name: String,
}

/// One entry of the request's `tools` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub tool_spec: ToolSpec,
}

impl ToolDeclaration {
    pub fn new(kind: ToolKind, name: impl Into<String>) -> Self {
        Self {
            tool_spec: ToolSpec {
                kind,
                name: name.into(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.tool_spec.name
    }

    pub fn kind(&self) -> ToolKind {
        self.tool_spec.kind
    }
}

/// Resource a tool operates on, keyed by tool name in `tool_resources`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResource {
    /// Staged semantic model YAML for text-to-SQL
    SemanticModel { semantic_model_file: String },
    /// Fully qualified search service name
    SearchService {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_results: Option<u32>,
    },
}

/// One content block of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// A conversation message sent to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub role: String,
    pub content: Vec<MessageContent>,
}

impl AgentMessage {
    /// A user turn carrying plain text.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: vec![MessageContent {
                kind: "text".to_string(),
                text: text.into(),
            }],
        }
    }
}

/// Body of an agent run, plus the correlation id that travels beside it.
///
/// Immutable once built. The correlation id is not serialized; it is sent
/// as the `requestId` query parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentRequest {
    #[serde(skip)]
    request_id: Uuid,
    model: String,
    messages: Vec<AgentMessage>,
    tools: Vec<ToolDeclaration>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tool_resources: BTreeMap<String, ToolResource>,
}

impl AgentRequest {
    /// Build a request for a single user query with a fresh correlation id.
    pub fn new(
        query: impl Into<String>,
        model: impl Into<String>,
        tools: Vec<ToolDeclaration>,
        tool_resources: BTreeMap<String, ToolResource>,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            model: model.into(),
            messages: vec![AgentMessage::user(query)],
            tools,
            tool_resources,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Text of the user query.
    pub fn query(&self) -> &str {
        self.messages
            .first()
            .and_then(|m| m.content.first())
            .map(|c| c.text.as_str())
            .unwrap_or("")
    }
}
