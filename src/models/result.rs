use serde::{Deserialize, Serialize};

/// A search hit referenced by the answer.
///
/// Either identifier may be missing when the upstream hit omits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub source_id: Option<String>,
    pub doc_id: Option<String>,
}

impl Citation {
    pub fn new(source_id: impl Into<String>, doc_id: impl Into<String>) -> Self {
        Self {
            source_id: Some(source_id.into()),
            doc_id: Some(doc_id.into()),
        }
    }
}

/// Outcome of submitting a statement to the execution endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SqlExecutionResult {
    /// HTTP 200; the decoded body exactly as returned
    Success { result: serde_json::Value },
    /// Anything else; `status` is absent for transport failures
    Error {
        status: Option<u16>,
        message: String,
    },
}

impl SqlExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SqlExecutionResult::Success { .. })
    }

    /// The raw result body, if the statement succeeded.
    pub fn result(&self) -> Option<&serde_json::Value> {
        match self {
            SqlExecutionResult::Success { result } => Some(result),
            SqlExecutionResult::Error { .. } => None,
        }
    }
}

/// Final answer of one agent call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    /// Text in stream arrival order
    pub text: String,
    /// Citations in arrival order, duplicates kept
    pub citations: Vec<Citation>,
    /// Last non-empty SQL statement seen in the stream
    pub sql: Option<String>,
    /// Present only when `sql` is
    #[serde(rename = "results")]
    pub execution_result: Option<SqlExecutionResult>,
}

impl AgentResult {
    /// True when the stream carried no text, citations, or SQL.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.citations.is_empty() && self.sql.is_none()
    }
}
