//! Statement execution against the SQL API.
//!
//! Submits a single statement and reports the outcome as a value. Nothing
//! here returns an error: a rejected statement, an unreachable host and an
//! unreadable body all become [`SqlExecutionResult::Error`].

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{AgentConfig, StatementContext};
use crate::models::SqlExecutionResult;
use crate::traits::{HttpClient, Response};

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    #[serde(flatten)]
    context: &'a StatementContext,
}

/// Strip trailing semicolons and whitespace from a generated statement.
///
/// `"SELECT 1;  "` and `"SELECT 1"` submit the same statement.
pub fn normalize_statement(sql: &str) -> &str {
    sql.trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

/// Runs statements on behalf of the orchestrator.
#[derive(Clone)]
pub struct SqlExecutor {
    http: Arc<dyn HttpClient>,
    config: AgentConfig,
}

impl SqlExecutor {
    pub fn new(config: &AgentConfig, http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            config: config.clone(),
        }
    }

    /// Submit `sql` and report how it went.
    ///
    /// `request_id` is sent as the `requestId` query parameter so the
    /// statement can be matched with the agent call that produced it.
    pub async fn execute(&self, sql: &str, request_id: Uuid) -> SqlExecutionResult {
        let statement = normalize_statement(sql);
        if statement.is_empty() {
            tracing::warn!(request_id = %request_id, "Refusing to submit empty statement");
            return SqlExecutionResult::Error {
                status: None,
                message: "statement is empty".to_string(),
            };
        }

        let body = StatementRequest {
            statement,
            timeout: self.config.statement_timeout_secs(),
            context: &self.config.statement_context,
        };
        let body = match serde_json::to_string(&body) {
            Ok(body) => body,
            Err(e) => {
                return SqlExecutionResult::Error {
                    status: None,
                    message: format!("failed to encode statement request: {}", e),
                }
            }
        };

        let url = self.config.statements_url(request_id);
        tracing::info!(request_id = %request_id, "Submitting statement");
        tracing::debug!(request_id = %request_id, statement = %statement, "Statement text");

        let headers = self.config.auth_headers();
        match self
            .http
            .post(&url, &body, &headers, self.config.statement_timeout)
            .await
        {
            Ok(response) => interpret_response(response, request_id),
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Statement request failed");
                SqlExecutionResult::Error {
                    status: None,
                    message: e.to_string(),
                }
            }
        }
    }
}

fn interpret_response(response: Response, request_id: Uuid) -> SqlExecutionResult {
    if response.status != 200 {
        tracing::warn!(
            request_id = %request_id,
            status = response.status,
            "Statement rejected"
        );
        return SqlExecutionResult::Error {
            status: Some(response.status),
            message: response.text_lossy(),
        };
    }

    match response.json::<serde_json::Value>() {
        Ok(result) => {
            tracing::info!(request_id = %request_id, "Statement succeeded");
            SqlExecutionResult::Success { result }
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Statement response is not JSON");
            SqlExecutionResult::Error {
                status: Some(response.status),
                message: format!("invalid JSON in statement response: {}", e),
            }
        }
    }
}

impl std::fmt::Debug for SqlExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlExecutor")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.statement_timeout)
            .field("context", &self.config.statement_context)
            .finish_non_exhaustive()
    }
}
