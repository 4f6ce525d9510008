//! Agent orchestration.
//!
//! One call to [`AgentOrchestrator::run_agent_query`] walks a fixed path:
//!
//! ```text
//! Built -> Streaming -> Decoded -> Executing -> Completed
//!                                \-> Skipped  -/
//! ```
//!
//! The agent stream is opened, decoded and folded into an
//! [`AgentResult`]. If the stream produced SQL, the statement is executed
//! with a fresh correlation id and its outcome attached. Nothing is retried.

use futures_util::StreamExt;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

use crate::adapters::ReqwestHttpClient;
use crate::config::AgentConfig;
use crate::error::{CortexResult, ErrorContext, NetworkError, ResultExt, StreamError};
use crate::executor::SqlExecutor;
use crate::models::{AgentRequest, AgentResult, SqlExecutionResult};
use crate::sse::{decode_stream, EventAccumulator, PayloadStream};
use crate::traits::{HttpClient, HttpError};

/// Statement used by [`AgentOrchestrator::health_check`].
pub const HEALTH_CHECK_STATEMENT: &str = "SELECT CURRENT_TIMESTAMP";

/// Where a call currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    Built,
    Streaming,
    Decoded,
    Executing,
    Executed,
    Skipped,
    Completed,
}

impl AgentPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentPhase::Built => "built",
            AgentPhase::Streaming => "streaming",
            AgentPhase::Decoded => "decoded",
            AgentPhase::Executing => "executing",
            AgentPhase::Executed => "executed",
            AgentPhase::Skipped => "skipped",
            AgentPhase::Completed => "completed",
        }
    }
}

impl std::fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn log_phase(request_id: Uuid, phase: AgentPhase) {
    tracing::debug!(request_id = %request_id, phase = %phase, "Agent call transition");
}

/// Runs agent queries against one account.
///
/// Holds only immutable configuration and a shared HTTP client, so a single
/// instance can serve concurrent calls behind an `Arc`.
#[derive(Clone)]
pub struct AgentOrchestrator {
    config: AgentConfig,
    http: Arc<dyn HttpClient>,
    executor: SqlExecutor,
}

impl AgentOrchestrator {
    /// Create an orchestrator backed by reqwest.
    pub fn new(config: AgentConfig) -> Self {
        Self::with_http_client(config, Arc::new(ReqwestHttpClient::new()))
    }

    /// Create an orchestrator over any [`HttpClient`].
    pub fn with_http_client(config: AgentConfig, http: Arc<dyn HttpClient>) -> Self {
        let executor = SqlExecutor::new(&config, Arc::clone(&http));
        Self {
            config,
            http,
            executor,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Build the request body for `query` with a fresh correlation id.
    pub fn build_request(&self, query: &str) -> AgentRequest {
        AgentRequest::new(
            query,
            self.config.model.clone(),
            self.config.tools.clone(),
            self.config.tool_resources.clone(),
        )
    }

    /// Open the agent stream for `request`.
    ///
    /// Fails on connection errors and on any non-2xx status; the returned
    /// stream owns the response body.
    pub async fn open_stream(&self, request: &AgentRequest) -> CortexResult<PayloadStream> {
        let request_id = request.request_id();
        let url = self.config.agent_url(request_id);
        let context = || {
            ErrorContext::new("open agent stream")
                .with_component("agent")
                .with_correlation_id(request_id.to_string())
        };

        let body = serde_json::to_string(request)
            .map_err(|e| NetworkError::Other {
                message: format!("failed to encode agent request: {}", e),
            })
            .with_context(context)?;

        let mut headers = self.config.auth_headers();
        headers.insert("Accept".to_string(), "text/event-stream".to_string());

        let bytes = self
            .http
            .post_stream(&url, &body, &headers, self.config.stream_timeout)
            .await
            .map_err(|e| {
                let err = NetworkError::from_http(
                    e,
                    &url,
                    "agent stream",
                    self.config.stream_timeout_secs(),
                );
                tracing::warn!(request_id = %request_id, error = %err, "Agent stream rejected");
                err
            })
            .with_context(context)?;

        Ok(decode_stream(bytes))
    }

    /// Ask the agent `query` and execute any SQL it produces.
    ///
    /// Returns an error only when the stream cannot be opened or breaks
    /// mid-read. Malformed events are skipped and a failed statement is
    /// reported inside the result.
    pub async fn run_agent_query(&self, query: &str) -> CortexResult<AgentResult> {
        let request = self.build_request(query);
        let request_id = request.request_id();
        tracing::info!(request_id = %request_id, model = %self.config.model, "Running agent query");
        tracing::debug!(request_id = %request_id, query = %request.query(), "Agent query text");
        log_phase(request_id, AgentPhase::Built);

        let mut payloads = self.open_stream(&request).await?;
        log_phase(request_id, AgentPhase::Streaming);

        let mut accumulator = EventAccumulator::new();
        while let Some(item) = payloads.next().await {
            match item {
                Ok(payload) => accumulator.push_payload(&payload),
                Err(e) => {
                    let err = self.stream_error(e);
                    tracing::warn!(
                        request_id = %request_id,
                        payloads = accumulator.payloads_seen(),
                        error = %err,
                        "Agent stream broke"
                    );
                    return Err(err).with_context(|| {
                        ErrorContext::new("read agent stream")
                            .with_component("agent")
                            .with_correlation_id(request_id.to_string())
                    });
                }
            }
        }
        // Release the connection before the statement call.
        drop(payloads);

        tracing::debug!(
            request_id = %request_id,
            payloads = accumulator.payloads_seen(),
            ignored = accumulator.items_ignored(),
            "Agent stream finished"
        );
        log_phase(request_id, AgentPhase::Decoded);

        let mut result = accumulator.into_result();
        match result.sql.as_deref() {
            Some(sql) => {
                log_phase(request_id, AgentPhase::Executing);
                let execution = self.executor.execute(sql, Uuid::new_v4()).await;
                result.execution_result = Some(execution);
                log_phase(request_id, AgentPhase::Executed);
            }
            None => log_phase(request_id, AgentPhase::Skipped),
        }

        log_phase(request_id, AgentPhase::Completed);
        tracing::info!(
            request_id = %request_id,
            text_len = result.text.len(),
            citations = result.citations.len(),
            has_sql = result.sql.is_some(),
            "Agent query complete"
        );
        Ok(result)
    }

    /// [`run_agent_query`](Self::run_agent_query), abandoned as soon as
    /// `cancel` resolves.
    ///
    /// The in-flight call is dropped, which closes its connection, and
    /// [`NetworkError::Cancelled`] is returned.
    pub async fn run_agent_query_with_cancel<F>(
        &self,
        query: &str,
        cancel: F,
    ) -> CortexResult<AgentResult>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.run_agent_query(query) => result,
            _ = cancel => {
                tracing::info!("Agent query cancelled");
                Err(NetworkError::Cancelled.into())
            }
        }
    }

    /// Execute a caller-supplied statement.
    pub async fn run_sql(&self, sql: &str) -> SqlExecutionResult {
        self.executor.execute(sql, Uuid::new_v4()).await
    }

    /// True when the statement endpoint accepts a trivial query.
    pub async fn health_check(&self) -> bool {
        let outcome = self.run_sql(HEALTH_CHECK_STATEMENT).await;
        if let SqlExecutionResult::Error { status, message } = &outcome {
            tracing::warn!(status = ?status, message = %message, "Health check failed");
        }
        outcome.is_success()
    }

    fn stream_error(&self, err: HttpError) -> StreamError {
        match err {
            HttpError::Timeout(_) => StreamError::Timeout {
                duration_secs: self.config.stream_timeout_secs(),
            },
            other => StreamError::ConnectionLost {
                message: other.to_string(),
            },
        }
    }
}

impl std::fmt::Debug for AgentOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockHttpClient, MockResponse};
    use crate::error::{CortexError, ErrorCategory};
    use crate::models::Citation;
    use crate::traits::Response;
    use bytes::Bytes;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    const BASE: &str = "https://acct.example.com";

    fn agent_prefix() -> String {
        format!("{}/api/v2/cortex/agent:run", BASE)
    }

    fn statements_prefix() -> String {
        format!("{}/api/v2/statements", BASE)
    }

    fn orchestrator(mock: &MockHttpClient) -> AgentOrchestrator {
        AgentOrchestrator::with_http_client(
            AgentConfig::new(BASE, "secret"),
            Arc::new(mock.clone()),
        )
    }

    fn sse(lines: &[&str]) -> Vec<Bytes> {
        lines
            .iter()
            .map(|line| Bytes::from(format!("{}\n\n", line)))
            .collect()
    }

    fn statement_ok() -> MockResponse {
        MockResponse::Success(Response::new(
            200,
            Bytes::from(r#"{"data":[["1"]]}"#),
        ))
    }

    #[tokio::test]
    async fn test_end_to_end_executes_sql_once() {
        let mock = MockHttpClient::new();
        mock.set_response(
            &agent_prefix(),
            MockResponse::Stream(sse(&[
                r#"data: {"delta":{"content":[{"type":"text","text":"Sales grew "}]}}"#,
                r#"data: {"delta":{"content":[{"type":"tool_results","tool_results":{"content":[{"type":"json","json":{"sql":"SELECT 1","text":"10%."}}]}}]}}"#,
                "data: [DONE]",
            ])),
        );
        mock.set_response(&statements_prefix(), statement_ok());

        let result = orchestrator(&mock)
            .run_agent_query("How did sales do?")
            .await
            .unwrap();

        assert_eq!(result.text, "Sales grew 10%.");
        assert_eq!(result.sql.as_deref(), Some("SELECT 1"));
        assert_eq!(
            result.execution_result,
            Some(SqlExecutionResult::Success {
                result: json!({"data": [["1"]]})
            })
        );

        let statements = mock.requests_to(&statements_prefix());
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0].json_body().unwrap()["statement"],
            json!("SELECT 1")
        );
    }

    #[tokio::test]
    async fn test_agent_request_shape() {
        let mock = MockHttpClient::new();
        mock.set_response(&agent_prefix(), MockResponse::Stream(sse(&["data: [DONE]"])));

        orchestrator(&mock).run_agent_query("Top regions?").await.unwrap();

        let requests = mock.requests_to(&agent_prefix());
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, "POST_STREAM");
        assert!(request.url.contains("?requestId="));
        assert_eq!(
            request.headers.get("Accept"),
            Some(&"text/event-stream".to_string())
        );
        assert_eq!(
            request.headers.get("X-Snowflake-Authorization-Token-Type"),
            Some(&"PROGRAMMATIC_ACCESS_TOKEN".to_string())
        );
        assert_eq!(request.timeout, Duration::from_secs(60));

        let body = request.json_body().unwrap();
        assert_eq!(body["model"], json!("claude-3-5-sonnet"));
        assert_eq!(body["messages"][0]["role"], json!("user"));
        assert_eq!(body["messages"][0]["content"][0]["text"], json!("Top regions?"));
        assert_eq!(
            body["tools"][0]["tool_spec"]["type"],
            json!("cortex_analyst_text_to_sql")
        );
    }

    #[tokio::test]
    async fn test_correlation_ids_differ_per_call() {
        let mock = MockHttpClient::new();
        mock.set_response(&agent_prefix(), MockResponse::Stream(sse(&["data: [DONE]"])));

        let agent = orchestrator(&mock);
        agent.run_agent_query("one").await.unwrap();
        agent.run_agent_query("two").await.unwrap();

        let requests = mock.requests_to(&agent_prefix());
        assert_eq!(requests.len(), 2);
        assert_ne!(requests[0].url, requests[1].url);
    }

    #[tokio::test]
    async fn test_http_500_is_fatal_and_skips_executor() {
        let mock = MockHttpClient::new();
        mock.set_response(
            &agent_prefix(),
            MockResponse::Success(Response::new(500, Bytes::from("internal error"))),
        );
        mock.set_response(&statements_prefix(), statement_ok());

        let err = orchestrator(&mock)
            .run_agent_query("anything")
            .await
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Server);
        assert!(matches!(
            err.inner(),
            CortexError::Network(NetworkError::HttpStatus { status: 500, .. })
        ));
        assert!(err.context().unwrap().correlation_id.is_some());
        assert!(mock.requests_to(&statements_prefix()).is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_is_auth_category() {
        let mock = MockHttpClient::new();
        mock.set_response(
            &agent_prefix(),
            MockResponse::Success(Response::new(401, Bytes::from("bad token"))),
        );

        let err = orchestrator(&mock).run_agent_query("q").await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Auth);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_connection_failure_is_fatal() {
        let mock = MockHttpClient::new();
        mock.set_response(
            &agent_prefix(),
            MockResponse::Error(HttpError::ConnectionFailed("refused".to_string())),
        );

        let err = orchestrator(&mock).run_agent_query("q").await.unwrap_err();
        assert!(matches!(
            err.inner(),
            CortexError::Network(NetworkError::ConnectionFailed { .. })
        ));
        assert_eq!(err.category(), ErrorCategory::Network);
    }

    #[tokio::test]
    async fn test_broken_stream_discards_partial_result() {
        let mock = MockHttpClient::new();
        mock.set_response(
            &agent_prefix(),
            MockResponse::StreamThenError(
                sse(&[r#"data: {"delta":{"content":[{"type":"tool_results","tool_results":{"content":[{"type":"json","json":{"sql":"SELECT 1"}}]}}]}}"#]),
                HttpError::Io("connection reset".to_string()),
            ),
        );
        mock.set_response(&statements_prefix(), statement_ok());

        let err = orchestrator(&mock).run_agent_query("q").await.unwrap_err();
        assert!(matches!(
            err.inner(),
            CortexError::Stream(StreamError::ConnectionLost { .. })
        ));
        assert!(mock.requests_to(&statements_prefix()).is_empty());
    }

    #[tokio::test]
    async fn test_stream_timeout_maps_to_stream_error() {
        let mock = MockHttpClient::new();
        mock.set_response(
            &agent_prefix(),
            MockResponse::StreamThenError(vec![], HttpError::Timeout("body".to_string())),
        );

        let err = orchestrator(&mock).run_agent_query("q").await.unwrap_err();
        assert!(matches!(
            err.inner(),
            CortexError::Stream(StreamError::Timeout { duration_secs: 60 })
        ));
    }

    #[tokio::test]
    async fn test_no_sql_skips_execution() {
        let mock = MockHttpClient::new();
        mock.set_response(
            &agent_prefix(),
            MockResponse::Stream(sse(&[
                r#"data: {"delta":{"content":[{"type":"text","text":"No query needed."}]}}"#,
                r#"data: {"delta":{"content":[{"type":"tool_results","tool_results":{"content":[{"type":"json","json":{"searchResults":[{"source_id":"s1","doc_id":"d1"}]}}]}}]}}"#,
            ])),
        );

        let result = orchestrator(&mock).run_agent_query("q").await.unwrap();
        assert_eq!(result.text, "No query needed.");
        assert_eq!(result.citations, vec![Citation::new("s1", "d1")]);
        assert_eq!(result.sql, None);
        assert_eq!(result.execution_result, None);
        assert!(mock.requests_to(&statements_prefix()).is_empty());
    }

    #[tokio::test]
    async fn test_failed_statement_is_captured_not_raised() {
        let mock = MockHttpClient::new();
        mock.set_response(
            &agent_prefix(),
            MockResponse::Stream(sse(&[
                r#"data: {"delta":{"content":[{"type":"tool_results","tool_results":{"content":[{"type":"json","json":{"sql":"SELECT nope"}}]}}]}}"#,
            ])),
        );
        mock.set_response(
            &statements_prefix(),
            MockResponse::Success(Response::new(422, Bytes::from("invalid identifier"))),
        );

        let result = orchestrator(&mock).run_agent_query("q").await.unwrap();
        assert_eq!(
            result.execution_result,
            Some(SqlExecutionResult::Error {
                status: Some(422),
                message: "invalid identifier".to_string(),
            })
        );
    }

    /// Sets its flag when the body stream that owns it is dropped.
    struct BodyGuard(Arc<AtomicBool>);

    impl Drop for BodyGuard {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// How the scripted body ends after its chunks.
    #[derive(Clone, Copy)]
    enum BodyEnd {
        Complete,
        Stall,
        Fail,
        Rejected,
    }

    /// Serves one scripted agent body and tracks when it is released.
    struct ScriptedBodyClient {
        chunks: Vec<Bytes>,
        end: BodyEnd,
        released: Arc<AtomicBool>,
        released_before_statement: Arc<AtomicBool>,
    }

    impl ScriptedBodyClient {
        fn new(chunks: Vec<Bytes>, end: BodyEnd) -> Arc<Self> {
            Arc::new(Self {
                chunks,
                end,
                released: Arc::new(AtomicBool::new(false)),
                released_before_statement: Arc::new(AtomicBool::new(false)),
            })
        }

        fn released(&self) -> bool {
            self.released.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl HttpClient for ScriptedBodyClient {
        async fn post(
            &self,
            _url: &str,
            _body: &str,
            _headers: &crate::traits::Headers,
            _timeout: Duration,
        ) -> Result<Response, HttpError> {
            self.released_before_statement
                .store(self.released(), Ordering::SeqCst);
            Ok(Response::new(200, Bytes::from("{}")))
        }

        async fn post_stream(
            &self,
            _url: &str,
            _body: &str,
            _headers: &crate::traits::Headers,
            _timeout: Duration,
        ) -> Result<crate::traits::ByteStream, HttpError> {
            let guard = BodyGuard(self.released.clone());
            let head = futures::stream::iter(self.chunks.clone().into_iter().map(Ok::<Bytes, HttpError>));
            let tail: crate::traits::ByteStream = match self.end {
                BodyEnd::Complete => Box::pin(futures::stream::empty()),
                BodyEnd::Stall => Box::pin(futures::stream::pending()),
                BodyEnd::Fail => Box::pin(futures::stream::iter(vec![Err(
                    HttpError::ConnectionFailed("reset by peer".to_string()),
                )])),
                BodyEnd::Rejected => {
                    drop(guard);
                    return Err(HttpError::ServerError {
                        status: 503,
                        message: "unavailable".to_string(),
                    });
                }
            };
            Ok(Box::pin(head.chain(tail).map(move |item| {
                let _owned = &guard;
                item
            })))
        }
    }

    fn scripted_agent(client: &Arc<ScriptedBodyClient>) -> AgentOrchestrator {
        AgentOrchestrator::with_http_client(AgentConfig::new(BASE, "secret"), client.clone())
    }

    #[tokio::test]
    async fn test_cancel_interrupts_stalled_stream() {
        let client = ScriptedBodyClient::new(
            sse(&[r#"data: {"delta":{"content":[{"type":"text","text":"partial"}]}}"#]),
            BodyEnd::Stall,
        );

        let err = scripted_agent(&client)
            .run_agent_query_with_cancel("q", tokio::time::sleep(Duration::from_millis(20)))
            .await
            .unwrap_err();

        assert!(matches!(err, CortexError::Network(NetworkError::Cancelled)));
        assert!(!err.is_retryable());
        assert!(client.released());
    }

    #[tokio::test]
    async fn test_body_released_when_stream_breaks() {
        let client = ScriptedBodyClient::new(
            sse(&[r#"data: {"delta":{"content":[{"type":"text","text":"partial"}]}}"#]),
            BodyEnd::Fail,
        );

        let err = scripted_agent(&client).run_agent_query("q").await.unwrap_err();

        assert!(matches!(
            err.inner(),
            CortexError::Stream(StreamError::ConnectionLost { .. })
        ));
        assert!(client.released());
    }

    #[tokio::test]
    async fn test_body_released_when_stream_rejected() {
        let client = ScriptedBodyClient::new(vec![], BodyEnd::Rejected);

        let err = scripted_agent(&client).run_agent_query("q").await.unwrap_err();

        assert!(matches!(
            err.inner(),
            CortexError::Network(NetworkError::HttpStatus { status: 503, .. })
        ));
        assert!(client.released());
        assert!(!client.released_before_statement.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_body_released_before_statement_call() {
        let client = ScriptedBodyClient::new(
            sse(&[
                r#"data: {"delta":{"content":[{"type":"tool_results","tool_results":{"content":[{"type":"json","json":{"sql":"SELECT 1"}}]}}]}}"#,
            ]),
            BodyEnd::Complete,
        );

        let result = scripted_agent(&client).run_agent_query("q").await.unwrap();

        assert!(result.execution_result.is_some());
        assert!(client.released_before_statement.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_unfired_cancel_leaves_result_intact() {
        let mock = MockHttpClient::new();
        mock.set_response(
            &agent_prefix(),
            MockResponse::Stream(sse(&[r#"data: {"delta":{"content":[{"type":"text","text":"ok"}]}}"#])),
        );

        let result = orchestrator(&mock)
            .run_agent_query_with_cancel("q", futures::future::pending::<()>())
            .await
            .unwrap();
        assert_eq!(result.text, "ok");
    }

    #[tokio::test]
    async fn test_run_sql_and_health_check() {
        let mock = MockHttpClient::new();
        mock.set_response(&statements_prefix(), statement_ok());
        let agent = orchestrator(&mock);

        assert!(agent.run_sql("SELECT 1;").await.is_success());
        assert!(agent.health_check().await);

        let statements = mock.requests_to(&statements_prefix());
        assert_eq!(
            statements[1].json_body().unwrap()["statement"],
            json!(HEALTH_CHECK_STATEMENT)
        );
    }

    #[tokio::test]
    async fn test_health_check_false_on_rejection() {
        let mock = MockHttpClient::new();
        mock.set_response(
            &statements_prefix(),
            MockResponse::Success(Response::new(403, Bytes::from("forbidden"))),
        );
        assert!(!orchestrator(&mock).health_check().await);
    }

    #[test]
    fn test_orchestrator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AgentOrchestrator>();
    }
}
