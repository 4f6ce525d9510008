//! Agent configuration.
//!
//! Everything an agent call needs besides the query itself: endpoint,
//! credentials, model, tools and deadlines. Built once per process and
//! handed to [`AgentOrchestrator`](crate::agent::AgentOrchestrator).
//!
//! # Example
//!
//! ```ignore
//! use cortex_agent::config::AgentConfig;
//!
//! let config = AgentConfig::new("https://acct.snowflakecomputing.com", token)
//!     .with_semantic_model("@SALES.PUBLIC.MODELS/sales.yaml")
//!     .with_search_service("SALES.PUBLIC.DOCS_SEARCH");
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

use crate::error::ConfigError;
use crate::models::{ToolDeclaration, ToolKind, ToolResource};
use crate::traits::Headers;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet";

/// Deadline for each outbound call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Name of the default text-to-SQL tool.
pub const ANALYST_TOOL: &str = "Analyst";

/// Name of the search tool added by [`AgentConfig::with_search_service`].
pub const SEARCH_TOOL: &str = "Search";

pub const TOKEN_TYPE_HEADER: &str = "X-Snowflake-Authorization-Token-Type";
pub const TOKEN_TYPE: &str = "PROGRAMMATIC_ACCESS_TOKEN";

pub const AGENT_RUN_PATH: &str = "/api/v2/cortex/agent:run";
pub const STATEMENTS_PATH: &str = "/api/v2/statements";

/// Optional session context sent with every statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatementContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Process-wide configuration for agent calls.
#[derive(Clone)]
pub struct AgentConfig {
    /// Account URL without trailing slash
    pub base_url: String,
    access_token: String,
    pub model: String,
    pub tools: Vec<ToolDeclaration>,
    pub tool_resources: BTreeMap<String, ToolResource>,
    /// Deadline for opening and draining the agent stream
    pub stream_timeout: Duration,
    /// Deadline for the statement call; also sent as the server-side timeout
    pub statement_timeout: Duration,
    pub statement_context: StatementContext,
}

impl AgentConfig {
    /// Create a config with the default model and a single text-to-SQL tool.
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            model: DEFAULT_MODEL.to_string(),
            tools: vec![ToolDeclaration::new(ToolKind::TextToSql, ANALYST_TOOL)],
            tool_resources: BTreeMap::new(),
            stream_timeout: DEFAULT_TIMEOUT,
            statement_timeout: DEFAULT_TIMEOUT,
            statement_context: StatementContext::default(),
        }
    }

    /// Set the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the text-to-SQL tool at a staged semantic model file.
    pub fn with_semantic_model(mut self, file: impl Into<String>) -> Self {
        self.declare_tool(ToolKind::TextToSql, ANALYST_TOOL);
        self.tool_resources.insert(
            ANALYST_TOOL.to_string(),
            ToolResource::SemanticModel {
                semantic_model_file: file.into(),
            },
        );
        self
    }

    /// Declare a search tool backed by the named search service.
    pub fn with_search_service(mut self, service: impl Into<String>) -> Self {
        self.declare_tool(ToolKind::Search, SEARCH_TOOL);
        self.tool_resources.insert(
            SEARCH_TOOL.to_string(),
            ToolResource::SearchService {
                name: service.into(),
                max_results: None,
            },
        );
        self
    }

    /// Add an arbitrary tool declaration, replacing one with the same name.
    pub fn with_tool(mut self, tool: ToolDeclaration) -> Self {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
        self
    }

    /// Set the deadline for the agent stream.
    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    /// Set the deadline for statement execution.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Set the warehouse/database/schema/role sent with statements.
    pub fn with_statement_context(mut self, context: StatementContext) -> Self {
        self.statement_context = context;
        self
    }

    fn declare_tool(&mut self, kind: ToolKind, name: &str) {
        if !self.tools.iter().any(|t| t.name() == name) {
            self.tools.push(ToolDeclaration::new(kind, name));
        }
    }

    /// Build the config from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any variable source.
    ///
    /// Required: `SNOWFLAKE_ACCOUNT_URL`, `SNOWFLAKE_PAT`. Optional:
    /// `CORTEX_AGENT_MODEL`, `CORTEX_SEMANTIC_MODEL_FILE`,
    /// `CORTEX_SEARCH_SERVICE`, `CORTEX_TIMEOUT_SECS`, and
    /// `SNOWFLAKE_{WAREHOUSE,DATABASE,SCHEMA,ROLE}`. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = var("SNOWFLAKE_ACCOUNT_URL")
            .ok_or(ConfigError::MissingVar("SNOWFLAKE_ACCOUNT_URL"))?;
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                name: "SNOWFLAKE_ACCOUNT_URL",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        let token = var("SNOWFLAKE_PAT").ok_or(ConfigError::MissingVar("SNOWFLAKE_PAT"))?;

        let mut config = Self::new(base_url, token);

        if let Some(model) = var("CORTEX_AGENT_MODEL") {
            config = config.with_model(model);
        }
        if let Some(file) = var("CORTEX_SEMANTIC_MODEL_FILE") {
            config = config.with_semantic_model(file);
        }
        if let Some(service) = var("CORTEX_SEARCH_SERVICE") {
            config = config.with_search_service(service);
        }
        if let Some(raw) = var("CORTEX_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "CORTEX_TIMEOUT_SECS",
                reason: format!("'{}' is not a whole number of seconds", raw),
            })?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    name: "CORTEX_TIMEOUT_SECS",
                    reason: "must be at least 1 second".to_string(),
                });
            }
            let timeout = Duration::from_secs(secs);
            config = config
                .with_stream_timeout(timeout)
                .with_statement_timeout(timeout);
        }

        Ok(config.with_statement_context(StatementContext {
            warehouse: var("SNOWFLAKE_WAREHOUSE"),
            database: var("SNOWFLAKE_DATABASE"),
            schema: var("SNOWFLAKE_SCHEMA"),
            role: var("SNOWFLAKE_ROLE"),
        }))
    }

    /// Authentication and content headers shared by both endpoints.
    pub fn auth_headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.access_token),
        );
        headers.insert(TOKEN_TYPE_HEADER.to_string(), TOKEN_TYPE.to_string());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers
    }

    /// Statement timeout in whole seconds for the request body.
    ///
    /// Rounded up and never below one: the endpoint reads `0` as "use the
    /// maximum".
    pub fn statement_timeout_secs(&self) -> u64 {
        whole_seconds(self.statement_timeout)
    }

    /// Stream timeout in whole seconds, for error reporting.
    pub fn stream_timeout_secs(&self) -> u64 {
        whole_seconds(self.stream_timeout)
    }

    pub fn agent_url(&self, request_id: Uuid) -> String {
        format!("{}{}?requestId={}", self.base_url, AGENT_RUN_PATH, request_id)
    }

    pub fn statements_url(&self, request_id: Uuid) -> String {
        format!("{}{}?requestId={}", self.base_url, STATEMENTS_PATH, request_id)
    }
}

fn whole_seconds(timeout: Duration) -> u64 {
    let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
    secs.max(1)
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .field("model", &self.model)
            .field("tools", &self.tools)
            .field("tool_resources", &self.tool_resources)
            .field("stream_timeout", &self.stream_timeout)
            .field("statement_timeout", &self.statement_timeout)
            .field("statement_context", &self.statement_context)
            .finish()
    }
}
