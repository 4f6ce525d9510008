mod request;
mod result;

pub use request::{
    AgentMessage, AgentRequest, MessageContent, ToolDeclaration, ToolKind, ToolResource, ToolSpec,
};
pub use result::{AgentResult, Citation, SqlExecutionResult};
