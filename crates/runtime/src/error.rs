use crate::model::ModelError;
use crate::tools::ToolError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal failures of an agent run.
///
/// Unknown tools and bad tool arguments never show up here: the loop turns
/// them into observations and lets the model correct itself.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgentError {
    /// The model kept producing output that was neither a tool call nor an
    /// answer, past the corrective retry budget.
    #[error("model output still unparseable after {retries} corrective retries: {reason}")]
    Parsing { retries: u32, reason: String },

    #[error("no final answer after {0} tool steps")]
    MaxIterationsExceeded(u32),

    /// A tool hit an infrastructure failure.
    #[error("tool `{tool}` failed: {source}")]
    ToolExecutionFatal {
        tool: String,
        #[source]
        source: ToolError,
    },

    #[error("model unavailable: {0}")]
    ModelUnavailable(#[from] ModelError),

    #[error("run cancelled")]
    Cancelled,
}

impl AgentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parsing { .. } => ErrorKind::AgentParsingError,
            Self::MaxIterationsExceeded(_) => ErrorKind::MaxIterationsExceeded,
            Self::ToolExecutionFatal { .. } => ErrorKind::ToolExecutionFatalError,
            Self::ModelUnavailable(_) => ErrorKind::ModelUnavailable,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Stable classification codes for failures, safe to show to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownTool,
    InvalidArgument,
    AgentParsingError,
    MaxIterationsExceeded,
    ToolExecutionFatalError,
    ModelUnavailable,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownTool => "unknown_tool",
            Self::InvalidArgument => "invalid_argument",
            Self::AgentParsingError => "agent_parsing_error",
            Self::MaxIterationsExceeded => "max_iterations_exceeded",
            Self::ToolExecutionFatalError => "tool_execution_fatal_error",
            Self::ModelUnavailable => "model_unavailable",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
