//! LLM protocol types and backend trait.

pub mod errors;
mod scripted;
pub mod types;

pub use errors::ModelError;
pub use scripted::ScriptedBackend;
pub use types::{
    Backend, Message, ModelOutput, ModelRequest, ModelResponse, Part, Role, ToolCall, ToolResult,
    Usage,
};
