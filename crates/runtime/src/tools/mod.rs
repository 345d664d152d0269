//! Tool definitions and the registry the agent calls through.

pub mod errors;
mod registry;
mod tool;
pub mod types;

pub use errors::{RegistryError, ToolError};
pub use registry::ToolRegistry;
pub use tool::Tool;
pub use types::{ParamKind, ParamSpec, ToolArgs, ToolSpec};
