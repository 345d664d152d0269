//! Tool trait.

use crate::tools::{ToolArgs, ToolError, ToolSpec};
use async_trait::async_trait;

/// A capability the agent may invoke.
///
/// Implementations describe themselves through [`Tool::spec`] and receive
/// arguments already bound against that spec. This is the boundary between
/// the agent loop and side effects.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and input schema shown to the model.
    fn spec(&self) -> &ToolSpec;

    /// Execute the tool.
    async fn invoke(&self, args: ToolArgs) -> Result<String, ToolError>;
}
