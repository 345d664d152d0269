//! Tool registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::model::ToolCall;
use crate::tools::{RegistryError, Tool, ToolArgs, ToolError, ToolSpec};

/// The fixed set of tools an agent may call.
///
/// Built once at startup and read-only afterwards, so it can be shared
/// between concurrent runs behind an `Arc` without locking. Tools keep
/// their registration order, which is the order the model sees them in.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool. Names must be unique.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.spec().name.clone();
        if self.index.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn lookup(&self, name: &str) -> Result<&Arc<dyn Tool>, ToolError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// Specs of every tool, in registration order.
    pub fn describe_all(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec().clone()).collect()
    }

    /// Tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.spec().name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Resolve, bind and execute a tool call under `timeout`.
    pub async fn invoke(&self, call: &ToolCall, timeout: Duration) -> Result<String, ToolError> {
        let tool = self.lookup(&call.name)?;
        let args = ToolArgs::bind(tool.spec(), &call.arguments)?;

        tokio::time::timeout(timeout, tool.invoke(args))
            .await
            .map_err(|_| ToolError::Timeout(timeout.as_millis() as u64))?
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
