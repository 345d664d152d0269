//! Scripted backend.

use super::{Backend, ModelError, ModelOutput, ModelRequest, ModelResponse};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A backend that replays a fixed list of outputs.
///
/// Every request is recorded so tests can inspect exactly what the agent
/// sent. Once the script runs out, `fallback` is returned for every further
/// call (or an API error when there is none).
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<ModelOutput>>,
    fallback: Option<ModelOutput>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedBackend {
    pub fn new(outputs: impl IntoIterator<Item = ModelOutput>) -> Self {
        Self {
            script: Mutex::new(outputs.into_iter().collect()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A backend that answers every call with the same output.
    pub fn repeating(output: ModelOutput) -> Self {
        Self::new([]).with_fallback(output)
    }

    pub fn with_fallback(mut self, output: ModelOutput) -> Self {
        self.fallback = Some(output);
        self
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Snapshot of every request received so far.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Backend for ScriptedBackend {
    async fn call(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let next = self
            .script
            .lock()
            .map_err(|_| ModelError::Api("script lock poisoned".into()))?
            .pop_front();

        next.or_else(|| self.fallback.clone())
            .map(ModelResponse::from)
            .ok_or_else(|| ModelError::Api("script exhausted".into()))
    }
}
