//! The agent loop.
//!
//! One run is an explicit state machine:
//!
//! ```text
//!            ┌──────────── ToolSelected ◄──┐
//!            ▼                             │
//!   ──► Reasoning ──► model call ──► classify ──► FinalAnswer ──► done
//!            ▲                             │
//!            └───────────── ParseError ◄───┘
//! ```
//!
//! Every `ToolSelected` pass consumes one step of `max_iterations`; every
//! `ParseError` pass consumes one of `max_parse_retries`. Both budgets are
//! finite, so a run always ends: with an answer, with one of the two budget
//! errors, or with a fatal model/tool failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::model::{Backend, ModelError, ModelOutput, ModelRequest, ModelResponse, ToolCall, Usage};
use crate::prompt::{DEFAULT_SYSTEM_PROMPT, PromptAssembler};
use crate::scratchpad::{Observation, Scratchpad, Step};
use crate::tools::{ToolError, ToolRegistry};
use crate::{AgentError, Result};

/// Bounds and timeouts for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Tool steps allowed before giving up.
    pub max_iterations: u32,
    /// Corrective retries allowed for unparseable model output.
    pub max_parse_retries: u32,
    pub model_timeout: Duration,
    pub tool_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            max_parse_retries: 3,
            model_timeout: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(30),
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct Run {
    pub id: Uuid,
    pub query: String,
    pub result: Result<String>,
    /// Empty when the run was cancelled.
    pub transcript: Scratchpad,
    pub usage: Usage,
    /// Tool steps taken.
    pub steps: u32,
}

impl Run {
    pub fn answer(&self) -> Option<&str> {
        self.result.as_deref().ok()
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Where the state machine goes next.
enum State {
    Reasoning,
    ToolSelected {
        thought: Option<String>,
        calls: Vec<ToolCall>,
    },
    ParseError {
        raw: String,
        reason: String,
    },
    FinalAnswer(String),
}

impl From<ModelOutput> for State {
    fn from(output: ModelOutput) -> Self {
        match output {
            ModelOutput::ToolCalls { thought, calls } if calls.is_empty() => Self::ParseError {
                raw: thought.unwrap_or_default(),
                reason: "tool call list is empty".into(),
            },
            ModelOutput::ToolCalls { thought, calls } => Self::ToolSelected { thought, calls },
            ModelOutput::FinalAnswer(text) if text.trim().is_empty() => Self::ParseError {
                raw: text,
                reason: "empty response".into(),
            },
            ModelOutput::FinalAnswer(text) => Self::FinalAnswer(text),
            ModelOutput::Unparseable { raw, reason } => Self::ParseError { raw, reason },
        }
    }
}

/// Counters and transcript owned by exactly one run.
#[derive(Default)]
struct RunState {
    scratchpad: Scratchpad,
    steps: u32,
    parse_retries: u32,
    usage: Usage,
}

/// A tool-calling agent.
///
/// Holds no per-run state: share it behind an `Arc` and run as many
/// queries concurrently as needed.
pub struct Agent<B> {
    backend: B,
    tools: Arc<ToolRegistry>,
    prompt: PromptAssembler,
    config: AgentConfig,
}

impl<B: Backend> Agent<B> {
    pub fn new(backend: B, tools: impl Into<Arc<ToolRegistry>>) -> Self {
        Self::builder(backend, tools).build()
    }

    pub fn builder(backend: B, tools: impl Into<Arc<ToolRegistry>>) -> AgentBuilder<B> {
        AgentBuilder::new(backend, tools.into())
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Answer `query`, or say why not.
    pub async fn answer(&self, query: &str) -> Result<String> {
        self.run(query).await.result
    }

    /// Run `query` to completion.
    pub async fn run(&self, query: &str) -> Run {
        self.run_until(query, std::future::pending()).await
    }

    /// Run `query` until it finishes or `cancel` resolves.
    ///
    /// On cancellation the in-flight model or tool call is dropped and the
    /// partial transcript is discarded.
    pub async fn run_until<F>(&self, query: &str, cancel: F) -> Run
    where
        F: Future<Output = ()>,
    {
        let id = Uuid::new_v4();
        let span = info_span!("agent_run", run_id = %id);
        let mut state = RunState::default();

        let mut cancelled = false;
        let result = {
            let drive = self.drive(query, &mut state).instrument(span.clone());
            tokio::select! {
                result = drive => result,
                () = cancel => {
                    cancelled = true;
                    Err(AgentError::Cancelled)
                }
            }
        };

        if cancelled {
            state = RunState::default();
        }

        span.in_scope(|| match &result {
            Ok(_) => info!(steps = state.steps, tokens = state.usage.total_tokens(), "run finished"),
            Err(err) => error!(kind = %err.kind(), error = %err, "run failed"),
        });

        Run {
            id,
            query: query.to_string(),
            result,
            transcript: state.scratchpad,
            usage: state.usage,
            steps: state.steps,
        }
    }

    async fn drive(&self, query: &str, state: &mut RunState) -> Result<String> {
        let specs = self.tools.describe_all();
        let mut next = State::Reasoning;

        loop {
            next = match next {
                State::Reasoning => {
                    if state.steps >= self.config.max_iterations {
                        return Err(AgentError::MaxIterationsExceeded(self.config.max_iterations));
                    }
                    debug!(
                        step = state.steps,
                        parse_retries = state.parse_retries,
                        "reasoning"
                    );
                    let request = self.prompt.build(query, &state.scratchpad, &specs);
                    let response = self.call_model(request).await?;
                    state.usage += response.usage;
                    State::from(response.output)
                }

                State::ParseError { raw, reason } => {
                    if state.parse_retries >= self.config.max_parse_retries {
                        return Err(AgentError::Parsing {
                            retries: state.parse_retries,
                            reason,
                        });
                    }
                    state.parse_retries += 1;
                    warn!(retry = state.parse_retries, %reason, "unparseable model output");
                    state.scratchpad.push(Step::correction(raw, reason));
                    State::Reasoning
                }

                State::ToolSelected { mut thought, calls } => {
                    state.steps += 1;
                    for call in calls {
                        let observation = self.execute(&call).await?;
                        state.scratchpad.push(Step::Tool {
                            thought: thought.take(),
                            call,
                            observation,
                        });
                    }
                    State::Reasoning
                }

                State::FinalAnswer(answer) => return Ok(answer),
            };
        }
    }

    async fn call_model(&self, request: ModelRequest) -> Result<ModelResponse> {
        let timeout = self.config.model_timeout;
        match tokio::time::timeout(timeout, self.backend.call(request)).await {
            Ok(response) => Ok(response?),
            Err(_) => Err(ModelError::Timeout(timeout).into()),
        }
    }

    /// Execute one call, turning recoverable failures into observations.
    async fn execute(&self, call: &ToolCall) -> Result<Observation> {
        info!(tool = %call.name, "calling tool");

        match self.tools.invoke(call, self.config.tool_timeout).await {
            Ok(output) => Ok(Observation::success(output)),
            Err(err) if err.is_fatal() => Err(AgentError::ToolExecutionFatal {
                tool: call.name.clone(),
                source: err,
            }),
            Err(ToolError::NotFound(name)) => {
                debug!(tool = %name, "model asked for an unknown tool");
                Ok(Observation::failure(format!(
                    "unknown tool: `{name}` does not exist. Available tools: {}",
                    self.tools.names().join(", ")
                )))
            }
            Err(err) => {
                debug!(tool = %call.name, error = %err, "tool call failed");
                Ok(Observation::failure(format!("Error: {err}")))
            }
        }
    }
}

/// Builder for [`Agent`].
pub struct AgentBuilder<B> {
    backend: B,
    tools: Arc<ToolRegistry>,
    system_prompt: String,
    config: AgentConfig,
}

impl<B: Backend> AgentBuilder<B> {
    fn new(backend: B, tools: Arc<ToolRegistry>) -> Self {
        Self {
            backend,
            tools,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            config: AgentConfig::default(),
        }
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn max_parse_retries(mut self, max_parse_retries: u32) -> Self {
        self.config.max_parse_retries = max_parse_retries;
        self
    }

    pub fn model_timeout(mut self, timeout: Duration) -> Self {
        self.config.model_timeout = timeout;
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.config.tool_timeout = timeout;
        self
    }

    pub fn build(self) -> Agent<B> {
        Agent {
            backend: self.backend,
            tools: self.tools,
            prompt: PromptAssembler::new(self.system_prompt),
            config: self.config,
        }
    }
}
