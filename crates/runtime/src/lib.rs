//! Clerk runtime — a single-turn, tool-calling agent loop.
//!
//! This crate turns one user query into one answer by letting a language
//! model call tools until it is ready to reply.
//!
//! # Overview
//!
//! The runtime is organized around these concepts:
//!
//! - **Backend**: A trait abstracting LLM providers (Anthropic, Gemini, or a
//!   scripted backend for tests). Responses are classified as tool calls, a
//!   final answer, or unparseable output.
//! - **ToolRegistry**: The named tools a run may call, with their argument
//!   schemas and a uniform invocation path.
//! - **Agent**: The loop itself, bounded by a step budget and a separate
//!   corrective-retry budget for unparseable output.
//! - **Reporter**: Turns a finished [`Run`] into user-facing text.
//!
//! # Example
//!
//! ```ignore
//! use runtime::{Agent, Reporter};
//! use runtime::providers::AnthropicBackend;
//! use runtime::tools::ToolRegistry;
//!
//! # async fn example(tools: ToolRegistry) {
//! let backend = AnthropicBackend::builder("sk-ant-api01-...", "claude-sonnet-4-20250514").build();
//! let agent = Agent::new(backend, tools);
//!
//! let run = agent.run("What is 50€ plus 10% VAT?").await;
//! println!("{}", Reporter::new().report(&run).output);
//! # }
//! ```

mod agent;
mod error;
pub mod model;
mod prompt;
pub mod providers;
mod report;
mod scratchpad;
pub mod tools;

// Agent loop
pub use agent::{Agent, AgentBuilder, AgentConfig, Run};

// Error types
pub use error::{AgentError, ErrorKind, Result};

// Prompt assembly and transcript
pub use prompt::{DEFAULT_SYSTEM_PROMPT, PromptAssembler};
pub use scratchpad::{Observation, Scratchpad, Step};

// Reporting
pub use report::{Outcome, Report, Reporter};

// Providers
pub use providers::Provider;
