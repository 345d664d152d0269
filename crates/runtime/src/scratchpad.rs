//! The per-run transcript of tool calls and observations.

use crate::model::ToolCall;
use serde::Serialize;
use std::fmt;

/// The text fed back to the model after a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub text: String,
    pub is_error: bool,
}

impl Observation {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// One entry of the scratchpad.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// A tool call and what came back.
    Tool {
        thought: Option<String>,
        call: ToolCall,
        observation: Observation,
    },
    /// A model turn that could not be parsed, with the notice sent back.
    Correction {
        raw: String,
        reason: String,
        notice: String,
    },
}

impl Step {
    pub fn correction(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let notice = format!(
            "Your previous reply could not be used ({reason}). \
             Either call one of the available tools with valid JSON arguments, \
             or reply with the final answer as plain text."
        );
        Self::Correction {
            raw: raw.into(),
            reason,
            notice,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tool {
                thought,
                call,
                observation,
            } => {
                if let Some(thought) = thought {
                    writeln!(f, "thought: {thought}")?;
                }
                let args = serde_json::Value::Object(call.arguments.clone());
                writeln!(f, "call: {} {args}", call.name)?;
                let label = if observation.is_error { "error" } else { "result" };
                write!(f, "{label}: {}", observation.text)
            }
            Self::Correction { reason, .. } => write!(f, "unparseable output: {reason}"),
        }
    }
}

/// Append-only transcript owned by a single run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Scratchpad {
    steps: Vec<Step>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Only the tool steps, in order.
    pub fn tool_steps(&self) -> impl Iterator<Item = (&ToolCall, &Observation)> {
        self.steps.iter().filter_map(|step| match step {
            Step::Tool {
                call, observation, ..
            } => Some((call, observation)),
            Step::Correction { .. } => None,
        })
    }

    pub fn corrections(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, Step::Correction { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn grows_in_order() {
        let mut pad = Scratchpad::new();
        assert!(pad.is_empty());

        pad.push(Step::Tool {
            thought: None,
            call: ToolCall::new("1", "web_search", Map::new()),
            observation: Observation::success("found it"),
        });
        pad.push(Step::correction("{oops", "tool input is not a JSON object"));

        assert_eq!(pad.len(), 2);
        assert_eq!(pad.corrections(), 1);
        let tools: Vec<_> = pad.tool_steps().map(|(c, _)| c.name.as_str()).collect();
        assert_eq!(tools, ["web_search"]);
    }

    #[test]
    fn correction_notice_names_the_reason() {
        let Step::Correction { notice, .. } = Step::correction("", "empty response") else {
            panic!("expected a correction");
        };
        assert!(notice.contains("empty response"));
    }

    #[test]
    fn display_marks_errors() {
        let step = Step::Tool {
            thought: Some("need a price".into()),
            call: ToolCall::new("1", "tax_calculator", Map::new()),
            observation: Observation::failure("invalid input: negative price"),
        };
        let text = step.to_string();
        assert!(text.starts_with("thought: need a price"));
        assert!(text.contains("error: invalid input"));
    }
}
