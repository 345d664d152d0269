//! Prompt assembly.

use crate::model::{Message, ModelRequest, Part, Role, ToolResult};
use crate::scratchpad::{Scratchpad, Step};
use crate::tools::ToolSpec;

/// Default system directive.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert shopping assistant. \
You look up current prices and calculate taxes. \
Use the available tools when you need facts you do not know or exact arithmetic, \
one step at a time. When you have enough information, reply with the final answer \
as plain text, without calling a tool.";

// Stands in for an assistant turn that produced no text at all.
const EMPTY_TURN: &str = "(no output)";

/// Builds the request sent to the model on every iteration.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    system: String,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl PromptAssembler {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    /// Assemble the request for `query` given everything done so far.
    ///
    /// Tool specs go into the request exactly once. The scratchpad becomes
    /// alternating assistant/user turns after the query, one pair per step.
    pub fn build(&self, query: &str, scratchpad: &Scratchpad, tools: &[ToolSpec]) -> ModelRequest {
        let mut messages = Vec::with_capacity(1 + scratchpad.len() * 2);
        messages.push(Message::user(query));

        for step in scratchpad.steps() {
            match step {
                Step::Tool {
                    thought,
                    call,
                    observation,
                } => {
                    let mut parts = Vec::with_capacity(2);
                    if let Some(thought) = thought.as_ref().filter(|t| !t.trim().is_empty()) {
                        parts.push(Part::Text(thought.clone()));
                    }
                    parts.push(Part::ToolCall(call.clone()));
                    messages.push(Message::new(Role::Assistant, parts));

                    let result = if observation.is_error {
                        ToolResult::Failure {
                            tool_call_id: call.id.clone(),
                            error: observation.text.clone(),
                        }
                    } else {
                        ToolResult::Success {
                            tool_call_id: call.id.clone(),
                            output: observation.text.clone(),
                        }
                    };
                    messages.push(Message::new(Role::User, vec![Part::ToolResult(result)]));
                }
                Step::Correction { raw, notice, .. } => {
                    let raw = if raw.trim().is_empty() { EMPTY_TURN } else { raw.as_str() };
                    messages.push(Message::assistant(raw));
                    messages.push(Message::user(notice.clone()));
                }
            }
        }

        ModelRequest {
            system: self.system.clone(),
            messages,
            tools: tools.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToolCall;
    use crate::scratchpad::Observation;
    use crate::tools::ParamSpec;
    use serde_json::{Map, json};

    fn specs() -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("web_search", "Search the web")
                .param(ParamSpec::string("query", "Search terms").required()),
            ToolSpec::new("tax_calculator", "Compute VAT")
                .param(ParamSpec::number("net_price", "Net price").required()),
        ]
    }

    fn tax_step(id: &str, observation: Observation) -> Step {
        let args = json!({"net_price": 50, "rate": 10});
        Step::Tool {
            thought: Some("Apply 10% VAT".into()),
            call: ToolCall::new(id, "tax_calculator", args.as_object().cloned().unwrap_or_default()),
            observation,
        }
    }

    #[test]
    fn first_turn_is_just_the_query() {
        let request = PromptAssembler::default().build("price?", &Scratchpad::new(), &specs());

        assert_eq!(request.system, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(request.messages, vec![Message::user("price?")]);
        assert_eq!(request.tools, specs());
    }

    #[test]
    fn transcript_follows_scratchpad_order() {
        let mut pad = Scratchpad::new();
        pad.push(tax_step("a", Observation::success("Total: 55.00€")));
        pad.push(Step::correction("", "empty response"));
        pad.push(tax_step("b", Observation::failure("invalid input: bad")));

        let request = PromptAssembler::new("sys").build("q", &pad, &specs());
        let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
                Role::User
            ]
        );

        assert_eq!(request.messages[1].text(), "Apply 10% VAT");
        assert_eq!(request.messages[1].tool_calls()[0].id, "a");
        assert_eq!(request.messages[2].tool_results()[0].content(), "Total: 55.00€");
        assert_eq!(request.messages[3].text(), EMPTY_TURN);
        assert!(request.messages[4].text().contains("empty response"));
        assert!(request.messages[6].tool_results()[0].is_error());
    }

    #[test]
    fn tools_rendered_once_regardless_of_history() {
        let mut pad = Scratchpad::new();
        for i in 0..5 {
            pad.push(tax_step(&i.to_string(), Observation::success("ok")));
        }
        let request = PromptAssembler::default().build("q", &pad, &specs());
        assert_eq!(request.tools.len(), 2);
    }

    #[test]
    fn build_is_deterministic() {
        let mut pad = Scratchpad::new();
        pad.push(tax_step("a", Observation::success("ok")));
        let assembler = PromptAssembler::default();

        assert_eq!(
            assembler.build("q", &pad, &specs()),
            assembler.build("q", &pad, &specs())
        );
    }

    #[test]
    fn blank_thought_is_dropped() {
        let mut pad = Scratchpad::new();
        pad.push(Step::Tool {
            thought: Some("  ".into()),
            call: ToolCall::new("x", "web_search", Map::new()),
            observation: Observation::success("r"),
        });
        let request = PromptAssembler::default().build("q", &pad, &specs());
        assert_eq!(request.messages[1].parts.len(), 1);
    }
}
