//! Turning finished runs into something a front end can show.

use crate::agent::Run;
use crate::error::ErrorKind;
use serde::Serialize;
use std::fmt::Write as _;

const FAILURE_NOTICE: &str = "Sorry, I could not complete that request.";

/// What to show for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Safe for the end user.
    pub output: String,
    /// Full error text; for logs and stderr only.
    pub diagnostic: Option<String>,
    pub kind: Option<ErrorKind>,
}

impl Report {
    pub fn is_failure(&self) -> bool {
        self.kind.is_some()
    }
}

/// The `{answer}` / `{error}` shape of a run, for machine-readable output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Answer { answer: String },
    Error { error: ErrorKind },
}

impl From<&Run> for Outcome {
    fn from(run: &Run) -> Self {
        match &run.result {
            Ok(answer) => Self::Answer {
                answer: answer.clone(),
            },
            Err(err) => Self::Error { error: err.kind() },
        }
    }
}

/// Renders [`Run`]s for display.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    show_transcript: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also render the tool transcript ahead of the answer.
    pub fn with_transcript(mut self, show: bool) -> Self {
        self.show_transcript = show;
        self
    }

    pub fn report(&self, run: &Run) -> Report {
        let mut output = String::new();
        if self.show_transcript && !run.transcript.is_empty() {
            for (i, step) in run.transcript.steps().iter().enumerate() {
                let _ = writeln!(output, "[{}] {}", i + 1, step.to_string().replace('\n', "\n    "));
            }
            output.push('\n');
        }

        match &run.result {
            Ok(answer) => {
                output.push_str(answer);
                Report {
                    output,
                    diagnostic: None,
                    kind: None,
                }
            }
            Err(err) => {
                let kind = err.kind();
                let _ = write!(output, "{FAILURE_NOTICE} (error: {kind})");
                Report {
                    output,
                    diagnostic: Some(format!("run {}: {err}", run.id)),
                    kind: Some(kind),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AgentError;
    use crate::model::{ToolCall, Usage};
    use crate::scratchpad::{Observation, Scratchpad, Step};
    use serde_json::Map;
    use uuid::Uuid;

    fn run(result: crate::Result<String>, transcript: Scratchpad) -> Run {
        Run {
            id: Uuid::nil(),
            query: "q".into(),
            result,
            transcript,
            usage: Usage::default(),
            steps: 0,
        }
    }

    fn one_step() -> Scratchpad {
        let mut pad = Scratchpad::new();
        pad.push(Step::Tool {
            thought: None,
            call: ToolCall::new("1", "tax_calculator", Map::new()),
            observation: Observation::success("Total: 55.00€"),
        });
        pad
    }

    #[test]
    fn success_is_the_answer_unchanged() {
        let report = Reporter::new().report(&run(Ok("Total: 55".into()), one_step()));
        assert_eq!(report.output, "Total: 55");
        assert!(!report.is_failure());
        assert_eq!(report.diagnostic, None);
    }

    #[test]
    fn empty_transcript_is_not_rendered() {
        let report = Reporter::new()
            .with_transcript(true)
            .report(&run(Ok("42".into()), Scratchpad::new()));
        assert_eq!(report.output, "42");
    }

    #[test]
    fn transcript_precedes_answer() {
        let report = Reporter::new()
            .with_transcript(true)
            .report(&run(Ok("Total: 55".into()), one_step()));
        assert!(report.output.starts_with("[1] call: tax_calculator"));
        assert!(report.output.ends_with("\nTotal: 55"));
    }

    #[test]
    fn failure_hides_internals_from_the_user() {
        let err = AgentError::Parsing {
            retries: 3,
            reason: "tool input is not a JSON object: [1,2]".into(),
        };
        let report = Reporter::new().report(&run(Err(err), Scratchpad::new()));

        assert_eq!(
            report.output,
            "Sorry, I could not complete that request. (error: agent_parsing_error)"
        );
        assert_eq!(report.kind, Some(ErrorKind::AgentParsingError));
        assert!(report.diagnostic.unwrap().contains("JSON object"));
    }

    #[test]
    fn outcome_json_shape() {
        let ok = Outcome::from(&run(Ok("hi".into()), Scratchpad::new()));
        let failed = Outcome::from(&run(Err(AgentError::MaxIterationsExceeded(3)), Scratchpad::new()));

        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"answer":"hi"}"#);
        assert_eq!(
            serde_json::to_string(&failed).unwrap(),
            r#"{"error":"max_iterations_exceeded"}"#
        );
    }
}
