//! Recording finished runs in the event store.

use runtime::{Run, Step};
use serde_json::Value;
use storage::{Event, EventKind, RunId};

/// The audit trail of `run`, in the order things happened.
pub fn events(run: &Run) -> Vec<Event> {
    let id = RunId::from(run.id);
    let mut events = vec![Event::new(
        id,
        EventKind::RunStart {
            query: run.query.clone(),
        },
    )];

    for step in run.transcript.steps() {
        match step {
            Step::Tool {
                call, observation, ..
            } => {
                events.push(Event::new(
                    id,
                    EventKind::ToolCall {
                        name: call.name.clone(),
                        input: Value::Object(call.arguments.clone()),
                    },
                ));
                events.push(Event::new(
                    id,
                    EventKind::ToolResult {
                        name: call.name.clone(),
                        output: observation.text.clone(),
                        is_error: observation.is_error,
                    },
                ));
            }
            Step::Correction { reason, .. } => {
                events.push(Event::new(
                    id,
                    EventKind::Correction {
                        reason: reason.clone(),
                    },
                ));
            }
        }
    }

    let end = match &run.result {
        Ok(answer) => EventKind::Answer {
            text: answer.clone(),
        },
        Err(err) => EventKind::Failure {
            error_kind: err.kind().to_string(),
            detail: err.to_string(),
        },
    };
    events.push(Event::new(id, end));
    events
}
