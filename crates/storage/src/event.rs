//! Event types for the run history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for an agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RunId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of event that occurred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// A run started for this query.
    RunStart { query: String },
    /// The model asked for a tool.
    ToolCall {
        name: String,
        input: serde_json::Value,
    },
    /// What the tool call produced.
    ToolResult {
        name: String,
        output: String,
        #[serde(default)]
        is_error: bool,
    },
    /// Unparseable model output was sent back for correction.
    Correction { reason: String },
    /// The run ended with an answer.
    Answer { text: String },
    /// The run ended with an error.
    Failure { error_kind: String, detail: String },
}

impl EventKind {
    /// Name stored in the `kind` column; also the filter name for queries.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RunStart { .. } => "run_start",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Correction { .. } => "correction",
            Self::Answer { .. } => "answer",
            Self::Failure { .. } => "failure",
        }
    }
}

/// An event in the run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub run_id: RunId,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

impl Event {
    pub fn new(run_id: RunId, kind: EventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            timestamp: Utc::now(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_tag_matches_name() {
        let kinds = [
            EventKind::RunStart { query: "q".into() },
            EventKind::ToolCall {
                name: "tax_calculator".into(),
                input: json!({"net_price": 50}),
            },
            EventKind::ToolResult {
                name: "tax_calculator".into(),
                output: "Total: 55.00€".into(),
                is_error: false,
            },
            EventKind::Correction {
                reason: "empty response".into(),
            },
            EventKind::Answer { text: "55€".into() },
            EventKind::Failure {
                error_kind: "max_iterations_exceeded".into(),
                detail: "no final answer after 15 tool steps".into(),
            },
        ];

        for kind in kinds {
            let value = serde_json::to_value(&kind).unwrap();
            assert_eq!(value["kind"], kind.name());
        }
    }

    #[test]
    fn failure_round_trips_through_json() {
        let failure = EventKind::Failure {
            error_kind: "model_unavailable".into(),
            detail: "timed out".into(),
        };
        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["kind"], "failure");
        assert_eq!(value["error_kind"], "model_unavailable");
        assert_eq!(serde_json::from_value::<EventKind>(value).unwrap(), failure);
    }
}
