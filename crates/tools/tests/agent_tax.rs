//! The tax calculator driven through the agent loop.

use runtime::model::{ModelOutput, ScriptedBackend, ToolCall};
use runtime::{Agent, Step};
use serde_json::{Map, Value, json};
use tools::ToolsConfig;

fn tax_call(arguments: Value) -> ModelOutput {
    let arguments: Map<String, Value> = arguments.as_object().cloned().unwrap_or_default();
    ModelOutput::tool_call(ToolCall::new("call_1", "tax_calculator", arguments))
}

fn tax_only() -> ToolsConfig {
    ToolsConfig::new().enabled(["tax_calculator"])
}

#[tokio::test]
async fn tax_question_takes_one_tool_step() {
    let backend = ScriptedBackend::new([
        tax_call(json!({"net_price": 50, "rate": 10})),
        ModelOutput::answer("Total: 55"),
    ]);
    let agent = Agent::new(backend, tax_only().build().unwrap());

    let run = agent.run("What is 50€ plus 10% VAT?").await;
    assert_eq!(run.answer(), Some("Total: 55"));
    assert_eq!(run.transcript.len(), 1);

    let Step::Tool { call, observation, .. } = &run.transcript.steps()[0] else {
        panic!("expected a tool step");
    };
    assert_eq!(call.name, "tax_calculator");
    assert!(!observation.is_error);
    assert_eq!(
        observation.text,
        "Net price: 50.00€, VAT (10%): 5.00€, Total: 55.00€"
    );
}

#[tokio::test]
async fn configured_default_rate_applies_when_omitted() {
    let backend = ScriptedBackend::new([
        tax_call(json!({"net_price": "1.200,00 €"})),
        ModelOutput::answer("done"),
    ]);
    let registry = tax_only().default_tax_rate(10.0).build().unwrap();
    let run = Agent::new(backend, registry).run("1.200 € with VAT?").await;

    let (_, observation) = run.transcript.tool_steps().next().unwrap();
    assert_eq!(
        observation.text,
        "Net price: 1200.00€, VAT (10%): 120.00€, Total: 1320.00€"
    );
}

#[tokio::test]
async fn negative_price_is_observed_not_fatal() {
    let backend = ScriptedBackend::new([
        tax_call(json!({"net_price": -5})),
        ModelOutput::answer("Prices cannot be negative."),
    ]);
    let run = Agent::new(backend, tax_only().build().unwrap())
        .run("-5€ with VAT?")
        .await;

    assert_eq!(run.answer(), Some("Prices cannot be negative."));
    let (_, observation) = run.transcript.tool_steps().next().unwrap();
    assert!(observation.is_error);
}
