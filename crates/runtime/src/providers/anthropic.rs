//! Anthropic API backend.

use crate::model::{
    Backend, Message, ModelError, ModelOutput, ModelRequest, ModelResponse, Part, Role, ToolCall,
    Usage,
};
use crate::tools::ToolSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: ApiContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Blocks(Vec<ApiContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an Anthropic backend.
#[derive(Debug, Clone)]
pub struct AnthropicBackendBuilder {
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl AnthropicBackendBuilder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4096,
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Point the backend at a different endpoint (proxies, gateways).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn build(self) -> AnthropicBackend {
        AnthropicBackend {
            client: reqwest::Client::new(),
            api_key: self.api_key,
            model: self.model,
            max_tokens: self.max_tokens,
            url: self.base_url,
        }
    }
}

/// Anthropic Messages API backend.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    url: String,
}

impl AnthropicBackend {
    pub fn builder(api_key: impl Into<String>, model: impl Into<String>) -> AnthropicBackendBuilder {
        AnthropicBackendBuilder::new(api_key, model)
    }

    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    fn message_to_api(msg: &Message) -> ApiMessage {
        let role = Self::role_to_api(msg.role);

        // Simple case: single text part
        if let [Part::Text(text)] = msg.parts.as_slice() {
            return ApiMessage {
                role,
                content: ApiContent::Text(text.clone()),
            };
        }

        let blocks: Vec<ApiContentBlock> = msg
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => ApiContentBlock::Text { text: text.clone() },
                Part::ToolCall(call) => ApiContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: Value::Object(call.arguments.clone()),
                },
                Part::ToolResult(result) => ApiContentBlock::ToolResult {
                    tool_use_id: result.tool_call_id().to_string(),
                    content: result.content().to_string(),
                    is_error: result.is_error(),
                },
            })
            .collect();

        ApiMessage {
            role,
            content: ApiContent::Blocks(blocks),
        }
    }

    fn tool_to_api(spec: &ToolSpec) -> ApiTool {
        ApiTool {
            name: spec.name.clone(),
            description: spec.description.clone(),
            input_schema: spec.input_schema(),
        }
    }

    /// Classify the response blocks into the three-way model output.
    fn response_to_output(blocks: Vec<ApiResponseBlock>, stop_reason: Option<&str>) -> ModelOutput {
        let mut text = String::new();
        let mut calls = Vec::new();

        for block in blocks {
            match block {
                ApiResponseBlock::Text { text: t } => text.push_str(&t),
                ApiResponseBlock::ToolUse { id, name, input } => match input {
                    Value::Object(arguments) => calls.push(ToolCall { id, name, arguments }),
                    other => {
                        return ModelOutput::unparseable(
                            other.to_string(),
                            format!("input for tool `{name}` is not a JSON object"),
                        );
                    }
                },
                ApiResponseBlock::Unknown => {}
            }
        }

        if stop_reason == Some("max_tokens") {
            return ModelOutput::unparseable(text, "response was cut off at max_tokens");
        }

        if !calls.is_empty() {
            let thought = (!text.trim().is_empty()).then_some(text);
            return ModelOutput::ToolCalls { thought, calls };
        }

        if text.trim().is_empty() {
            return ModelOutput::unparseable(text, "empty response");
        }

        ModelOutput::FinalAnswer(text)
    }
}

impl std::fmt::Display for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "anthropic({})", self.model)
    }
}

impl Backend for AnthropicBackend {
    async fn call(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let api_request = ApiRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: request.messages.iter().map(Self::message_to_api).collect(),
            system: request.system,
            tools: request.tools.iter().map(Self::tool_to_api).collect(),
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let output =
            Self::response_to_output(api_response.content, api_response.stop_reason.as_deref());
        let usage = Usage {
            input_tokens: api_response.usage.input_tokens,
            output_tokens: api_response.usage.output_tokens,
        };

        Ok(ModelResponse { output, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToolResult;
    use serde_json::{Map, json};

    fn parse(body: Value) -> ModelOutput {
        let response: ApiResponse = serde_json::from_value(body).unwrap();
        AnthropicBackend::response_to_output(response.content, response.stop_reason.as_deref())
    }

    #[test]
    fn text_only_is_final_answer() {
        let out = parse(json!({
            "content": [{"type": "text", "text": "It costs 8€."}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 4}
        }));
        assert_eq!(out, ModelOutput::answer("It costs 8€."));
    }

    #[test]
    fn tool_use_becomes_tool_calls_in_order() {
        let out = parse(json!({
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "tu_1", "name": "web_search", "input": {"query": "abono"}},
                {"type": "tool_use", "id": "tu_2", "name": "tax_calculator", "input": {"net_price": 20}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 4}
        }));

        let ModelOutput::ToolCalls { thought, calls } = out else {
            panic!("expected tool calls");
        };
        assert_eq!(thought.as_deref(), Some("Let me check."));
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "tu_1");
        assert_eq!(calls[1].arguments["net_price"], json!(20));
    }

    #[test]
    fn non_object_input_is_unparseable() {
        let out = parse(json!({
            "content": [{"type": "tool_use", "id": "tu_1", "name": "web_search", "input": "abono"}],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }));
        assert!(matches!(out, ModelOutput::Unparseable { reason, .. } if reason.contains("web_search")));
    }

    #[test]
    fn truncated_or_empty_is_unparseable() {
        let truncated = parse(json!({
            "content": [{"type": "text", "text": "The price is"}],
            "stop_reason": "max_tokens",
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }));
        assert!(matches!(truncated, ModelOutput::Unparseable { .. }));

        let empty = parse(json!({
            "content": [{"type": "thinking", "thinking": "..."}],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }));
        assert!(matches!(empty, ModelOutput::Unparseable { reason, .. } if reason == "empty response"));
    }

    #[test]
    fn tool_round_trip_serializes_as_blocks() {
        let call = ToolCall::new("tu_1", "tax_calculator", Map::new());
        let assistant = Message::new(Role::Assistant, vec![Part::ToolCall(call)]);
        let result = Message::new(
            Role::User,
            vec![Part::ToolResult(ToolResult::Failure {
                tool_call_id: "tu_1".into(),
                error: "invalid input".into(),
            })],
        );

        let assistant = serde_json::to_value(AnthropicBackend::message_to_api(&assistant)).unwrap();
        let result = serde_json::to_value(AnthropicBackend::message_to_api(&result)).unwrap();

        assert_eq!(assistant["content"][0]["type"], "tool_use");
        assert_eq!(assistant["content"][0]["input"], json!({}));
        assert_eq!(result["role"], "user");
        assert_eq!(result["content"][0]["tool_use_id"], "tu_1");
        assert_eq!(result["content"][0]["is_error"], true);
    }

    #[test]
    fn plain_text_message_stays_a_string() {
        let msg = serde_json::to_value(AnthropicBackend::message_to_api(&Message::user("hola")))
            .unwrap();
        assert_eq!(msg, json!({"role": "user", "content": "hola"}));
    }

    #[test]
    fn display_names_the_model() {
        let backend = AnthropicBackend::builder("key", "claude-test").build();
        assert_eq!(backend.to_string(), "anthropic(claude-test)");
    }
}
