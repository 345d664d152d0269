//! Google Gemini API backend.

use std::collections::HashMap;

use crate::model::{
    Backend, Message, ModelError, ModelOutput, ModelRequest, ModelResponse, Part, Role, ToolCall,
    Usage,
};
use crate::tools::ToolSpec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent>,
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTools>,
    generation_config: ApiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<ApiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<ApiFunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiTools {
    function_declarations: Vec<ApiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct ApiFunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<ApiPromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    #[serde(default)]
    content: Option<ApiResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseContent {
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating a Gemini backend.
#[derive(Debug, Clone)]
pub struct GeminiBackendBuilder {
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl GeminiBackendBuilder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4096,
            base_url: GEMINI_API_URL.to_string(),
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn build(self) -> GeminiBackend {
        let url = format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        GeminiBackend {
            client: reqwest::Client::new(),
            api_key: self.api_key,
            model: self.model,
            max_tokens: self.max_tokens,
            url,
        }
    }
}

/// Gemini `generateContent` backend.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    url: String,
}

impl GeminiBackend {
    pub fn builder(api_key: impl Into<String>, model: impl Into<String>) -> GeminiBackendBuilder {
        GeminiBackendBuilder::new(api_key, model)
    }

    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Assistant => "model",
        }
    }

    /// Gemini answers function calls by name, so remember which id
    /// belonged to which tool while walking the transcript.
    fn messages_to_api(messages: &[Message]) -> Vec<ApiContent> {
        let mut names: HashMap<&str, &str> = HashMap::new();

        messages
            .iter()
            .map(|msg| {
                let parts = msg
                    .parts
                    .iter()
                    .map(|part| match part {
                        Part::Text(text) => ApiPart {
                            text: Some(text.clone()),
                            ..Default::default()
                        },
                        Part::ToolCall(call) => {
                            names.insert(&call.id, &call.name);
                            ApiPart {
                                function_call: Some(ApiFunctionCall {
                                    id: Some(call.id.clone()),
                                    name: call.name.clone(),
                                    args: Some(Value::Object(call.arguments.clone())),
                                }),
                                ..Default::default()
                            }
                        }
                        Part::ToolResult(result) => {
                            let id = result.tool_call_id();
                            let name = names.get(id).copied().unwrap_or(id);
                            let response = if result.is_error() {
                                json!({ "error": result.content() })
                            } else {
                                json!({ "output": result.content() })
                            };
                            ApiPart {
                                function_response: Some(ApiFunctionResponse {
                                    id: Some(id.to_string()),
                                    name: name.to_string(),
                                    response,
                                }),
                                ..Default::default()
                            }
                        }
                    })
                    .collect();

                ApiContent {
                    role: Some(Self::role_to_api(msg.role)),
                    parts,
                }
            })
            .collect()
    }

    fn tools_to_api(tools: &[ToolSpec]) -> Vec<ApiTools> {
        if tools.is_empty() {
            return Vec::new();
        }

        let function_declarations = tools
            .iter()
            .map(|spec| ApiFunctionDeclaration {
                name: spec.name.clone(),
                description: spec.description.clone(),
                // Gemini rejects object schemas without properties.
                parameters: (!spec.params.is_empty()).then(|| spec.input_schema()),
            })
            .collect();

        vec![ApiTools {
            function_declarations,
        }]
    }

    /// Classify a response into the three-way model output.
    fn response_to_output(response: ApiResponse) -> ModelOutput {
        let Some(candidate) = response.candidates.into_iter().next() else {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!("prompt blocked: {r}"))
                .unwrap_or_else(|| "no candidates in response".to_string());
            return ModelOutput::unparseable("", reason);
        };

        let mut text = String::new();
        let mut calls = Vec::new();

        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(t) = part.text {
                text.push_str(&t);
            }
            if let Some(call) = part.function_call {
                let arguments = match call.args {
                    None | Some(Value::Null) => Map::new(),
                    Some(Value::Object(arguments)) => arguments,
                    Some(other) => {
                        return ModelOutput::unparseable(
                            other.to_string(),
                            format!("arguments for tool `{}` are not a JSON object", call.name),
                        );
                    }
                };
                let id = call
                    .id
                    .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));
                calls.push(ToolCall {
                    id,
                    name: call.name,
                    arguments,
                });
            }
        }

        match candidate.finish_reason.as_deref() {
            Some("MALFORMED_FUNCTION_CALL") => {
                return ModelOutput::unparseable(text, "malformed function call");
            }
            Some("MAX_TOKENS") => {
                return ModelOutput::unparseable(text, "response was cut off at max tokens");
            }
            _ => {}
        }

        if !calls.is_empty() {
            let thought = (!text.trim().is_empty()).then_some(text);
            return ModelOutput::ToolCalls { thought, calls };
        }

        if text.trim().is_empty() {
            let reason = match candidate.finish_reason {
                Some(r) if r != "STOP" => format!("empty response (finish reason {r})"),
                _ => "empty response".to_string(),
            };
            return ModelOutput::unparseable(text, reason);
        }

        ModelOutput::FinalAnswer(text)
    }
}

impl std::fmt::Display for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gemini({})", self.model)
    }
}

impl Backend for GeminiBackend {
    async fn call(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let system_instruction = (!request.system.is_empty()).then(|| ApiContent {
            role: None,
            parts: vec![ApiPart {
                text: Some(request.system.clone()),
                ..Default::default()
            }],
        });

        let api_request = ApiRequest {
            system_instruction,
            contents: Self::messages_to_api(&request.messages),
            tools: Self::tools_to_api(&request.tools),
            generation_config: ApiGenerationConfig {
                max_output_tokens: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
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

        let usage = api_response
            .usage_metadata
            .as_ref()
            .map(|u| Usage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        Ok(ModelResponse {
            output: Self::response_to_output(api_response),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToolResult;
    use crate::tools::ParamSpec;

    fn parse(body: Value) -> ModelOutput {
        GeminiBackend::response_to_output(serde_json::from_value(body).unwrap())
    }

    #[test]
    fn text_is_final_answer() {
        let out = parse(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "8€ per month."}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3}
        }));
        assert_eq!(out, ModelOutput::answer("8€ per month."));
    }

    #[test]
    fn function_calls_get_ids() {
        let out = parse(json!({
            "candidates": [{
                "content": {"parts": [
                    {"functionCall": {"name": "web_search", "args": {"query": "abono"}}},
                    {"functionCall": {"id": "fc-2", "name": "tax_calculator", "args": {"net_price": 20}}}
                ]},
                "finishReason": "STOP"
            }]
        }));

        let ModelOutput::ToolCalls { thought, calls } = out else {
            panic!("expected tool calls");
        };
        assert_eq!(thought, None);
        assert!(calls[0].id.starts_with("call_"));
        assert_eq!(calls[1].id, "fc-2");
        assert_eq!(calls[0].arguments["query"], "abono");
    }

    #[test]
    fn malformed_function_call_is_unparseable() {
        let out = parse(json!({
            "candidates": [{"finishReason": "MALFORMED_FUNCTION_CALL"}]
        }));
        assert!(matches!(out, ModelOutput::Unparseable { reason, .. } if reason == "malformed function call"));
    }

    #[test]
    fn blocked_prompt_is_unparseable() {
        let out = parse(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        assert!(matches!(out, ModelOutput::Unparseable { reason, .. } if reason.contains("SAFETY")));
    }

    #[test]
    fn function_response_uses_tool_name() {
        let call = ToolCall::new("c1", "tax_calculator", Map::new());
        let messages = vec![
            Message::user("q"),
            Message::new(Role::Assistant, vec![Part::ToolCall(call)]),
            Message::new(
                Role::User,
                vec![Part::ToolResult(ToolResult::Success {
                    tool_call_id: "c1".into(),
                    output: "Total: 55.00€".into(),
                })],
            ),
        ];

        let contents = serde_json::to_value(GeminiBackend::messages_to_api(&messages)).unwrap();
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["name"], "tax_calculator");
        assert_eq!(contents[2]["parts"][0]["functionResponse"]["name"], "tax_calculator");
        assert_eq!(
            contents[2]["parts"][0]["functionResponse"]["response"]["output"],
            "Total: 55.00€"
        );
    }

    #[test]
    fn parameterless_tools_omit_schema() {
        let tools = vec![
            ToolSpec::new("now", "Current date"),
            ToolSpec::new("web_search", "Search")
                .param(ParamSpec::string("query", "Terms").required()),
        ];
        let api = serde_json::to_value(GeminiBackend::tools_to_api(&tools)).unwrap();
        let decls = &api[0]["functionDeclarations"];
        assert!(decls[0].get("parameters").is_none());
        assert_eq!(decls[1]["parameters"]["required"], json!(["query"]));
    }

    #[test]
    fn url_includes_model() {
        let backend = GeminiBackend::builder("key", "gemini-test").build();
        assert!(backend.url.ends_with("/models/gemini-test:generateContent"));
        assert_eq!(backend.to_string(), "gemini(gemini-test)");
    }
}
