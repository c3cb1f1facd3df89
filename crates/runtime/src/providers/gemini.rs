//! Gemini `generateContent` backend.

use crate::model::{
    Backend, FinishReason, Message, ModelError, ModelRequest, ModelResponse, Part, Role, ToolCall,
    ToolChoice, ToolSpec, Usage,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use super::GenerationConfig;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ApiToolConfig>,
    generation_config: ApiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct ApiContent {
    role: &'static str,
    parts: Vec<ApiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum ApiPart {
    Text(String),
    FunctionCall(ApiFunctionCall),
    FunctionResponse(ApiFunctionResponse),
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    #[serde(default, skip_serializing)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize)]
struct ApiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiTool {
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
struct ApiToolConfig {
    function_calling_config: ApiFunctionCallingConfig,
}

#[derive(Debug, Serialize)]
struct ApiFunctionCallingConfig {
    mode: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    usage_metadata: Option<ApiUsage>,
    #[serde(default)]
    prompt_feedback: Option<Value>,
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
    parts: Vec<ApiResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
    #[serde(default)]
    function_call: Option<ApiFunctionCall>,
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
    config: GenerationConfig,
}

impl GeminiBackendBuilder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            config: GenerationConfig::new(model),
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.config.top_p = Some(top_p);
        self
    }

    /// Replace every generation setting at once.
    pub fn config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> GeminiBackend {
        GeminiBackend {
            client: reqwest::Client::new(),
            api_key: self.api_key,
            config: self.config,
        }
    }
}

/// Google Gemini API backend.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    config: GenerationConfig,
}

impl GeminiBackend {
    pub fn builder(api_key: impl Into<String>, model: impl Into<String>) -> GeminiBackendBuilder {
        GeminiBackendBuilder::new(api_key, model)
    }

    fn endpoint(&self) -> String {
        format!("{GEMINI_API_BASE}/{}:generateContent", self.config.model)
    }

    // Gemini has no tool role; function responses travel in user turns.
    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::User | Role::Tool => "user",
            Role::Model => "model",
        }
    }

    fn message_to_api(msg: &Message) -> ApiContent {
        let parts = msg
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => ApiPart::Text(text.clone()),
                Part::ToolCall(call) => ApiPart::FunctionCall(ApiFunctionCall {
                    id: None,
                    name: call.name.clone(),
                    args: call.input.clone(),
                }),
                Part::ToolResult(result) => ApiPart::FunctionResponse(ApiFunctionResponse {
                    name: result.name.clone(),
                    response: result.outcome.to_response(),
                }),
            })
            .collect();

        ApiContent {
            role: Self::role_to_api(msg.role),
            parts,
        }
    }

    /// Declarations with no parameters omit the schema entirely.
    fn tool_to_api(spec: &ToolSpec) -> ApiFunctionDeclaration {
        let has_properties = spec
            .schema
            .get("properties")
            .and_then(Value::as_object)
            .is_some_and(|props| !props.is_empty());

        ApiFunctionDeclaration {
            name: spec.name.clone(),
            description: spec.description.clone(),
            parameters: has_properties.then(|| spec.schema.clone()),
        }
    }

    fn build_request(&self, request: &ModelRequest<'_>) -> ApiRequest {
        let declarations: Vec<ApiFunctionDeclaration> =
            request.tools.iter().map(Self::tool_to_api).collect();

        let (tools, tool_config) = if declarations.is_empty() {
            (Vec::new(), None)
        } else {
            let mode = match request.tool_choice {
                ToolChoice::Auto => "AUTO",
                ToolChoice::None => "NONE",
            };
            (
                vec![ApiTool {
                    function_declarations: declarations,
                }],
                Some(ApiToolConfig {
                    function_calling_config: ApiFunctionCallingConfig { mode },
                }),
            )
        };

        ApiRequest {
            contents: request.messages.iter().map(Self::message_to_api).collect(),
            tools,
            tool_config,
            generation_config: ApiGenerationConfig {
                max_output_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
                top_p: self.config.top_p,
            },
        }
    }

    fn parse_response(response: ApiResponse) -> Result<ModelResponse, ModelError> {
        let usage = response
            .usage_metadata
            .map(|u| Usage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        let Some(candidate) = response.candidates.into_iter().next() else {
            let block_reason = response
                .prompt_feedback
                .as_ref()
                .and_then(|feedback| feedback.get("blockReason"))
                .and_then(Value::as_str);
            return Err(match block_reason {
                Some(reason) => ModelError::Blocked(reason.to_string()),
                None => ModelError::InvalidResponse("no candidates".to_string()),
            });
        };

        let parts: Vec<Part> = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|part| !part.thought)
            .filter_map(|part| match (part.function_call, part.text) {
                (Some(call), _) => Some(Part::ToolCall(ToolCall {
                    id: call.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                    name: call.name,
                    input: if call.args.is_null() { json!({}) } else { call.args },
                })),
                (None, Some(text)) => Some(Part::Text(text)),
                (None, None) => None,
            })
            .collect();

        let message = Message::model(parts);
        let finish_reason = if message.tool_calls().is_empty() {
            Self::finish_reason(candidate.finish_reason.as_deref())
        } else {
            FinishReason::ToolCalls
        };

        Ok(ModelResponse {
            message,
            finish_reason,
            usage,
        })
    }

    fn finish_reason(reason: Option<&str>) -> FinishReason {
        match reason {
            None | Some("STOP") => FinishReason::Stop,
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII") => {
                FinishReason::ContentFilter
            }
            Some(other) => FinishReason::Unknown(other.to_string()),
        }
    }
}

impl std::fmt::Display for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gemini({})", self.config.model)
    }
}

impl Backend for GeminiBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        let api_request = self.build_request(&request);
        debug!(
            model = %self.config.model,
            contents = api_request.contents.len(),
            "sending gemini request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api { status, body });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        Self::parse_response(api_response)
    }
}
