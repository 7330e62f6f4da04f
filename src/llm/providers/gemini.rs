//! Google Gemini provider.
//!
//! Speaks the `generateContent` REST endpoint directly. System messages become
//! the `systemInstruction`, assistant turns are sent with the `model` role,
//! and every request carries the fixed safety settings below.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::LlmError;
use crate::llm::litellm::status_error;
use crate::llm::{Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, Role, Usage};

/// Default Gemini API endpoint.
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model to use if none specified.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Content categories blocked at medium probability and above.
const BLOCKED_CATEGORIES: [&str; 2] = [
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

const BLOCK_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Gemini provider for LLM requests.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl GeminiProvider {
    /// Create a provider for `gemini-1.5-flash`.
    pub fn new(api_key: String) -> Self {
        Self::with_custom_url(
            api_key,
            GEMINI_BASE_URL.to_string(),
            DEFAULT_GEMINI_MODEL.to_string(),
        )
    }

    /// Create a provider with a specific default model.
    pub fn with_model(api_key: String, model: String) -> Self {
        Self::with_custom_url(api_key, GEMINI_BASE_URL.to_string(), model)
    }

    /// Create a provider against a custom base URL (proxies, tests).
    pub fn with_custom_url(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client - system TLS configuration error"),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_model: model,
        }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the default model.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
    #[serde(default)]
    response_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    index: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

fn build_api_request(request: GenerationRequest) -> ApiRequest {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();

    for message in request.messages {
        let role = match message.role {
            Role::System => {
                system_parts.push(Part {
                    text: message.content,
                });
                continue;
            }
            Role::Assistant => "model",
            Role::User => "user",
        };
        contents.push(Content {
            role: Some(role.to_string()),
            parts: vec![Part {
                text: message.content,
            }],
        });
    }

    let system_instruction = (!system_parts.is_empty()).then_some(Content {
        role: None,
        parts: system_parts,
    });

    ApiRequest {
        contents,
        system_instruction,
        generation_config: GenerationConfig {
            temperature: request.temperature,
            top_p: request.top_p,
            max_output_tokens: request.max_tokens,
            response_mime_type: request.response_mime_type,
        },
        safety_settings: BLOCKED_CATEGORIES
            .iter()
            .map(|category| SafetySetting {
                category,
                threshold: BLOCK_THRESHOLD,
            })
            .collect(),
    }
}

fn into_generation_response(
    api_response: ApiResponse,
    model: &str,
) -> Result<GenerationResponse, LlmError> {
    if api_response.candidates.is_empty() {
        let reason = api_response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(LlmError::Blocked(reason));
    }

    let choices = api_response
        .candidates
        .into_iter()
        .map(|candidate| {
            let text = candidate
                .content
                .map(|c| {
                    c.parts
                        .into_iter()
                        .map(|p| p.text)
                        .collect::<Vec<_>>()
                        .join("")
                })
                .unwrap_or_default();
            Choice {
                index: candidate.index,
                message: Message::assistant(text),
                finish_reason: candidate
                    .finish_reason
                    .map(|r| r.to_lowercase())
                    .unwrap_or_else(|| "stop".to_string()),
            }
        })
        .collect();

    let usage = api_response
        .usage_metadata
        .map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        })
        .unwrap_or_default();

    Ok(GenerationResponse {
        id: api_response.response_id.unwrap_or_default(),
        model: api_response
            .model_version
            .unwrap_or_else(|| model.to_string()),
        choices,
        usage,
    })
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let model = request.model_or(&self.default_model).to_string();
        let url = self.endpoint(&model);
        let api_request = build_api_request(request);

        tracing::debug!(model = %model, "Sending Gemini generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            let err = status_error(status, body);
            tracing::warn!(status = status.as_u16(), error = %err, "Gemini request rejected");
            return Err(err);
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("Failed to parse Gemini response: {}", e)))?;

        into_generation_response(api_response, &model)
    }
}
