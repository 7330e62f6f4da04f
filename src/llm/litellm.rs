//! Client for OpenAI-compatible `/chat/completions` endpoints: a LiteLLM
//! proxy, OpenRouter or a local server.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::LlmError;
use crate::llm::types::{
    Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, Role, Usage,
};

/// Model used when neither the request nor `LITELLM_DEFAULT_MODEL` names one.
pub const DEFAULT_LITELLM_MODEL: &str = "gpt-4o-mini";

const REQUEST_TIMEOUT_SECS: u64 = 120;

pub struct LiteLlmClient {
    api_base: String,
    api_key: Option<String>,
    default_model: String,
    http_client: Client,
}

impl LiteLlmClient {
    /// `api_base` is the URL in front of `/chat/completions`, e.g.
    /// `http://localhost:4000`. A trailing slash is dropped.
    pub fn new(api_base: String, api_key: Option<String>, default_model: String) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            default_model,
            http_client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Reads `LITELLM_API_BASE` (required), `LITELLM_API_KEY` and
    /// `LITELLM_DEFAULT_MODEL`.
    ///
    /// # Errors
    ///
    /// `LlmError::MissingApiBase` when `LITELLM_API_BASE` is unset.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_base = env::var("LITELLM_API_BASE").map_err(|_| LlmError::MissingApiBase)?;
        let api_key = env::var("LITELLM_API_KEY").ok().filter(|k| !k.is_empty());
        let default_model = env::var("LITELLM_DEFAULT_MODEL")
            .unwrap_or_else(|_| DEFAULT_LITELLM_MODEL.to_string());

        Ok(Self::new(api_base, api_key, default_model))
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn build_api_request(&self, request: GenerationRequest) -> ChatRequest {
        let model = request.model_or(&self.default_model).to_string();
        let response_format = request
            .wants_json()
            .then_some(ResponseFormat { kind: "json_object" });

        ChatRequest {
            model,
            messages: request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            top_p: request.top_p,
            response_format,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    index: u32,
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default = "assistant_role")]
    role: Role,
    #[serde(default)]
    content: Option<String>,
}

fn assistant_role() -> Role {
    Role::Assistant
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl From<ChatResponse> for GenerationResponse {
    fn from(response: ChatResponse) -> Self {
        let choices = response
            .choices
            .into_iter()
            .map(|choice| Choice {
                index: choice.index,
                message: Message {
                    role: choice.message.role,
                    content: choice.message.content.unwrap_or_default(),
                },
                finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            })
            .collect();

        GenerationResponse {
            id: response.id,
            model: response.model,
            choices,
            usage: response.usage.unwrap_or_default(),
        }
    }
}

/// Maps a non-success status and its body to an error. The body's
/// `error.message` is used when present; Gemini uses the same envelope.
pub(crate) fn status_error(status: StatusCode, body: String) -> LlmError {
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    if status == StatusCode::TOO_MANY_REQUESTS {
        LlmError::RateLimited(message)
    } else {
        LlmError::ApiError {
            code: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl LlmProvider for LiteLlmClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let chat_request = self.build_api_request(request);
        let url = format!("{}/chat/completions", self.api_base);

        let mut http_request = self
            .http_client
            .post(&url)
            .header("X-Title", "interview-coach")
            .json(&chat_request);
        if let Some(api_key) = &self.api_key {
            http_request = http_request.bearer_auth(api_key);
        }

        tracing::debug!(model = %chat_request.model, url = %url, json = chat_request.response_format.is_some(), "Sending chat completion request");

        let http_response = http_request
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = http_response.status();
        if !status.is_success() {
            let body = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            let err = status_error(status, body);
            tracing::warn!(status = status.as_u16(), error = %err, "Chat completion rejected");
            return Err(err);
        }

        let chat_response: ChatResponse = http_response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("Failed to parse API response: {}", e)))?;

        Ok(chat_response.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> LiteLlmClient {
        LiteLlmClient::new(base.to_string(), None, DEFAULT_LITELLM_MODEL.to_string())
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = LiteLlmClient::new(
            "http://localhost:4000/".to_string(),
            Some("test-key".to_string()),
            "gpt-4".to_string(),
        );
        assert_eq!(client.api_base(), "http://localhost:4000");
        assert_eq!(client.default_model(), "gpt-4");
        assert!(client.has_api_key());
    }

    #[test]
    fn test_api_request_uses_default_model_and_json_format() {
        let request = GenerationRequest::new("", vec![Message::user("q")])
            .with_temperature(0.7)
            .with_json_output();

        let json = serde_json::to_string(&client("http://localhost:4000").build_api_request(request))
            .expect("serialization should succeed");
        assert!(json.contains("\"model\":\"gpt-4o-mini\""));
        assert!(json.contains("\"response_format\":{\"type\":\"json_object\"}"));
        assert!(json.contains("\"role\":\"user\""));
        assert!(!json.contains("top_p"));
        assert!(!json.contains("max_tokens"));
    }

    #[test]
    fn test_api_request_without_json_has_no_format() {
        let json = serde_json::to_string(
            &client("http://x").build_api_request(GenerationRequest::new("m", vec![Message::user("q")])),
        )
        .expect("serialization should succeed");
        assert!(json.contains("\"model\":\"m\""));
        assert!(!json.contains("response_format"));
    }

    #[test]
    fn test_chat_response_conversion() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "[]"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;
        let response: GenerationResponse = serde_json::from_str::<ChatResponse>(raw).unwrap().into();
        assert_eq!(response.first_content(), Some("[]"));
        assert_eq!(response.choices[0].finish_reason, "stop");
        assert_eq!(response.usage.total_tokens, 15);

        let no_usage = r#"{"choices": [{"message": {"content": null}}]}"#;
        let response: GenerationResponse =
            serde_json::from_str::<ChatResponse>(no_usage).unwrap().into();
        assert_eq!(response.first_content(), Some(""));
        assert_eq!(response.choices[0].message.role, Role::Assistant);
        assert_eq!(response.usage, Usage::default());
    }

    #[test]
    fn test_status_errors() {
        let err = status_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"message": "slow down"}}"#.to_string(),
        );
        assert!(matches!(err, LlmError::RateLimited(ref m) if m == "slow down"));

        let err = status_error(StatusCode::BAD_GATEWAY, "upstream down".to_string());
        assert!(matches!(err, LlmError::ApiError { code: 502, ref message } if message == "upstream down"));
    }

    #[tokio::test]
    async fn test_generate_connection_error() {
        let request = GenerationRequest::new("gpt-4", vec![Message::user("test")]);
        let err = client("http://localhost:65535").generate(request).await.unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed(_)));
    }
}
