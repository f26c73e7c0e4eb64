//! LLM backend abstraction and implementations.
//!
//! Concrete backends are dispatched through the [`LlmBackend`] enum.
//! Consumers depend on the [`CompletionBackend`] trait instead, so the
//! moderator and predictor can be driven by a scripted backend in tests.
//! All backends communicate over HTTP via `reqwest`.

use async_trait::async_trait;

use crate::config::{BackendType, LlmBackendConfig};
use crate::error::AiError;
use crate::prompt::RenderedPrompt;

// ---------------------------------------------------------------------------
// Completion seam
// ---------------------------------------------------------------------------

/// Sampling parameters for one completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl CompletionOptions {
    /// Short, mostly deterministic answers for disruption estimates.
    pub const PREDICTION: Self = Self {
        temperature: 0.2,
        max_tokens: 260,
    };

    /// Deterministic verdicts for the moderation classifier.
    pub const MODERATION: Self = Self {
        temperature: 0.0,
        max_tokens: 160,
    };
}

/// Anything that can turn a rendered prompt into response text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send a prompt and return the raw response text.
    async fn complete(
        &self,
        prompt: &RenderedPrompt,
        options: CompletionOptions,
    ) -> Result<String, AiError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Unified backend enum
// ---------------------------------------------------------------------------

/// An HTTP LLM backend.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
}

#[async_trait]
impl CompletionBackend for LlmBackend {
    async fn complete(
        &self,
        prompt: &RenderedPrompt,
        options: CompletionOptions,
    ) -> Result<String, AiError> {
        match self {
            Self::OpenAi(backend) => backend.complete(prompt, options).await,
            Self::Anthropic(backend) => backend.complete(prompt, options).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }
}

// ---------------------------------------------------------------------------
// Shared HTTP plumbing
// ---------------------------------------------------------------------------

/// Where and how to reach one HTTP completion API.
struct Endpoint {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl Endpoint {
    fn new(config: &LlmBackendConfig) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AiError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}/{path}", self.base_url))
    }
}

/// Send a JSON body and decode the JSON answer. Non-2xx statuses become
/// [`AiError::LlmBackend`] carrying the response body.
async fn exchange(
    provider: &str,
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<serde_json::Value, AiError> {
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| AiError::LlmBackend(format!("{provider} request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let detail = response
            .text()
            .await
            .unwrap_or_else(|e| format!("unable to read error body: {e}"));
        return Err(AiError::LlmBackend(format!("{provider} returned {status}: {detail}")));
    }

    response
        .json()
        .await
        .map_err(|e| AiError::LlmBackend(format!("{provider} response was not JSON: {e}")))
}

/// Follow a path of object keys and array indices down to a string.
fn text_at(json: &serde_json::Value, pointer: &str) -> Option<String> {
    json.pointer(pointer)
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs (`OpenAI`,
/// `DeepSeek`, Ollama).
///
/// Posts to `{api_url}/chat/completions` in JSON-object response mode.
pub struct OpenAiBackend {
    endpoint: Endpoint,
}

impl OpenAiBackend {
    /// Create a new `OpenAI`-compatible backend.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &LlmBackendConfig) -> Result<Self, AiError> {
        Ok(Self {
            endpoint: Endpoint::new(config)?,
        })
    }

    async fn complete(
        &self,
        prompt: &RenderedPrompt,
        options: CompletionOptions,
    ) -> Result<String, AiError> {
        let body = serde_json::json!({
            "model": self.endpoint.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
            "response_format": {"type": "json_object"}
        });
        let request = self
            .endpoint
            .post("chat/completions")
            .bearer_auth(&self.endpoint.api_key);

        let json = exchange("OpenAI", request, &body).await?;
        extract_openai_content(&json)
    }
}

fn extract_openai_content(json: &serde_json::Value) -> Result<String, AiError> {
    text_at(json, "/choices/0/message/content").ok_or_else(|| {
        AiError::LlmBackend(String::from("OpenAI response has no choices[0].message.content"))
    })
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Version header required by the Messages API.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Backend for the Anthropic Messages API.
///
/// The system prompt goes in the top-level `system` field; the answer is
/// read from `content[0].text`.
pub struct AnthropicBackend {
    endpoint: Endpoint,
}

impl AnthropicBackend {
    /// Create a new Anthropic Messages API backend.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &LlmBackendConfig) -> Result<Self, AiError> {
        Ok(Self {
            endpoint: Endpoint::new(config)?,
        })
    }

    async fn complete(
        &self,
        prompt: &RenderedPrompt,
        options: CompletionOptions,
    ) -> Result<String, AiError> {
        let body = serde_json::json!({
            "model": self.endpoint.model,
            "system": prompt.system,
            "messages": [{"role": "user", "content": prompt.user}],
            "temperature": options.temperature,
            "max_tokens": options.max_tokens
        });
        let request = self
            .endpoint
            .post("messages")
            .header("x-api-key", &self.endpoint.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);

        let json = exchange("Anthropic", request, &body).await?;
        extract_anthropic_content(&json)
    }
}

fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, AiError> {
    text_at(json, "/content/0/text").ok_or_else(|| {
        AiError::LlmBackend(String::from("Anthropic response has no content[0].text"))
    })
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create an LLM backend from configuration.
///
/// # Errors
///
/// Returns [`AiError::Config`] if the API key is empty or the HTTP client
/// cannot be built.
pub fn create_backend(config: &LlmBackendConfig) -> Result<LlmBackend, AiError> {
    if config.api_key.trim().is_empty() {
        return Err(AiError::Config(String::from("LLM API key is empty")));
    }
    Ok(match config.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config)?),
        BackendType::Anthropic => LlmBackend::Anthropic(AnthropicBackend::new(config)?),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config(backend_type: BackendType, api_key: &str) -> LlmBackendConfig {
        LlmBackendConfig {
            backend_type,
            api_url: "https://api.example.com/v1/".to_owned(),
            api_key: api_key.to_owned(),
            model: "test-model".to_owned(),
            request_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn extract_openai_content_valid() {
        let json = serde_json::json!({
            "choices": [{
                "message": {
                    "content": "{\"probability\": 0.7}"
                }
            }]
        });
        let result = extract_openai_content(&json);
        assert!(result.is_ok_and(|text| text.contains("probability")));
    }

    #[test]
    fn extract_openai_content_missing_choices() {
        let json = serde_json::json!({"error": "rate_limit"});
        assert!(extract_openai_content(&json).is_err());
    }

    #[test]
    fn extract_anthropic_content_valid() {
        let json = serde_json::json!({
            "content": [{
                "type": "text",
                "text": "{\"allowed\": true}"
            }]
        });
        let result = extract_anthropic_content(&json);
        assert!(result.is_ok_and(|text| text.contains("allowed")));
    }

    #[test]
    fn extract_anthropic_content_missing() {
        let json = serde_json::json!({"content": []});
        assert!(extract_anthropic_content(&json).is_err());
    }

    #[test]
    fn create_backend_dispatches_correctly() {
        let openai = create_backend(&config(BackendType::OpenAi, "test"));
        assert!(openai.is_ok_and(|b| b.name() == "openai-compatible"));

        let anthropic = create_backend(&config(BackendType::Anthropic, "test"));
        assert!(anthropic.is_ok_and(|b| b.name() == "anthropic"));
    }

    #[test]
    fn create_backend_requires_api_key() {
        assert!(matches!(
            create_backend(&config(BackendType::OpenAi, "  ")),
            Err(AiError::Config(_))
        ));
    }

    #[test]
    fn trailing_slash_is_trimmed_from_api_url() {
        let backend = OpenAiBackend::new(&config(BackendType::OpenAi, "k"));
        assert!(backend.is_ok_and(|b| b.endpoint.base_url == "https://api.example.com/v1"));
    }
}
