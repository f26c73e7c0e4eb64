//! Backend connection settings.
//!
//! The server builds an [`LlmBackendConfig`] from the `llm` section of its
//! YAML config; this crate never reads files or the environment itself.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AiError;

/// Default per-request timeout for LLM calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Configuration for a single LLM backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The backend type.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier (e.g. `gpt-5-mini`).
    pub model: String,
    /// Upper bound on a single HTTP call.
    pub request_timeout: Duration,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    #[default]
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => f.write_str("openai"),
            Self::Anthropic => f.write_str("anthropic"),
        }
    }
}

impl FromStr for BackendType {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "ollama" | "deepseek" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(AiError::Config(format!("unknown LLM backend: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_type_parses_aliases() {
        assert!(matches!("OpenAI".parse::<BackendType>(), Ok(BackendType::OpenAi)));
        assert!(matches!("ollama".parse::<BackendType>(), Ok(BackendType::OpenAi)));
        assert!(matches!(" anthropic ".parse::<BackendType>(), Ok(BackendType::Anthropic)));
        assert!("gemini".parse::<BackendType>().is_err());
    }
}
