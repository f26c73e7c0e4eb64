//! Failures of the moderation and prediction services.

/// Anything that can go wrong between building a prompt and reading the answer.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// A prompt template is missing or did not render.
    #[error("prompt template: {0}")]
    Template(String),

    /// The completion API was unreachable or answered with an error.
    #[error("completion backend: {0}")]
    LlmBackend(String),

    /// The model answer was not the expected JSON.
    #[error("unreadable model answer: {0}")]
    Parse(String),

    /// A built-in pattern failed to compile.
    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// Backend settings are incomplete.
    #[error("llm settings: {0}")]
    Config(String),
}
