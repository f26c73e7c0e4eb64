//! LLM-backed services for Travel Hi.
//!
//! Two consumers share one backend abstraction:
//!
//! - [`moderation::Moderator`] screens user text with a profanity filter
//!   and, optionally, an LLM classifier.
//! - [`predictor::DisruptionPredictor`] turns a structured transit report
//!   into a disruption estimate, retrying once and falling back to a fixed
//!   conservative answer.
//!
//! ```text
//! TrafficReport --> Moderator --blocked--> None
//!                       |
//!                    allowed
//!                       v
//!               PromptEngine --> CompletionBackend --> parse --> DisruptionPrediction
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod moderation;
pub mod parse;
pub mod predictor;
pub mod prompt;

pub use config::{BackendType, LlmBackendConfig};
pub use error::AiError;
pub use llm::{CompletionBackend, CompletionOptions, LlmBackend, create_backend};
pub use moderation::{Moderator, ProfanityFilter};
pub use predictor::DisruptionPredictor;
pub use prompt::{PromptEngine, RenderedPrompt};
