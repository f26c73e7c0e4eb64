//! Transit disruption prediction.
//!
//! One prediction is at most two LLM calls: the plain prompt, then (if the
//! call failed or the answer was incomplete) the prompt with a repair
//! reminder. If both fail the caller still gets a conservative fixed
//! estimate rather than an error.

use std::sync::Arc;

use travelhi_types::{DisruptionCategory, DisruptionPrediction, TrafficReport};

use crate::error::AiError;
use crate::llm::{CompletionBackend, CompletionOptions};
use crate::moderation::Moderator;
use crate::parse::parse_assessment;
use crate::prompt::{PromptEngine, RenderedPrompt};

/// Probability reported when the model gave no usable answer.
pub const FALLBACK_PROBABILITY: f64 = 0.6;

/// Confidence reported when the model gave no usable answer.
pub const FALLBACK_CONFIDENCE: f64 = 0.55;

const FALLBACK_REASONING: &str =
    "Na podstawie zgłoszenia szacowane umiarkowane ryzyko lokalnych opóźnień w najbliższym czasie.";

const FALLBACK_ACTION: &str =
    "Sprawdź alternatywne trasy i komunikaty przewoźnika; zaplanuj dodatkowe 10–20 minut.";

/// The estimate returned when both attempts fail.
pub fn fallback_prediction() -> DisruptionPrediction {
    DisruptionPrediction {
        probability: FALLBACK_PROBABILITY,
        category: DisruptionCategory::Unknown,
        reasoning: FALLBACK_REASONING.to_owned(),
        recommended_action: FALLBACK_ACTION.to_owned(),
        confidence: FALLBACK_CONFIDENCE,
    }
}

/// Turns transit reports into disruption estimates.
pub struct DisruptionPredictor {
    backend: Arc<dyn CompletionBackend>,
    prompts: Arc<PromptEngine>,
    moderator: Arc<Moderator>,
}

impl DisruptionPredictor {
    /// Create a predictor.
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        prompts: Arc<PromptEngine>,
        moderator: Arc<Moderator>,
    ) -> Self {
        Self {
            backend,
            prompts,
            moderator,
        }
    }

    /// Estimate the disruption described by a report.
    ///
    /// Returns `Ok(None)` when the report's free text is blocked by
    /// moderation.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Template`] if a prompt cannot be rendered. LLM
    /// failures never surface here; they end in the fallback estimate.
    pub async fn predict(
        &self,
        report: &TrafficReport,
    ) -> Result<Option<DisruptionPrediction>, AiError> {
        if !self.moderator.allows(report.user_text.as_deref()).await {
            return Ok(None);
        }

        let first = self.prompts.prediction(report)?;
        if let Some(prediction) = self.attempt(&first, 1).await {
            return Ok(Some(prediction));
        }

        let repair = self.prompts.prediction_repair(report)?;
        if let Some(prediction) = self.attempt(&repair, 2).await {
            return Ok(Some(prediction));
        }

        tracing::warn!(
            backend = self.backend.name(),
            city = %report.city,
            mode = report.mode.as_str(),
            "Both prediction attempts failed, returning fallback estimate"
        );
        Ok(Some(fallback_prediction()))
    }

    async fn attempt(&self, prompt: &RenderedPrompt, attempt: u8) -> Option<DisruptionPrediction> {
        let outcome = self
            .backend
            .complete(prompt, CompletionOptions::PREDICTION)
            .await
            .and_then(|raw| parse_assessment(&raw));

        match outcome {
            Ok(prediction) => {
                tracing::debug!(
                    attempt,
                    category = ?prediction.category,
                    probability = prediction.probability,
                    "Disruption predicted"
                );
                Some(prediction)
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "Prediction attempt failed");
                None
            }
        }
    }
}
