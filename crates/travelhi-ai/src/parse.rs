//! LLM response parsing.
//!
//! The model is asked for a bare JSON object but does not always comply.
//! [`extract_json`] tries several recovery strategies before giving up:
//!
//! 1. Direct `serde_json` deserialization
//! 2. Extract JSON from a markdown code block
//! 3. Strip trailing commas and retry
//! 4. Code block extraction followed by comma stripping
//! 5. The outermost `{ ... }` span of the text

use serde::Deserialize;
use serde::de::DeserializeOwned;
use travelhi_types::{DisruptionCategory, DisruptionPrediction};

use crate::error::AiError;

/// Parse the first JSON object the recovery strategies can find.
///
/// # Errors
///
/// Returns [`AiError::Parse`] if every strategy fails.
pub fn extract_json<T: DeserializeOwned>(raw: &str) -> Result<T, AiError> {
    let trimmed = raw.trim();

    // Strategy 1: direct parse
    if let Ok(parsed) = serde_json::from_str::<T>(trimmed) {
        return Ok(parsed);
    }

    // Strategy 2: extract from markdown code block
    if let Some(json_str) = extract_json_from_codeblock(trimmed)
        && let Ok(parsed) = serde_json::from_str::<T>(json_str)
    {
        return Ok(parsed);
    }

    // Strategy 3: strip trailing commas and retry
    if let Ok(parsed) = serde_json::from_str::<T>(&strip_trailing_commas(trimmed)) {
        return Ok(parsed);
    }

    // Strategy 4: extract from code block then strip commas
    if let Some(json_str) = extract_json_from_codeblock(trimmed)
        && let Ok(parsed) = serde_json::from_str::<T>(&strip_trailing_commas(json_str))
    {
        return Ok(parsed);
    }

    // Strategy 5: outermost braces inside surrounding prose
    if let Some(json_str) = outermost_object(trimmed)
        && let Ok(parsed) = serde_json::from_str::<T>(&strip_trailing_commas(json_str))
    {
        return Ok(parsed);
    }

    Err(AiError::Parse(format!("all parse strategies failed for: {trimmed}")))
}

/// Extract the body of the first fenced code block.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = text.get(start.checked_add(3)?..)?;
    let body_start = after_fence.find('\n').map_or(0, |i| i.saturating_add(1));
    let body = after_fence.get(body_start..)?;
    let end = body.find("```")?;
    body.get(..end).map(str::trim)
}

/// Remove commas that directly precede a closing `}` or `]`.
fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_comma = false;
    let mut whitespace = String::new();

    for ch in text.chars() {
        if pending_comma {
            if ch.is_whitespace() {
                whitespace.push(ch);
                continue;
            }
            if ch != '}' && ch != ']' {
                out.push(',');
            }
            out.push_str(&whitespace);
            whitespace.clear();
            pending_comma = false;
        }
        if ch == ',' {
            pending_comma = true;
        } else {
            out.push(ch);
        }
    }
    if pending_comma {
        out.push(',');
    }
    out.push_str(&whitespace);
    out
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| text.get(start..=end)).flatten()
}

// ---------------------------------------------------------------------------
// Disruption assessment
// ---------------------------------------------------------------------------

/// The assessment exactly as the model produced it; every field optional so
/// an incomplete answer can be told apart from garbage.
#[derive(Debug, Default, Deserialize)]
pub struct RawAssessment {
    /// Probability of a disruption.
    #[serde(default)]
    pub probability: Option<f64>,
    /// Category name.
    #[serde(default)]
    pub category: Option<String>,
    /// Explanation.
    #[serde(default)]
    pub reasoning: Option<String>,
    /// Advice for the traveller.
    #[serde(default)]
    pub recommended_action: Option<String>,
    /// Model confidence.
    #[serde(default)]
    pub confidence: Option<f64>,
}

fn unit_interval(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && (0.0..=1.0).contains(v))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

fn parse_category(value: Option<&str>) -> Option<DisruptionCategory> {
    let name = value?.trim().to_lowercase();
    serde_json::from_value(serde_json::Value::String(name)).ok()
}

impl RawAssessment {
    /// Names of the fields that are missing, blank, or out of range.
    pub fn problems(&self) -> Vec<&'static str> {
        let mut problems = Vec::new();
        if unit_interval(self.probability).is_none() {
            problems.push("probability");
        }
        if parse_category(self.category.as_deref()).is_none() {
            problems.push("category");
        }
        if non_blank(self.reasoning.clone()).is_none() {
            problems.push("reasoning");
        }
        if non_blank(self.recommended_action.clone()).is_none() {
            problems.push("recommended_action");
        }
        if unit_interval(self.confidence).is_none() {
            problems.push("confidence");
        }
        problems
    }

    /// Convert a complete assessment, trimming the text fields.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Parse`] naming the incomplete fields.
    pub fn into_prediction(self) -> Result<DisruptionPrediction, AiError> {
        let category = parse_category(self.category.as_deref());
        match (
            unit_interval(self.probability),
            category,
            non_blank(self.reasoning),
            non_blank(self.recommended_action),
            unit_interval(self.confidence),
        ) {
            (
                Some(probability),
                Some(category),
                Some(reasoning),
                Some(recommended_action),
                Some(confidence),
            ) => Ok(DisruptionPrediction {
                probability,
                category,
                reasoning,
                recommended_action,
                confidence,
            }),
            _ => Err(AiError::Parse(String::from("incomplete assessment"))),
        }
    }
}

/// Parse a model answer into a complete prediction.
///
/// # Errors
///
/// Returns [`AiError::Parse`] if the text holds no JSON object or the
/// object is incomplete.
pub fn parse_assessment(raw: &str) -> Result<DisruptionPrediction, AiError> {
    let assessment: RawAssessment = extract_json(raw)?;
    let problems = assessment.problems();
    if !problems.is_empty() {
        return Err(AiError::Parse(format!("incomplete assessment: {}", problems.join(", "))));
    }
    assessment.into_prediction()
}

// ---------------------------------------------------------------------------
// Moderation verdict
// ---------------------------------------------------------------------------

/// The moderation classifier's answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModerationVerdict {
    /// Whether the text may be published.
    pub allowed: bool,
    /// Violated categories, if any.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Short explanation.
    #[serde(default)]
    pub reasoning: String,
}

/// Parse a classifier answer.
///
/// # Errors
///
/// Returns [`AiError::Parse`] if no verdict can be recovered.
pub fn parse_verdict(raw: &str) -> Result<ModerationVerdict, AiError> {
    extract_json(raw)
}
