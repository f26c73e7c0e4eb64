//! Prompt templates rendered with `minijinja`.
//!
//! Templates ship inside the binary (`templates/*.j2` via `include_str!`),
//! so a deployment cannot lose them.

use minijinja::Environment;
use serde::Serialize;
use travelhi_types::TrafficReport;

use crate::error::AiError;

const TEMPLATES: [(&str, &str); 5] = [
    ("predict_system", include_str!("../templates/predict_system.j2")),
    ("predict_user", include_str!("../templates/predict_user.j2")),
    ("predict_repair", include_str!("../templates/predict_repair.j2")),
    ("moderation_system", include_str!("../templates/moderation_system.j2")),
    ("moderation_user", include_str!("../templates/moderation_user.j2")),
];

/// Category names offered to the model.
const CATEGORIES: [&str; 6] = ["delay", "breakdown", "accident", "congestion", "strike", "unknown"];

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// System message.
    pub system: String,
    /// User message.
    pub user: String,
}

/// Values exposed to the prediction templates.
#[derive(Serialize)]
struct PredictionContext<'a> {
    city: &'a str,
    mode: &'a str,
    line: Option<&'a str>,
    latitude: f64,
    longitude: f64,
    timestamp: String,
    user_text: Option<&'a str>,
    categories: &'a [&'a str],
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|t| !t.is_empty())
}

/// Holds the compiled prompt templates.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// Compile the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Template`] if a template fails to parse.
    pub fn new() -> Result<Self, AiError> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)
                .map_err(|e| AiError::Template(format!("failed to add {name} template: {e}")))?;
        }
        Ok(Self { env })
    }

    fn render_one<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, AiError> {
        self.env
            .get_template(name)
            .map_err(|e| AiError::Template(format!("missing {name} template: {e}")))?
            .render(ctx)
            .map_err(|e| AiError::Template(format!("{name} render failed: {e}")))
    }

    /// Render the disruption prompt for a transit report.
    ///
    /// Blank optional fields are rendered as their placeholders.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Template`] if rendering fails.
    pub fn prediction(&self, report: &TrafficReport) -> Result<RenderedPrompt, AiError> {
        let ctx = PredictionContext {
            city: report.city.trim(),
            mode: report.mode.as_str(),
            line: non_blank(report.line.as_deref()),
            latitude: report.latitude,
            longitude: report.longitude,
            timestamp: report.timestamp.to_rfc3339(),
            user_text: non_blank(report.user_text.as_deref()),
            categories: &CATEGORIES,
        };

        Ok(RenderedPrompt {
            system: self.render_one("predict_system", &ctx)?,
            user: self.render_one("predict_user", &ctx)?,
        })
    }

    /// The prediction prompt with the completeness reminder appended to
    /// the system message.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Template`] if rendering fails.
    pub fn prediction_repair(&self, report: &TrafficReport) -> Result<RenderedPrompt, AiError> {
        let base = self.prediction(report)?;
        let repair = self.render_one("predict_repair", minijinja::context! {})?;
        Ok(RenderedPrompt {
            system: format!("{}\n\n{repair}", base.system),
            user: base.user,
        })
    }

    /// Render the classifier prompt for a piece of user text.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Template`] if rendering fails.
    pub fn moderation(&self, text: &str) -> Result<RenderedPrompt, AiError> {
        let ctx = serde_json::json!({ "text": text });
        Ok(RenderedPrompt {
            system: self.render_one("moderation_system", &ctx)?,
            user: self.render_one("moderation_user", &ctx)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use travelhi_types::TransitMode;

    use super::*;

    fn report(line: Option<&str>, user_text: Option<&str>) -> TrafficReport {
        TrafficReport {
            mode: TransitMode::Tram,
            line: line.map(ToOwned::to_owned),
            city: String::from("Warszawa"),
            latitude: 52.2297,
            longitude: 21.0122,
            timestamp: Utc.with_ymd_and_hms(2025, 10, 4, 8, 30, 0).single().unwrap_or_default(),
            user_text: user_text.map(ToOwned::to_owned),
        }
    }

    fn engine() -> PromptEngine {
        PromptEngine::new().unwrap_or_else(|e| panic!("templates must compile: {e}"))
    }

    #[test]
    fn prediction_prompt_carries_report_fields() {
        let prompt = engine().prediction(&report(Some("17"), Some("Tramwaj stoi od 10 minut")));
        assert!(prompt.is_ok_and(|p| {
            p.user.contains("Warszawa")
                && p.user.contains("tram")
                && p.user.contains("Linia: 17")
                && p.user.contains("Tramwaj stoi")
                && p.user.contains("2025-10-04T08:30:00")
                && p.system.contains("delay, breakdown, accident, congestion, strike, unknown")
        }));
    }

    #[test]
    fn missing_optional_fields_use_placeholders() {
        let prompt = engine().prediction(&report(None, Some("   ")));
        assert!(prompt.is_ok_and(|p| p.user.contains("Linia: unknown") && p.user.contains("brak")));
    }

    #[test]
    fn repair_prompt_extends_system_message() {
        let engine = engine();
        let base = engine.prediction(&report(None, None));
        let repair = engine.prediction_repair(&report(None, None));
        assert!(matches!((base, repair), (Ok(b), Ok(r))
            if r.system.starts_with(&b.system) && r.system.contains("niekompletna") && r.user == b.user));
    }

    #[test]
    fn moderation_prompt_embeds_text() {
        let prompt = engine().moderation("jakiś tekst");
        assert!(prompt.is_ok_and(|p| p.user.contains("jakiś tekst") && p.system.contains("allowed")));
    }
}
