//! User text moderation.
//!
//! A [`ProfanityFilter`] catches Polish profanity, including spaced-out and
//! masked spellings (`k u r-w_a`, `k***a`). Text that passes the filter may
//! additionally be sent to an LLM classifier. Classifier failures never
//! block text.

use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use crate::error::AiError;
use crate::llm::{CompletionBackend, CompletionOptions};
use crate::parse::parse_verdict;
use crate::prompt::PromptEngine;

/// Words blocked in any spelling, already in normalized form.
const BLOCKED_WORDS: [&str; 12] = [
    "kurwa",
    "chuj",
    "huj",
    "jebac",
    "jebany",
    "pierdol",
    "spierdalaj",
    "skurwysyn",
    "pizda",
    "dziwka",
    "szmata",
    "cwel",
];

/// Masked spellings such as `k***a`, `p**da`, `spier**aj`.
const MASKED_PATTERNS: [&str; 3] = [
    r"\bk[\W_]*[*x$#]{2,}[\W_]*a\b",
    r"\bp[\W_]*[*x$#]{2,}[\W_]*d[\W_]*a\b",
    r"\bs[\W_]*pier[\W_]*[*x$#]{2,}[\W_]*aj\b",
];

/// `kurwa` becomes `\bk[\W_]*u[\W_]*r[\W_]*w[\W_]*a[\W_]*\b`.
fn fuzzy_pattern(word: &str) -> String {
    let body: String = word
        .chars()
        .map(|ch| format!("{}[\\W_]*", regex::escape(&ch.to_string())))
        .collect();
    format!(r"\b{body}\b")
}

/// Fold one character to its unaccented form.
const fn fold_char(ch: char) -> char {
    match ch {
        'ą' | 'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ć' | 'ç' | 'č' => 'c',
        'ę' | 'è' | 'é' | 'ê' | 'ë' | 'ě' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ł' => 'l',
        'ń' | 'ñ' | 'ň' => 'n',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'ő' => 'o',
        'ś' | 'š' => 's',
        'ù' | 'ú' | 'û' | 'ü' | 'ů' | 'ű' => 'u',
        'ý' | 'ÿ' => 'y',
        'ż' | 'ź' | 'ž' => 'z',
        other => other,
    }
}

/// Trim, lowercase, and strip diacritics.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase().chars().map(fold_char).collect()
}

/// Compiled profanity patterns.
#[derive(Debug, Clone)]
pub struct ProfanityFilter {
    patterns: Vec<Regex>,
}

impl ProfanityFilter {
    /// Compile the built-in word list and masked patterns.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Pattern`] if a pattern fails to compile.
    pub fn new() -> Result<Self, AiError> {
        let sources = BLOCKED_WORDS
            .iter()
            .map(|word| fuzzy_pattern(word))
            .chain(MASKED_PATTERNS.iter().map(|p| (*p).to_owned()));

        let patterns = sources
            .map(|source| RegexBuilder::new(&source).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    fn matches_raw(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }

    /// Whether the text, as written or normalized, contains profanity.
    pub fn is_profane(&self, text: &str) -> bool {
        self.matches_raw(text) || self.matches_raw(&normalize(text))
    }
}

/// Decides whether user text may be published.
pub struct Moderator {
    filter: ProfanityFilter,
    classifier: Option<Classifier>,
}

struct Classifier {
    backend: Arc<dyn CompletionBackend>,
    prompts: Arc<PromptEngine>,
}

impl Moderator {
    /// A moderator using only the profanity filter.
    pub const fn new(filter: ProfanityFilter) -> Self {
        Self {
            filter,
            classifier: None,
        }
    }

    /// Add an LLM classifier consulted for text the filter lets through.
    #[must_use]
    pub fn with_classifier(
        mut self,
        backend: Arc<dyn CompletionBackend>,
        prompts: Arc<PromptEngine>,
    ) -> Self {
        self.classifier = Some(Classifier { backend, prompts });
        self
    }

    /// Whether an LLM classifier is attached.
    pub const fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    /// `true` if the text may be published.
    ///
    /// Missing or blank text is always allowed.
    pub async fn allows(&self, text: Option<&str>) -> bool {
        let text = text.map(str::trim).unwrap_or_default();
        if text.is_empty() {
            return true;
        }

        if self.filter.is_profane(text) {
            tracing::info!(chars = text.chars().count(), "Text blocked by profanity filter");
            return false;
        }

        let Some(classifier) = &self.classifier else {
            return true;
        };
        classifier.allows(text).await
    }
}

impl Classifier {
    async fn allows(&self, text: &str) -> bool {
        let verdict = match self.prompts.moderation(text) {
            Ok(prompt) => self
                .backend
                .complete(&prompt, CompletionOptions::MODERATION)
                .await
                .and_then(|raw| parse_verdict(&raw)),
            Err(e) => Err(e),
        };

        match verdict {
            Ok(verdict) => {
                if !verdict.allowed {
                    tracing::info!(
                        categories = ?verdict.categories,
                        reasoning = %verdict.reasoning,
                        "Text blocked by moderation classifier"
                    );
                }
                verdict.allowed
            }
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    error = %e,
                    "Moderation classifier failed, allowing text"
                );
                true
            }
        }
    }
}
