//! Stop phrase detection
//!
//! Decides whether a recognized (or translated) utterance ends the conversation.
//! The same comparison is used for every text source so stop behavior never
//! diverges between the direct and the translated paths.

use serde::Deserialize;

/// Default stop phrase
pub const DEFAULT_STOP_PHRASE: &str = "Stop.";

/// How an utterance is compared against the stop phrase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopMatch {
    /// Trimmed, trailing punctuation stripped, case-folded
    #[default]
    Normalized,
    /// Literal string equality
    Exact,
}

impl std::str::FromStr for StopMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normalized" => Ok(Self::Normalized),
            "exact" => Ok(Self::Exact),
            other => Err(format!("unknown stop match mode: {other}")),
        }
    }
}

/// Stop phrase policy
#[derive(Debug, Clone)]
pub struct StopPolicy {
    phrase: String,
    normalized: String,
    mode: StopMatch,
}

impl StopPolicy {
    /// Create a policy for the given stop phrase
    #[must_use]
    pub fn new(phrase: impl Into<String>, mode: StopMatch) -> Self {
        let phrase = phrase.into();
        let normalized = normalize_utterance(&phrase);
        Self {
            phrase,
            normalized,
            mode,
        }
    }

    /// Whether `text` is the stop phrase
    #[must_use]
    pub fn is_stop(&self, text: &str) -> bool {
        match self.mode {
            StopMatch::Normalized => {
                !self.normalized.is_empty() && normalize_utterance(text) == self.normalized
            }
            StopMatch::Exact => !self.phrase.is_empty() && text == self.phrase,
        }
    }

    /// The configured phrase as written
    #[must_use]
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Comparison mode
    #[must_use]
    pub const fn mode(&self) -> StopMatch {
        self.mode
    }
}

impl Default for StopPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_STOP_PHRASE, StopMatch::Normalized)
    }
}

/// Trim whitespace, strip trailing sentence punctuation and case-fold
#[must_use]
pub fn normalize_utterance(text: &str) -> String {
    text.trim()
        .trim_end_matches(|c: char| c.is_whitespace() || is_sentence_punctuation(c))
        .to_lowercase()
}

const fn is_sentence_punctuation(c: char) -> bool {
    matches!(
        c,
        '.' | '!' | '?' | ',' | ';' | ':' | '…' | '。' | '！' | '？' | '¡' | '¿'
    )
}
