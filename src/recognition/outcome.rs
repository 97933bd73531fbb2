//! Recognition result classification

use indexmap::IndexMap;

/// Reason code reported by the speech collaborator for a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultReason {
    /// Final recognition in the source language
    RecognizedSpeech,
    /// Final recognition with translations attached
    TranslatedSpeech,
    /// Audio contained no recognizable speech
    NoMatch,
    /// Recognition was canceled (see [`CancellationDetails`])
    Canceled,
    /// Interim hypothesis
    RecognizingSpeech,
    /// Interim hypothesis with translations
    TranslatingSpeech,
    /// Any reason code this crate does not know about
    Unknown(String),
}

/// Why recognition was canceled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationReason {
    /// Collaborator failure (bad credentials, network loss, ...)
    Error,
    /// The audio stream ended
    EndOfStream,
    /// The caller stopped recognition
    CancelledByUser,
}

/// Details attached to a canceled result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationDetails {
    /// Cancellation reason
    pub reason: CancellationReason,
    /// Collaborator error code, if any
    pub error_code: Option<String>,
    /// Human readable error details
    pub error_details: String,
}

impl CancellationDetails {
    /// Cancellation caused by a collaborator error
    #[must_use]
    pub fn error(code: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            reason: CancellationReason::Error,
            error_code: Some(code.into()),
            error_details: details.into(),
        }
    }

    /// Clean end of the audio stream
    #[must_use]
    pub fn end_of_stream() -> Self {
        Self {
            reason: CancellationReason::EndOfStream,
            error_code: None,
            error_details: String::new(),
        }
    }
}

/// Opaque result handed over by the speech collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecognitionResult {
    /// Reason code
    pub reason: ResultReason,
    /// Recognized text (may be empty)
    pub text: String,
    /// Language identified by automatic detection
    pub detected_language: Option<String>,
    /// Target language tag to translated text, in service order
    pub translations: IndexMap<String, String>,
    /// Present when `reason` is [`ResultReason::Canceled`]
    pub cancellation: Option<CancellationDetails>,
}

impl RawRecognitionResult {
    fn with_reason(reason: ResultReason, text: impl Into<String>) -> Self {
        Self {
            reason,
            text: text.into(),
            detected_language: None,
            translations: IndexMap::new(),
            cancellation: None,
        }
    }

    /// Final recognized speech
    #[must_use]
    pub fn recognized(text: impl Into<String>) -> Self {
        Self::with_reason(ResultReason::RecognizedSpeech, text)
    }

    /// Final recognized speech with translations
    #[must_use]
    pub fn translated<K, V>(
        text: impl Into<String>,
        detected_language: impl Into<String>,
        translations: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut result = Self::with_reason(ResultReason::TranslatedSpeech, text);
        result.detected_language = Some(detected_language.into());
        result.translations = translations
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        result
    }

    /// No speech recognized
    #[must_use]
    pub fn no_match() -> Self {
        Self::with_reason(ResultReason::NoMatch, "")
    }

    /// Canceled recognition
    #[must_use]
    pub fn canceled(details: CancellationDetails) -> Self {
        let mut result = Self::with_reason(ResultReason::Canceled, "");
        result.cancellation = Some(details);
        result
    }

    /// Result with a reason code outside the known set
    #[must_use]
    pub fn unknown(code: impl Into<String>) -> Self {
        Self::with_reason(ResultReason::Unknown(code.into()), "")
    }

    /// Attach a detected language
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.detected_language = Some(language.into());
        self
    }
}

/// Semantic category of a recognition result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeCategory {
    /// Final text is available
    Recognized,
    /// Nothing recognizable was said
    NoMatch,
    /// Collaborator failure; carries code and details for surfacing
    CanceledError(CancellationDetails),
    /// The stream ended without an error
    CanceledEnd,
}

/// Classified result of one listen cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionOutcome {
    /// Category
    pub category: OutcomeCategory,
    /// Recognized utterance (may be empty)
    pub text: String,
    /// Language identified by automatic detection
    pub detected_language: Option<String>,
    /// Target language tag to translated text
    pub translations: IndexMap<String, String>,
}

impl RecognitionOutcome {
    /// Whether translations were attached to this outcome
    #[must_use]
    pub fn is_translated(&self) -> bool {
        !self.translations.is_empty()
    }

    /// Texts that must be checked against the stop phrase
    ///
    /// The original text comes first, followed by every translation into a
    /// language other than the detected source language. A translation into the
    /// source language itself is skipped.
    pub fn stop_candidates(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        let detected = self.detected_language.as_deref();
        std::iter::once((None, self.text.as_str())).chain(
            self.translations
                .iter()
                .filter(move |(lang, _)| !is_same_language(detected, lang))
                .map(|(lang, text)| (Some(lang.as_str()), text.as_str())),
        )
    }
}

/// Whether translating from `detected` into `target` is a same-language no-op
///
/// Compares by case-insensitive prefix so `de-DE` matches the target `de`.
#[must_use]
pub fn is_same_language(detected: Option<&str>, target: &str) -> bool {
    detected.is_some_and(|d| d.to_lowercase().starts_with(&target.to_lowercase()))
}

/// Map a raw collaborator result to a [`RecognitionOutcome`]
///
/// Unknown and interim reason codes classify as [`OutcomeCategory::CanceledError`].
#[must_use]
pub fn classify(raw: RawRecognitionResult) -> RecognitionOutcome {
    let category = match raw.reason {
        ResultReason::RecognizedSpeech | ResultReason::TranslatedSpeech => {
            OutcomeCategory::Recognized
        }
        ResultReason::NoMatch => OutcomeCategory::NoMatch,
        ResultReason::Canceled => match raw.cancellation {
            Some(details) => match details.reason {
                CancellationReason::Error => OutcomeCategory::CanceledError(details),
                CancellationReason::EndOfStream | CancellationReason::CancelledByUser => {
                    OutcomeCategory::CanceledEnd
                }
            },
            None => OutcomeCategory::CanceledError(CancellationDetails::error(
                "Unknown",
                "canceled without details",
            )),
        },
        ResultReason::RecognizingSpeech | ResultReason::TranslatingSpeech => {
            OutcomeCategory::CanceledError(CancellationDetails::error(
                "UnexpectedReason",
                "interim result delivered as final",
            ))
        }
        ResultReason::Unknown(code) => OutcomeCategory::CanceledError(CancellationDetails::error(
            "UnexpectedReason",
            format!("unexpected result reason: {code}"),
        )),
    };

    RecognitionOutcome {
        category,
        text: raw.text,
        detected_language: raw.detected_language,
        translations: raw.translations,
    }
}
