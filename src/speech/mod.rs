//! Speech collaborators
//!
//! The orchestrator only sees these traits. `AzureSpeech` implements them on
//! top of the Azure Speech REST APIs and the local microphone and speakers.

mod azure;
mod translator;

use async_trait::async_trait;
use indexmap::IndexMap;

pub use azure::{AzureSpeech, INITIAL_SILENCE_TIMEOUT};
pub use translator::AzureTranslator;

use crate::Result;
use crate::recognition::{EventSink, RawRecognitionResult};

/// One-shot recognition: one result per call
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Listen for a single utterance and return its raw result
    ///
    /// Collaborator failures are reported as canceled results, not errors.
    async fn listen_once(&self) -> Result<RawRecognitionResult>;
}

/// Continuous recognition delivering events in the background
#[async_trait]
pub trait ContinuousRecognizer: Send + Sync {
    /// Start recognizing; events are emitted on `sink` from any thread
    async fn start_continuous(&self, sink: EventSink) -> Result<()>;

    /// Stop recognizing
    ///
    /// Implementations emit `SessionStopped` if the session was still open and
    /// drop every clone of the sink before returning.
    async fn stop_continuous(&self) -> Result<()>;
}

/// Result of speaking a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisResult {
    /// Size of the synthesized audio
    pub audio_bytes: usize,
}

/// Text-to-speech through an audio output
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and play it, returning once playback is done
    async fn synthesize(&self, text: &str) -> Result<SynthesisResult>;
}

/// Language identification and translation of recognized text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translation {
    /// Language identified for the source text
    pub detected_language: Option<String>,
    /// Target language tag to translated text
    pub translations: IndexMap<String, String>,
}

/// Text translation collaborator
#[async_trait]
pub trait Translator: Send + Sync {
    /// Detect the language of `text` and translate it into every target
    ///
    /// With no targets only detection is performed.
    async fn translate(&self, text: &str, targets: &[String]) -> Result<Translation>;
}
