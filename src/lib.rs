//! Sales Voice Coach - spoken role-play practice for insurance salespeople
//!
//! The trainee talks into the microphone; speech is recognized (and optionally
//! translated), forwarded to a chat model playing a prospective customer, and
//! the reply is spoken back. Saying the stop phrase ends the call.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Microphone  │  Speakers                 │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              RecognitionOrchestrator                 │
//! │   classify  │  stop check  │  ResponseDispatcher     │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Azure services                       │
//! │   Speech (STT/TTS)  │  Translator  │  OpenAI chat    │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod chat;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod orchestrator;
pub mod persona;
pub mod recognition;
pub mod speech;
pub mod voice;

pub use chat::{AzureOpenAiChat, ChatCompletion};
pub use config::Config;
pub use conversation::{ConversationSession, ConversationTurn, Role, StopMatch, StopPolicy};
pub use dispatch::{DispatchOutcome, ResponseDispatcher};
pub use error::{Error, Result};
pub use orchestrator::{OrchestratorState, RecognitionMode, RecognitionOrchestrator};
pub use persona::CustomerProfile;
pub use recognition::{
    OutcomeCategory, RawRecognitionResult, RecognitionEvent, RecognitionOutcome, Termination,
    classify,
};
pub use speech::{
    AzureSpeech, ContinuousRecognizer, SpeechRecognizer, SpeechSynthesizer, SynthesisResult,
    Translation, Translator,
};
