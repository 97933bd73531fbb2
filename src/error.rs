//! Error types for the voice coach

use thiserror::Error;

/// Result type alias for voice coach operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a coaching conversation
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Speech collaborator could not produce a recognition result at all
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Chat completion service failed (network, auth, quota)
    #[error("chat service error: {0}")]
    ChatService(String),

    /// Speech synthesis failed
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Translation service failed
    #[error("translation error: {0}")]
    Translation(String),

    /// Audio device or codec error
    #[error("audio error: {0}")]
    Audio(String),

    /// Conversation mutated after it ended
    #[error("caller misuse: {0}")]
    CallerMisuse(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
