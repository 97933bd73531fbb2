//! TOML configuration file loading
//!
//! Supports `~/.config/omni/voicecoach/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.
//! Credentials are never read from the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;
use crate::conversation::StopMatch;
use crate::orchestrator::RecognitionMode;
use crate::persona::CustomerProfile;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct CoachConfigFile {
    /// Speech service settings
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// Chat completion settings
    #[serde(default)]
    pub chat: ChatFileConfig,

    /// Conversation settings
    #[serde(default)]
    pub conversation: ConversationFileConfig,
}

/// Speech recognition and synthesis configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// Service region (e.g. "westeurope")
    pub region: Option<String>,

    /// Recognition language (e.g. "en-US")
    pub language: Option<String>,

    /// Candidate languages for automatic detection
    pub detect_languages: Option<Vec<String>>,

    /// Translation target languages
    pub translate_to: Option<Vec<String>>,

    /// Synthesis voice name
    pub voice: Option<String>,
}

/// Chat completion configuration
#[derive(Debug, Default, Deserialize)]
pub struct ChatFileConfig {
    /// Resource endpoint
    pub endpoint: Option<String>,

    /// Model deployment name
    pub deployment: Option<String>,

    /// API version query parameter
    pub api_version: Option<String>,

    /// Reply token budget
    pub max_tokens: Option<u32>,
}

/// Conversation configuration
#[derive(Debug, Default, Deserialize)]
pub struct ConversationFileConfig {
    /// Simulated customer profile
    pub profile: Option<CustomerProfile>,

    /// Phrase that ends the conversation
    pub stop_phrase: Option<String>,

    /// Stop phrase comparison mode
    pub stop_match: Option<StopMatch>,

    /// One-shot or continuous recognition
    pub mode: Option<RecognitionMode>,
}

/// Load the TOML config file from the standard path
///
/// Returns `CoachConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> CoachConfigFile {
    let Some(path) = config_file_path() else {
        return CoachConfigFile::default();
    };

    if !path.exists() {
        return CoachConfigFile::default();
    }

    match read_config_file(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            CoachConfigFile::default()
        }
    }
}

/// Read and parse an explicit config file
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed
pub fn read_config_file(path: &Path) -> Result<CoachConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Return the config file path: `~/.config/omni/voicecoach/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| {
        d.config_dir()
            .join("omni")
            .join("voicecoach")
            .join("config.toml")
    })
}
