//! Configuration management for the voice coach
//!
//! Settings come from (highest priority first) CLI overrides, environment
//! variables, the optional TOML file, then built-in defaults. Credentials are
//! only read from the environment.

pub mod file;

use std::path::PathBuf;

use secrecy::SecretString;

use crate::conversation::{DEFAULT_STOP_PHRASE, StopMatch, StopPolicy, normalize_utterance};
use crate::orchestrator::RecognitionMode;
use crate::persona::CustomerProfile;
use crate::{Error, Result};

use file::CoachConfigFile;

/// Default reply token budget
pub const DEFAULT_MAX_TOKENS: u32 = 100;

/// Default chat model deployment
pub const DEFAULT_DEPLOYMENT: &str = "gpt4";

/// Default chat API version
pub const DEFAULT_API_VERSION: &str = "2024-02-01";

/// Default recognition language
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Default synthesis voice
pub const DEFAULT_VOICE: &str = "en-US-JennyMultilingualNeural";

/// Voice coach configuration
#[derive(Debug)]
pub struct Config {
    /// Speech service configuration
    pub speech: SpeechConfig,

    /// Chat backend configuration (absent in transcribe-only mode)
    pub chat: Option<ChatConfig>,

    /// Conversation behavior
    pub conversation: ConversationConfig,
}

/// Speech recognition, translation and synthesis configuration
#[derive(Debug)]
pub struct SpeechConfig {
    /// Subscription key (`SPEECH_KEY`)
    pub key: SecretString,

    /// Service region (`SPEECH_REGION`)
    pub region: String,

    /// Recognition language when automatic detection is off
    pub language: String,

    /// Candidate languages for automatic detection (first is used for recognition)
    pub detect_languages: Vec<String>,

    /// Translation target languages
    pub translate_to: Vec<String>,

    /// Synthesis voice name
    pub voice: String,
}

impl SpeechConfig {
    /// Language used to recognize speech
    #[must_use]
    pub fn recognition_language(&self) -> &str {
        self.detect_languages
            .first()
            .map_or(self.language.as_str(), String::as_str)
    }

    /// Whether language detection or translation is requested
    #[must_use]
    pub fn wants_translation(&self) -> bool {
        !self.detect_languages.is_empty() || !self.translate_to.is_empty()
    }
}

/// Chat completion configuration
#[derive(Debug)]
pub struct ChatConfig {
    /// API key (`OPEN_AI_KEY`)
    pub key: SecretString,

    /// Resource endpoint (`OPEN_AI_ENDPOINT`)
    pub endpoint: String,

    /// Model deployment name
    pub deployment: String,

    /// API version query parameter
    pub api_version: String,
}

/// Conversation configuration
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Simulated customer profile
    pub profile: CustomerProfile,

    /// Phrase that ends the conversation
    pub stop_phrase: String,

    /// Stop phrase comparison mode
    pub stop_match: StopMatch,

    /// One-shot or continuous recognition
    pub mode: RecognitionMode,

    /// Reply token budget
    pub max_tokens: u32,

    /// Forward recognized speech to the chat backend and speak replies
    pub assistant: bool,
}

impl ConversationConfig {
    /// Stop policy for this conversation
    #[must_use]
    pub fn stop_policy(&self) -> StopPolicy {
        StopPolicy::new(self.stop_phrase.clone(), self.stop_match)
    }
}

/// Options supplied by the command line
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path
    pub config_path: Option<PathBuf>,

    /// Profile override
    pub profile: Option<CustomerProfile>,

    /// Mode override
    pub mode: Option<RecognitionMode>,

    /// Run without the chat backend
    pub transcribe_only: bool,
}

impl Config {
    /// Load configuration from the process environment and config file
    ///
    /// # Errors
    ///
    /// Returns error if credentials are missing or a value is invalid
    pub fn load(options: &LoadOptions) -> Result<Self> {
        let file = match &options.config_path {
            Some(path) => file::read_config_file(path)?,
            None => file::load_config_file(),
        };
        Self::from_sources(options, file, |name| std::env::var(name).ok())
    }

    /// Build configuration from explicit sources
    ///
    /// # Errors
    ///
    /// Returns error if credentials are missing or a value is invalid
    pub fn from_sources<F>(options: &LoadOptions, file: CoachConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let speech = SpeechConfig {
            key: require(&var, "SPEECH_KEY")?.into(),
            region: var("SPEECH_REGION")
                .or(file.speech.region)
                .ok_or_else(|| missing("SPEECH_REGION"))?,
            language: var("VOICECOACH_LANGUAGE")
                .or(file.speech.language)
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            detect_languages: var("VOICECOACH_DETECT_LANGUAGES")
                .map(|v| split_list(&v))
                .or(file.speech.detect_languages)
                .unwrap_or_default(),
            translate_to: var("VOICECOACH_TRANSLATE_TO")
                .map(|v| split_list(&v))
                .or(file.speech.translate_to)
                .unwrap_or_default(),
            voice: var("VOICECOACH_VOICE")
                .or(file.speech.voice)
                .unwrap_or_else(|| DEFAULT_VOICE.to_string()),
        };

        let max_tokens = match var("VOICECOACH_MAX_TOKENS") {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("VOICECOACH_MAX_TOKENS is not a number: {v}")))?,
            None => file.chat.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        };

        let chat = if options.transcribe_only {
            None
        } else {
            Some(ChatConfig {
                key: require(&var, "OPEN_AI_KEY")?.into(),
                endpoint: var("OPEN_AI_ENDPOINT")
                    .or(file.chat.endpoint)
                    .ok_or_else(|| missing("OPEN_AI_ENDPOINT"))?,
                deployment: var("OPEN_AI_DEPLOYMENT")
                    .or(file.chat.deployment)
                    .unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string()),
                api_version: var("OPEN_AI_API_VERSION")
                    .or(file.chat.api_version)
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            })
        };

        let profile = match (options.profile, var("VOICECOACH_PROFILE")) {
            (Some(profile), _) => profile,
            (None, Some(v)) => v.parse().map_err(Error::Config)?,
            (None, None) => file.conversation.profile.unwrap_or_default(),
        };

        let stop_match = match var("VOICECOACH_STOP_MATCH") {
            Some(v) => v.parse().map_err(Error::Config)?,
            None => file.conversation.stop_match.unwrap_or_default(),
        };

        let mode = match (options.mode, var("VOICECOACH_MODE")) {
            (Some(mode), _) => mode,
            (None, Some(v)) => v.parse().map_err(Error::Config)?,
            (None, None) => file.conversation.mode.unwrap_or_default(),
        };

        // The stop phrase may legitimately be whitespace-padded, so read it raw
        let stop_phrase = env("VOICECOACH_STOP_PHRASE")
            .or(file.conversation.stop_phrase)
            .unwrap_or_else(|| DEFAULT_STOP_PHRASE.to_string());
        if normalize_utterance(&stop_phrase).is_empty() {
            return Err(Error::Config(format!(
                "stop phrase {stop_phrase:?} is empty after normalization"
            )));
        }

        let conversation = ConversationConfig {
            profile,
            stop_phrase,
            stop_match,
            mode,
            max_tokens,
            assistant: !options.transcribe_only,
        };

        Ok(Self {
            speech,
            chat,
            conversation,
        })
    }
}

fn require<F>(var: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    var(name).ok_or_else(|| missing(name))
}

fn missing(name: &str) -> Error {
    Error::Config(format!("{name} environment variable is required"))
}

/// Split a comma separated list, dropping empty entries
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
