//! Reply dispatch
//!
//! Turns one recognized utterance into one assistant reply: record the user
//! turn, ask the chat backend, record the reply, then speak it.

use std::sync::Arc;

use crate::chat::ChatCompletion;
use crate::conversation::ConversationSession;
use crate::speech::SpeechSynthesizer;
use crate::{Error, Result};

/// What happened to a dispatched utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The reply was recorded and spoken
    Spoken(String),
    /// The reply was recorded but synthesis failed
    Unspoken(String),
    /// The session had already ended; nothing was recorded
    Skipped,
}

impl DispatchOutcome {
    /// Reply text, if one was produced
    #[must_use]
    pub fn reply(&self) -> Option<&str> {
        match self {
            Self::Spoken(reply) | Self::Unspoken(reply) => Some(reply),
            Self::Skipped => None,
        }
    }
}

/// Sends user turns to the chat backend and speaks the replies
pub struct ResponseDispatcher {
    chat: Arc<dyn ChatCompletion>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl ResponseDispatcher {
    /// Create a dispatcher over the given collaborators
    #[must_use]
    pub fn new(chat: Arc<dyn ChatCompletion>, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self { chat, synthesizer }
    }

    /// Dispatch one utterance
    ///
    /// On chat failure the user turn stays in the session so the next request
    /// resends it. Synthesis failures are logged and do not affect the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChatService`] if the chat backend fails
    pub async fn dispatch(
        &self,
        text: &str,
        session: &mut ConversationSession,
    ) -> Result<DispatchOutcome> {
        if session.is_ended() {
            caller_misuse(&Error::CallerMisuse(
                "dispatch requested after the conversation ended".to_string(),
            ));
            return Ok(DispatchOutcome::Skipped);
        }

        if let Err(e) = session.append_user(text) {
            caller_misuse(&e);
            return Ok(DispatchOutcome::Skipped);
        }

        let reply = self
            .chat
            .complete(&session.snapshot_for_request(), session.max_reply_tokens())
            .await
            .map_err(|e| match e {
                Error::ChatService(_) => e,
                other => Error::ChatService(other.to_string()),
            })?;

        tracing::info!(reply = %reply, "customer replied");

        if let Err(e) = session.append_assistant(reply.as_str()) {
            caller_misuse(&e);
            return Ok(DispatchOutcome::Skipped);
        }

        match self.synthesizer.synthesize(&reply).await {
            Ok(result) => {
                tracing::debug!(audio_bytes = result.audio_bytes, "reply spoken");
                Ok(DispatchOutcome::Spoken(reply))
            }
            Err(e) => {
                tracing::error!(error = %e, "speech synthesis failed");
                Ok(DispatchOutcome::Unspoken(reply))
            }
        }
    }
}

/// Appending to an ended session is a logic fault: fatal in debug builds, logged otherwise
fn caller_misuse(err: &Error) {
    tracing::error!(error = %err, "conversation misuse");
    if cfg!(debug_assertions) {
        panic!("{err}");
    }
}
