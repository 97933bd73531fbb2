//! Conversation state
//!
//! Holds the turn history sent to the chat backend and the policy that
//! decides when the trainee has ended the conversation.

mod session;
mod stop;

pub use session::{ConversationSession, ConversationTurn, Role};
pub use stop::{DEFAULT_STOP_PHRASE, StopMatch, StopPolicy, normalize_utterance};
