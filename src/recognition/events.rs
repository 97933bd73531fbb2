//! Continuous recognition events and completion signalling

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use super::{CancellationDetails, RawRecognitionResult};

/// Event delivered by a continuous recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// The recognition session opened
    SessionStarted,
    /// Interim hypothesis; informational only
    Recognizing {
        /// Partial text (may be empty when only speech activity is known)
        text: String,
        /// Language detected so far
        detected_language: Option<String>,
    },
    /// Final result; drives the conversation state machine
    Recognized(RawRecognitionResult),
    /// The stream was canceled by the collaborator
    Canceled(CancellationDetails),
    /// The recognition session closed
    SessionStopped,
}

/// Sending half handed to a continuous recognizer
///
/// Recognizers may emit from any thread. The orchestrator is the only consumer.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<RecognitionEvent>,
}

impl EventSink {
    /// Create a sink and its receiving half
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RecognitionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit an event
    ///
    /// Returns false once the consumer has gone away.
    pub fn emit(&self, event: RecognitionEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Whether the consumer has gone away
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Why a conversation terminated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The trainee said the stop phrase
    StopPhrase,
    /// The speech collaborator failed and the stream is unusable
    Canceled(CancellationDetails),
    /// The audio stream ended cleanly
    EndOfStream,
    /// The recognition session closed
    SessionStopped,
    /// The process was interrupted
    Interrupted,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StopPhrase => f.write_str("stop phrase"),
            Self::Canceled(details) => write!(f, "canceled: {}", details.error_details),
            Self::EndOfStream => f.write_str("end of stream"),
            Self::SessionStopped => f.write_str("session stopped"),
            Self::Interrupted => f.write_str("interrupted"),
        }
    }
}

/// Completion signal fulfilled exactly once
///
/// Several terminal events can race (stop phrase, cancellation, session
/// stopped). The first call to [`complete`](Self::complete) wins and later
/// calls are no-ops.
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    tx: Arc<watch::Sender<Option<Termination>>>,
}

impl CompletionSignal {
    /// Create an unfulfilled signal
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Fulfil the signal
    ///
    /// Returns true if this call was the first writer.
    pub fn complete(&self, termination: Termination) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(termination);
            true
        })
    }

    /// The winning termination, if any
    #[must_use]
    pub fn get(&self) -> Option<Termination> {
        self.tx.borrow().clone()
    }

    /// Whether the signal has been fulfilled
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Wait until the signal is fulfilled
    pub async fn wait(&self) -> Termination {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(termination) = rx.borrow_and_update().clone() {
                return termination;
            }
            // The sender lives in `self`, so `changed` cannot fail here
            if rx.changed().await.is_err() {
                return Termination::SessionStopped;
            }
        }
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}
