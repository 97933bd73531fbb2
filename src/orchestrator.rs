//! Recognition orchestrator
//!
//! Drives one coaching conversation: listen, classify, then either dispatch a
//! reply or stop. In continuous mode the recognizer pushes events onto a
//! channel and this loop is the only consumer, so the session has a single
//! writer.

use serde::Deserialize;
use tokio::sync::mpsc;

use crate::conversation::{ConversationSession, StopPolicy};
use crate::dispatch::ResponseDispatcher;
use crate::recognition::{
    CancellationDetails, CancellationReason, CompletionSignal, EventSink, OutcomeCategory,
    RawRecognitionResult, RecognitionEvent, RecognitionOutcome, Termination, classify,
};
use crate::speech::{ContinuousRecognizer, SpeechRecognizer};
use crate::Result;

/// Pause after a listen call fails outright (device errors)
const LISTEN_RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(1);

/// How speech is collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RecognitionMode {
    /// One listen call per utterance
    #[default]
    OneShot,
    /// Background stream of recognition events
    Continuous,
}

impl std::fmt::Display for RecognitionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneShot => f.write_str("one-shot"),
            Self::Continuous => f.write_str("continuous"),
        }
    }
}

impl std::str::FromStr for RecognitionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "one-shot" | "oneshot" | "one_shot" => Ok(Self::OneShot),
            "continuous" => Ok(Self::Continuous),
            other => Err(format!(
                "unknown recognition mode '{other}' (expected one-shot or continuous)"
            )),
        }
    }
}

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// Constructed, not yet listening
    Idle,
    /// Waiting for the recognizer
    Listening,
    /// Classifying a raw result
    Classifying,
    /// Waiting for a reply to be produced and spoken
    Dispatching,
    /// Ending the conversation after the stop phrase
    Stopping,
    /// No further listen cycles will be issued
    Terminated,
}

/// Runs the listen / classify / dispatch loop for one conversation
pub struct RecognitionOrchestrator {
    session: ConversationSession,
    stop_policy: StopPolicy,
    dispatcher: Option<ResponseDispatcher>,
    shutdown: Option<mpsc::Receiver<()>>,
    state: OrchestratorState,
}

impl RecognitionOrchestrator {
    /// Create an orchestrator
    ///
    /// Without a dispatcher recognized speech is only logged (transcribe-only).
    #[must_use]
    pub fn new(
        session: ConversationSession,
        stop_policy: StopPolicy,
        dispatcher: Option<ResponseDispatcher>,
    ) -> Self {
        Self {
            session,
            stop_policy,
            dispatcher,
            shutdown: None,
            state: OrchestratorState::Idle,
        }
    }

    /// End the conversation when a message arrives on `shutdown`
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: mpsc::Receiver<()>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Conversation so far
    #[must_use]
    pub const fn session(&self) -> &ConversationSession {
        &self.session
    }

    /// Consume the orchestrator, returning the conversation
    #[must_use]
    pub fn into_session(self) -> ConversationSession {
        self.session
    }

    /// Run in the given mode until the conversation terminates
    ///
    /// # Errors
    ///
    /// Returns error if continuous recognition cannot be started
    pub async fn run<S>(&mut self, mode: RecognitionMode, speech: &S) -> Result<Termination>
    where
        S: SpeechRecognizer + ContinuousRecognizer + ?Sized,
    {
        tracing::info!(%mode, assistant = self.dispatcher.is_some(), "conversation started");
        match mode {
            RecognitionMode::OneShot => Ok(self.run_one_shot(speech).await),
            RecognitionMode::Continuous => self.run_continuous(speech).await,
        }
    }

    /// One-shot loop: one listen call per cycle, strictly sequential
    ///
    /// Errors from a single cycle are logged and the loop keeps listening.
    pub async fn run_one_shot<R>(&mut self, recognizer: &R) -> Termination
    where
        R: SpeechRecognizer + ?Sized,
    {
        let mut shutdown = self.shutdown.take();

        let termination = loop {
            self.state = OrchestratorState::Listening;

            let listened = tokio::select! {
                result = recognizer.listen_once() => result,
                () = interrupted(&mut shutdown) => break Termination::Interrupted,
            };

            let raw = match listened {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::error!(error = %e, "listen failed");
                    tokio::time::sleep(LISTEN_RETRY_DELAY).await;
                    RawRecognitionResult::canceled(CancellationDetails::error(
                        "ListenFailure",
                        e.to_string(),
                    ))
                }
            };

            if let Some(termination) = self
                .handle_outcome(classify(raw), RecognitionMode::OneShot)
                .await
            {
                break termination;
            }
        };

        self.shutdown = shutdown;
        self.terminate(&termination);
        termination
    }

    /// Continuous loop: consume recognizer events until the stream closes
    ///
    /// The first terminal event (stop phrase, cancellation, session stopped or
    /// interrupt) fulfils the completion signal and stops the recognizer. Events
    /// still queued after that are drained without affecting the session.
    ///
    /// # Errors
    ///
    /// Returns error if continuous recognition cannot be started
    pub async fn run_continuous<R>(&mut self, recognizer: &R) -> Result<Termination>
    where
        R: ContinuousRecognizer + ?Sized,
    {
        let (sink, mut events) = EventSink::channel();
        let completion = CompletionSignal::new();

        self.state = OrchestratorState::Listening;
        if let Err(e) = recognizer.start_continuous(sink).await {
            self.state = OrchestratorState::Terminated;
            return Err(e);
        }

        let mut shutdown = self.shutdown.take();

        loop {
            let next = tokio::select! {
                event = events.recv() => event,
                () = interrupted(&mut shutdown) => Some(RecognitionEvent::Canceled(
                    CancellationDetails {
                        reason: CancellationReason::CancelledByUser,
                        error_code: None,
                        error_details: "interrupted".to_string(),
                    },
                )),
            };

            let Some(event) = next else {
                // Stream closed without a terminal event (recognizer gone)
                if completion.complete(Termination::SessionStopped) {
                    tracing::warn!("recognition stream closed unexpectedly");
                    self.terminate(&Termination::SessionStopped);
                    if let Err(e) = recognizer.stop_continuous().await {
                        tracing::error!(error = %e, "failed to stop continuous recognition");
                    }
                }
                break;
            };

            let Some(termination) = self.handle_event(event, &completion).await else {
                continue;
            };

            if !completion.complete(termination.clone()) {
                continue;
            }

            self.terminate(&termination);
            if let Err(e) = recognizer.stop_continuous().await {
                tracing::error!(error = %e, "failed to stop continuous recognition");
                break;
            }
        }

        self.shutdown = shutdown;
        self.state = OrchestratorState::Terminated;

        Ok(completion.get().unwrap_or(Termination::SessionStopped))
    }

    async fn handle_event(
        &mut self,
        event: RecognitionEvent,
        completion: &CompletionSignal,
    ) -> Option<Termination> {
        match event {
            RecognitionEvent::SessionStarted => {
                tracing::info!("recognition session started");
                None
            }
            RecognitionEvent::Recognizing {
                text,
                detected_language,
            } => {
                tracing::debug!(text = %text, language = ?detected_language, "recognizing");
                None
            }
            RecognitionEvent::Recognized(raw) => {
                if completion.is_complete() {
                    tracing::debug!(text = %raw.text, "result after termination ignored");
                    return None;
                }
                self.handle_outcome(classify(raw), RecognitionMode::Continuous)
                    .await
            }
            RecognitionEvent::Canceled(details) => match details.reason {
                CancellationReason::Error => {
                    log_cancellation(&details);
                    Some(Termination::Canceled(details))
                }
                CancellationReason::CancelledByUser => Some(Termination::Interrupted),
                CancellationReason::EndOfStream => Some(Termination::EndOfStream),
            },
            RecognitionEvent::SessionStopped => {
                tracing::info!("recognition session stopped");
                Some(Termination::SessionStopped)
            }
        }
    }

    /// Apply one classified outcome; returns the termination if the loop must end
    async fn handle_outcome(
        &mut self,
        outcome: RecognitionOutcome,
        mode: RecognitionMode,
    ) -> Option<Termination> {
        self.state = OrchestratorState::Classifying;

        match outcome.category {
            OutcomeCategory::Recognized => {
                if self.is_stop(&outcome) {
                    self.state = OrchestratorState::Stopping;
                    self.session.mark_ended();
                    return Some(Termination::StopPhrase);
                }

                let text = outcome.text.trim();
                if text.is_empty() {
                    tracing::debug!("empty recognition discarded");
                    return None;
                }

                tracing::info!(
                    text,
                    language = ?outcome.detected_language,
                    translations = ?outcome.translations,
                    "recognized speech"
                );
                self.dispatch(text).await;
                None
            }
            OutcomeCategory::NoMatch => {
                tracing::info!("speech could not be recognized");
                None
            }
            OutcomeCategory::CanceledError(details) => {
                log_cancellation(&details);
                match mode {
                    RecognitionMode::OneShot => None,
                    RecognitionMode::Continuous => Some(Termination::Canceled(details)),
                }
            }
            OutcomeCategory::CanceledEnd => Some(Termination::EndOfStream),
        }
    }

    fn is_stop(&self, outcome: &RecognitionOutcome) -> bool {
        outcome.stop_candidates().any(|(language, text)| {
            let matched = self.stop_policy.is_stop(text);
            if matched {
                tracing::info!(
                    language = language.unwrap_or("source"),
                    text,
                    "stop phrase recognized"
                );
            }
            matched
        })
    }

    async fn dispatch(&mut self, text: &str) {
        let Some(dispatcher) = &self.dispatcher else {
            return;
        };
        if self.session.is_ended() {
            tracing::warn!(text, "conversation already ended; utterance dropped");
            return;
        }

        self.state = OrchestratorState::Dispatching;
        match dispatcher.dispatch(text, &mut self.session).await {
            Ok(outcome) => tracing::debug!(?outcome, "utterance dispatched"),
            Err(e) => tracing::error!(error = %e, "no reply; turn left unanswered"),
        }
    }

    fn terminate(&mut self, termination: &Termination) {
        self.session.mark_ended();
        self.state = OrchestratorState::Terminated;
        tracing::info!(
            reason = %termination,
            turns = self.session.exchanged().len(),
            "conversation terminated"
        );
    }
}

fn log_cancellation(details: &CancellationDetails) {
    tracing::warn!(
        reason = ?details.reason,
        code = details.error_code.as_deref().unwrap_or("none"),
        details = %details.error_details,
        hint = "did you set the speech key and region?",
        "recognition canceled"
    );
}

/// Resolves when the shutdown channel delivers a message; never if absent or closed
async fn interrupted(shutdown: &mut Option<mpsc::Receiver<()>>) {
    if let Some(rx) = shutdown {
        if rx.recv().await.is_some() {
            return;
        }
        *shutdown = None;
    }
    std::future::pending::<()>().await;
}
