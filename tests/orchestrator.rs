//! Conversation orchestration tests
//!
//! Drives whole conversations through scripted recognizers and fake chat and
//! synthesis backends.

use std::sync::Arc;

use sales_voice_coach::recognition::CancellationDetails;
use sales_voice_coach::{
    ConversationSession, ConversationTurn, CustomerProfile, OrchestratorState, RawRecognitionResult,
    RecognitionEvent, RecognitionMode, RecognitionOrchestrator, ResponseDispatcher, Role,
    StopMatch, StopPolicy, Termination,
};
use tokio::sync::mpsc;

mod common;
use common::{
    FakeChat, FakeSynthesizer, PERSONA, ScriptedRecognizer, ScriptedStream, SilentRecognizer,
    coach, persona_session,
};

fn auth_failure() -> CancellationDetails {
    CancellationDetails::error("AuthenticationFailure", "401: invalid subscription key")
}

#[tokio::test]
async fn test_hello_then_stop() {
    let chat = FakeChat::new();
    let synth = FakeSynthesizer::new();
    let recognizer = ScriptedRecognizer::saying(&["Hello", "Stop."]);

    let mut orchestrator = coach(&chat, &synth);
    let termination = orchestrator.run_one_shot(&recognizer).await;

    assert_eq!(termination, Termination::StopPhrase);
    assert_eq!(orchestrator.state(), OrchestratorState::Terminated);

    let session = orchestrator.session();
    assert!(session.is_ended());
    assert_eq!(
        session.turns(),
        &[
            ConversationTurn::system(PERSONA),
            ConversationTurn::user("Hello"),
            ConversationTurn::assistant("Reply 1"),
        ]
    );

    assert_eq!(chat.calls().await, 1);
    assert_eq!(synth.spoken().await, vec!["Reply 1"]);
    assert_eq!(recognizer.listens(), 2);
}

#[tokio::test]
async fn test_stop_phrase_never_reaches_chat() {
    for stop in ["Stop.", "stop", "  STOP!  ", "Stop"] {
        let chat = FakeChat::new();
        let synth = FakeSynthesizer::new();
        let recognizer = ScriptedRecognizer::saying(&[stop]);

        let mut orchestrator = coach(&chat, &synth);
        assert_eq!(
            orchestrator.run_one_shot(&recognizer).await,
            Termination::StopPhrase,
            "{stop:?} should end the conversation"
        );

        assert_eq!(chat.calls().await, 0);
        assert!(orchestrator.session().exchanged().is_empty());
    }
}

#[tokio::test]
async fn test_exact_stop_match_requires_literal() {
    let chat = FakeChat::new();
    let synth = FakeSynthesizer::new();
    let recognizer = ScriptedRecognizer::saying(&["stop", "Stop."]);

    let mut orchestrator = RecognitionOrchestrator::new(
        persona_session(),
        StopPolicy::new("Stop.", StopMatch::Exact),
        Some(ResponseDispatcher::new(chat.clone(), synth.clone())),
    );

    assert_eq!(orchestrator.run_one_shot(&recognizer).await, Termination::StopPhrase);

    // "stop" was treated as ordinary speech
    assert_eq!(chat.calls().await, 1);
    assert_eq!(
        orchestrator.session().exchanged()[0],
        ConversationTurn::user("stop")
    );
}

#[tokio::test]
async fn test_each_utterance_gets_one_reply() {
    let chat = FakeChat::new();
    let synth = FakeSynthesizer::new();
    let recognizer = ScriptedRecognizer::saying(&[
        "Hi, I am calling about your insurance.",
        "Do you have children?",
        "Stop.",
    ]);

    let mut orchestrator = coach(&chat, &synth);
    orchestrator.run_one_shot(&recognizer).await;

    let roles: Vec<Role> = orchestrator
        .session()
        .exchanged()
        .iter()
        .map(|t| t.role)
        .collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    assert_eq!(chat.calls().await, 2);
    assert_eq!(synth.spoken().await, vec!["Reply 1", "Reply 2"]);
}

#[tokio::test]
async fn test_requests_carry_preamble_first_and_token_budget() {
    let chat = FakeChat::new();
    let synth = FakeSynthesizer::new();
    let recognizer = ScriptedRecognizer::saying(&["Hello", "How can I help?", "Stop."]);

    let preamble = CustomerProfile::SelfEmployed.preamble();
    let mut orchestrator = RecognitionOrchestrator::new(
        ConversationSession::new(preamble.clone(), 250),
        StopPolicy::default(),
        Some(ResponseDispatcher::new(chat.clone(), synth.clone())),
    );
    orchestrator.run_one_shot(&recognizer).await;

    let requests = chat.requests().await;
    assert_eq!(requests.len(), 2);

    for (turns, max_tokens) in &requests {
        assert_eq!(*max_tokens, 250);
        assert_eq!(&turns[..preamble.len()], preamble.as_slice());
    }

    let (second, _) = &requests[1];
    assert_eq!(second.last(), Some(&ConversationTurn::user("How can I help?")));
    assert_eq!(second.len(), preamble.len() + 3);
}

#[tokio::test]
async fn test_no_match_leaves_session_untouched() {
    let chat = FakeChat::new();
    let synth = FakeSynthesizer::new();
    let recognizer = ScriptedRecognizer::new([
        RawRecognitionResult::no_match(),
        RawRecognitionResult::no_match(),
        RawRecognitionResult::recognized("Stop."),
    ]);

    let mut orchestrator = coach(&chat, &synth);
    orchestrator.run_one_shot(&recognizer).await;

    assert_eq!(recognizer.listens(), 3);
    assert!(orchestrator.session().exchanged().is_empty());
    assert_eq!(chat.calls().await, 0);
}

#[tokio::test]
async fn test_empty_text_is_discarded() {
    let chat = FakeChat::new();
    let synth = FakeSynthesizer::new();
    let recognizer = ScriptedRecognizer::saying(&["", "   ", "Stop."]);

    let mut orchestrator = coach(&chat, &synth);
    orchestrator.run_one_shot(&recognizer).await;

    assert_eq!(chat.calls().await, 0);
    assert!(orchestrator.session().exchanged().is_empty());
}

#[tokio::test]
async fn test_cross_language_translation_stops() {
    let chat = FakeChat::new();
    let synth = FakeSynthesizer::new();
    let recognizer = ScriptedRecognizer::new([RawRecognitionResult::translated(
        "Halt.",
        "de",
        [("en", "Stop."), ("de", "Stopp.")],
    )]);

    let mut orchestrator = coach(&chat, &synth);
    assert_eq!(
        orchestrator.run_one_shot(&recognizer).await,
        Termination::StopPhrase
    );
    assert_eq!(chat.calls().await, 0);
}

#[tokio::test]
async fn test_same_language_translation_is_skipped() {
    let chat = FakeChat::new();
    let synth = FakeSynthesizer::new();

    // Only the German entry would match "Stopp.", but German is the source language
    let recognizer = ScriptedRecognizer::new([RawRecognitionResult::translated(
        "Halt.",
        "de",
        [("en", "Stop."), ("de", "Stopp.")],
    )]);

    let mut orchestrator = RecognitionOrchestrator::new(
        persona_session(),
        StopPolicy::new("Stopp.", StopMatch::Normalized),
        Some(ResponseDispatcher::new(chat.clone(), synth.clone())),
    );

    // Script runs out, so the recognizer reports end of stream
    assert_eq!(
        orchestrator.run_one_shot(&recognizer).await,
        Termination::EndOfStream
    );
    assert_eq!(chat.calls().await, 1);
    assert_eq!(
        orchestrator.session().exchanged()[0],
        ConversationTurn::user("Halt.")
    );
}

#[tokio::test]
async fn test_source_text_still_stops_when_translated() {
    let chat = FakeChat::new();
    let synth = FakeSynthesizer::new();
    let recognizer = ScriptedRecognizer::new([RawRecognitionResult::translated(
        "Stop.",
        "en-US",
        [("en", "Stop."), ("de", "Stopp.")],
    )]);

    let mut orchestrator = coach(&chat, &synth);
    assert_eq!(
        orchestrator.run_one_shot(&recognizer).await,
        Termination::StopPhrase
    );
}

#[tokio::test]
async fn test_one_shot_continues_after_canceled_error() {
    let chat = FakeChat::new();
    let synth = FakeSynthesizer::new();
    let recognizer = ScriptedRecognizer::new([
        RawRecognitionResult::canceled(auth_failure()),
        RawRecognitionResult::unknown("RecognizingSpeech"),
        RawRecognitionResult::recognized("Hello"),
        RawRecognitionResult::recognized("Stop."),
    ]);

    let mut orchestrator = coach(&chat, &synth);
    assert_eq!(
        orchestrator.run_one_shot(&recognizer).await,
        Termination::StopPhrase
    );
    assert_eq!(recognizer.listens(), 4);
    assert_eq!(chat.calls().await, 1);
}

#[tokio::test]
async fn test_one_shot_ends_on_end_of_stream() {
    let chat = FakeChat::new();
    let synth = FakeSynthesizer::new();
    let recognizer = ScriptedRecognizer::saying(&["Hello"]);

    let mut orchestrator = coach(&chat, &synth);
    assert_eq!(
        orchestrator.run_one_shot(&recognizer).await,
        Termination::EndOfStream
    );
    assert!(orchestrator.session().is_ended());
    assert_eq!(recognizer.listens(), 2);
}

#[tokio::test]
async fn test_chat_failure_keeps_user_turn() {
    let chat = FakeChat::failing(1);
    let synth = FakeSynthesizer::new();
    let recognizer = ScriptedRecognizer::saying(&["Hello", "Are you there?", "Stop."]);

    let mut orchestrator = coach(&chat, &synth);
    assert_eq!(
        orchestrator.run_one_shot(&recognizer).await,
        Termination::StopPhrase
    );

    assert_eq!(
        orchestrator.session().exchanged(),
        &[
            ConversationTurn::user("Hello"),
            ConversationTurn::user("Are you there?"),
            ConversationTurn::assistant("Reply 2"),
        ]
    );

    // The unanswered turn was resent with the next request
    let requests = chat.requests().await;
    let (retry, _) = &requests[1];
    assert!(retry.contains(&ConversationTurn::user("Hello")));
    assert_eq!(synth.spoken().await, vec!["Reply 2"]);
}

#[tokio::test]
async fn test_synthesis_failure_keeps_reply() {
    let chat = FakeChat::new();
    let synth = FakeSynthesizer::broken();
    let recognizer = ScriptedRecognizer::saying(&["Hello", "Stop."]);

    let mut orchestrator = coach(&chat, &synth);
    assert_eq!(
        orchestrator.run_one_shot(&recognizer).await,
        Termination::StopPhrase
    );

    assert_eq!(
        orchestrator.session().exchanged(),
        &[
            ConversationTurn::user("Hello"),
            ConversationTurn::assistant("Reply 1"),
        ]
    );
}

#[tokio::test]
async fn test_transcribe_only_records_nothing() {
    let recognizer = ScriptedRecognizer::saying(&["Hello", "Stop."]);

    let mut orchestrator =
        RecognitionOrchestrator::new(persona_session(), StopPolicy::default(), None);
    assert_eq!(
        orchestrator.run_one_shot(&recognizer).await,
        Termination::StopPhrase
    );

    let session = orchestrator.into_session();
    assert!(session.is_ended());
    assert!(session.exchanged().is_empty());
    assert_eq!(session.preamble(), &[ConversationTurn::system(PERSONA)]);
}

#[tokio::test]
async fn test_interrupt_ends_one_shot() {
    let (tx, rx) = mpsc::channel(1);
    tx.send(()).await.unwrap();

    let mut orchestrator =
        RecognitionOrchestrator::new(persona_session(), StopPolicy::default(), None)
            .with_shutdown(rx);

    assert_eq!(
        orchestrator.run_one_shot(&SilentRecognizer).await,
        Termination::Interrupted
    );
    assert!(orchestrator.session().is_ended());
}

#[tokio::test]
async fn test_continuous_hello_then_stop() {
    let chat = FakeChat::new();
    let synth = FakeSynthesizer::new();
    let stream = ScriptedStream::new(vec![
        RecognitionEvent::SessionStarted,
        RecognitionEvent::Recognizing {
            text: "Hel".to_string(),
            detected_language: None,
        },
        RecognitionEvent::Recognized(RawRecognitionResult::recognized("Hello")),
        RecognitionEvent::Recognized(RawRecognitionResult::recognized("Stop.")),
        RecognitionEvent::Recognized(RawRecognitionResult::recognized("Too late")),
    ]);

    let mut orchestrator = coach(&chat, &synth);
    let termination = orchestrator.run_continuous(&stream).await.unwrap();

    assert_eq!(termination, Termination::StopPhrase);
    assert_eq!(stream.stops(), 1);
    assert_eq!(chat.calls().await, 1);
    assert_eq!(
        orchestrator.session().exchanged(),
        &[
            ConversationTurn::user("Hello"),
            ConversationTurn::assistant("Reply 1"),
        ]
    );
}

#[tokio::test]
async fn test_continuous_cancel_races_session_stopped() {
    let chat = FakeChat::new();
    let synth = FakeSynthesizer::new();
    let stream = ScriptedStream::new(vec![
        RecognitionEvent::SessionStarted,
        RecognitionEvent::Canceled(auth_failure()),
        RecognitionEvent::SessionStopped,
        RecognitionEvent::Recognized(RawRecognitionResult::recognized("Hello")),
    ]);

    let mut orchestrator = coach(&chat, &synth);
    let termination = orchestrator.run_continuous(&stream).await.unwrap();

    assert_eq!(termination, Termination::Canceled(auth_failure()));
    assert_eq!(stream.stops(), 1);
    assert_eq!(chat.calls().await, 0);
    assert!(orchestrator.session().is_ended());
}

#[tokio::test]
async fn test_continuous_canceled_result_terminates() {
    let chat = FakeChat::new();
    let synth = FakeSynthesizer::new();
    let stream = ScriptedStream::new(vec![
        RecognitionEvent::Recognized(RawRecognitionResult::no_match()),
        RecognitionEvent::Recognized(RawRecognitionResult::canceled(auth_failure())),
    ]);

    let mut orchestrator = coach(&chat, &synth);
    let termination = orchestrator.run_continuous(&stream).await.unwrap();

    assert_eq!(termination, Termination::Canceled(auth_failure()));
    assert_eq!(stream.stops(), 1);
}

#[tokio::test]
async fn test_continuous_session_stopped() {
    let stream = ScriptedStream::new(vec![
        RecognitionEvent::SessionStarted,
        RecognitionEvent::SessionStopped,
    ]);

    let mut orchestrator =
        RecognitionOrchestrator::new(persona_session(), StopPolicy::default(), None);
    let termination = orchestrator
        .run(RecognitionMode::Continuous, &stream_with_recognizer(stream))
        .await
        .unwrap();

    assert_eq!(termination, Termination::SessionStopped);
}

#[tokio::test]
async fn test_interrupt_ends_continuous() {
    let (tx, rx) = mpsc::channel(1);
    tx.send(()).await.unwrap();

    let stream = Arc::new(ScriptedStream::new(vec![RecognitionEvent::SessionStarted]));
    let mut orchestrator =
        RecognitionOrchestrator::new(persona_session(), StopPolicy::default(), None)
            .with_shutdown(rx);

    let termination = orchestrator.run_continuous(stream.as_ref()).await.unwrap();

    assert_eq!(termination, Termination::Interrupted);
    assert_eq!(stream.stops(), 1);
}

#[tokio::test]
async fn test_continuous_stream_closing_early_terminates() {
    let chat = FakeChat::new();
    let synth = FakeSynthesizer::new();
    let stream = ScriptedStream::closing(vec![RecognitionEvent::Recognized(
        RawRecognitionResult::recognized("Hello"),
    )]);

    let mut orchestrator = coach(&chat, &synth);
    let termination = orchestrator.run_continuous(&stream).await.unwrap();

    assert_eq!(termination, Termination::SessionStopped);
    assert_eq!(orchestrator.state(), OrchestratorState::Terminated);
    assert!(orchestrator.session().is_ended());
    assert_eq!(stream.stops(), 1);
    assert_eq!(chat.calls().await, 1);
}

/// Continuous recognizer that cannot start
struct BrokenStream;

#[async_trait::async_trait]
impl sales_voice_coach::ContinuousRecognizer for BrokenStream {
    async fn start_continuous(
        &self,
        _sink: sales_voice_coach::recognition::EventSink,
    ) -> sales_voice_coach::Result<()> {
        Err(sales_voice_coach::Error::Audio("no input device available".to_string()))
    }

    async fn stop_continuous(&self) -> sales_voice_coach::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_continuous_start_failure_terminates() {
    let mut orchestrator =
        RecognitionOrchestrator::new(persona_session(), StopPolicy::default(), None);

    let err = orchestrator.run_continuous(&BrokenStream).await.unwrap_err();

    assert!(matches!(err, sales_voice_coach::Error::Audio(_)));
    assert_eq!(orchestrator.state(), OrchestratorState::Terminated);
}

/// Both recognizer traits over a scripted stream (one-shot side unused)
struct Combined {
    stream: ScriptedStream,
    one_shot: ScriptedRecognizer,
}

fn stream_with_recognizer(stream: ScriptedStream) -> Combined {
    Combined {
        stream,
        one_shot: ScriptedRecognizer::new([]),
    }
}

#[async_trait::async_trait]
impl sales_voice_coach::SpeechRecognizer for Combined {
    async fn listen_once(&self) -> sales_voice_coach::Result<RawRecognitionResult> {
        self.one_shot.listen_once().await
    }
}

#[async_trait::async_trait]
impl sales_voice_coach::ContinuousRecognizer for Combined {
    async fn start_continuous(
        &self,
        sink: sales_voice_coach::recognition::EventSink,
    ) -> sales_voice_coach::Result<()> {
        self.stream.start_continuous(sink).await
    }

    async fn stop_continuous(&self) -> sales_voice_coach::Result<()> {
        self.stream.stop_continuous().await
    }
}
