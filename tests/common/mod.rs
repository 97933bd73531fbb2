//! Shared test utilities
//!
//! Scripted fake collaborators so conversations run without audio hardware or
//! network access.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sales_voice_coach::recognition::{CancellationDetails, EventSink};
use sales_voice_coach::voice::SAMPLE_RATE;
use sales_voice_coach::{
    ChatCompletion, ContinuousRecognizer, ConversationSession, ConversationTurn, Error,
    RawRecognitionResult, RecognitionEvent, RecognitionOrchestrator, ResponseDispatcher, Result,
    SpeechRecognizer, SpeechSynthesizer, StopPolicy, SynthesisResult,
};
use tokio::sync::Mutex;

/// Persona line used by test sessions
pub const PERSONA: &str = "You are Mr. Wiggins, a prospective insurance customer.";

/// Session with a single system persona turn
#[must_use]
pub fn persona_session() -> ConversationSession {
    ConversationSession::new(vec![ConversationTurn::system(PERSONA)], 100)
}

/// Orchestrator with the default stop policy and a dispatcher over the fakes
#[must_use]
pub fn coach(chat: &Arc<FakeChat>, synthesizer: &Arc<FakeSynthesizer>) -> RecognitionOrchestrator {
    RecognitionOrchestrator::new(
        persona_session(),
        StopPolicy::default(),
        Some(ResponseDispatcher::new(chat.clone(), synthesizer.clone())),
    )
}

/// One-shot recognizer replaying a fixed list of results
///
/// Once the script is exhausted it reports end of stream.
pub struct ScriptedRecognizer {
    script: Mutex<VecDeque<RawRecognitionResult>>,
    listens: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new(script: impl IntoIterator<Item = RawRecognitionResult>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            listens: AtomicUsize::new(0),
        }
    }

    /// Recognized results for each text
    pub fn saying(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| RawRecognitionResult::recognized(*t)))
    }

    pub fn listens(&self) -> usize {
        self.listens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn listen_once(&self) -> Result<RawRecognitionResult> {
        self.listens.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| RawRecognitionResult::canceled(CancellationDetails::end_of_stream())))
    }
}

/// Recognizer whose listen never completes
pub struct SilentRecognizer;

#[async_trait]
impl SpeechRecognizer for SilentRecognizer {
    async fn listen_once(&self) -> Result<RawRecognitionResult> {
        std::future::pending().await
    }
}

/// Continuous recognizer emitting a fixed list of events on start
///
/// Stopping emits `SessionStopped` and drops the sink.
pub struct ScriptedStream {
    script: Vec<RecognitionEvent>,
    sink: Mutex<Option<EventSink>>,
    keep_sink: bool,
    stops: AtomicUsize,
}

impl ScriptedStream {
    pub fn new(script: Vec<RecognitionEvent>) -> Self {
        Self {
            script,
            sink: Mutex::new(None),
            keep_sink: true,
            stops: AtomicUsize::new(0),
        }
    }

    /// Stream that drops its sink right after the script, without `SessionStopped`
    pub fn closing(script: Vec<RecognitionEvent>) -> Self {
        Self {
            keep_sink: false,
            ..Self::new(script)
        }
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContinuousRecognizer for ScriptedStream {
    async fn start_continuous(&self, sink: EventSink) -> Result<()> {
        for event in &self.script {
            sink.emit(event.clone());
        }
        if self.keep_sink {
            *self.sink.lock().await = Some(sink);
        }
        Ok(())
    }

    async fn stop_continuous(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if let Some(sink) = self.sink.lock().await.take() {
            sink.emit(RecognitionEvent::SessionStopped);
        }
        Ok(())
    }
}

/// Chat backend recording every request
///
/// Replies are numbered ("Reply 1", "Reply 2", ...). The first `failures`
/// requests fail with a service error.
pub struct FakeChat {
    requests: Mutex<Vec<(Vec<ConversationTurn>, u32)>>,
    failures: AtomicUsize,
}

impl FakeChat {
    pub fn new() -> Arc<Self> {
        Self::failing(0)
    }

    pub fn failing(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            failures: AtomicUsize::new(failures),
        })
    }

    pub async fn requests(&self) -> Vec<(Vec<ConversationTurn>, u32)> {
        self.requests.lock().await.clone()
    }

    pub async fn calls(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl ChatCompletion for FakeChat {
    async fn complete(&self, turns: &[ConversationTurn], max_tokens: u32) -> Result<String> {
        let mut requests = self.requests.lock().await;
        requests.push((turns.to_vec(), max_tokens));

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::ChatService("quota exceeded".to_string()));
        }

        Ok(format!("Reply {}", requests.len()))
    }
}

/// Synthesizer recording what it was asked to speak
pub struct FakeSynthesizer {
    spoken: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeSynthesizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            spoken: Mutex::new(Vec::new()),
            fail: false,
        })
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            spoken: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub async fn spoken(&self) -> Vec<String> {
        self.spoken.lock().await.clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SynthesisResult> {
        self.spoken.lock().await.push(text.to_string());
        if self.fail {
            return Err(Error::Synthesis("no output device".to_string()));
        }
        Ok(SynthesisResult {
            audio_bytes: text.len(),
        })
    }
}

/// Generate sine wave audio samples
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}
