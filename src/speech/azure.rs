//! Azure Speech REST client
//!
//! Recognition uses the short-audio endpoint on utterances segmented from the
//! local microphone. Synthesis requests MP3 audio for an SSML document and
//! plays it on the default speakers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::runtime::Handle;

use super::{
    AzureTranslator, ContinuousRecognizer, SpeechRecognizer, SpeechSynthesizer, SynthesisResult,
    Translator,
};
use crate::config::SpeechConfig;
use crate::recognition::{
    CancellationDetails, CancellationReason, EventSink, RawRecognitionResult, RecognitionEvent,
    ResultReason, is_same_language,
};
use crate::voice::{
    AudioCapture, AudioPlayback, POLL_INTERVAL, SAMPLE_RATE, SegmentEvent, UtteranceSegmenter,
    record_utterance, samples_to_wav,
};
use crate::{Error, Result};

/// How long one-shot recognition waits for speech before reporting no match
pub const INITIAL_SILENCE_TIMEOUT: Duration = Duration::from_secs(5);

/// Requested synthesis output format
const SYNTHESIS_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";

/// Short-audio recognition response (simple format)
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ShortAudioResponse {
    recognition_status: String,
    #[serde(default)]
    display_text: String,
}

/// Recognition state shared with the continuous capture thread
struct RecognitionClient {
    http: reqwest::Client,
    key: SecretString,
    stt_url: String,
    language: String,
    detect_languages: Vec<String>,
    translate_to: Vec<String>,
    translator: Option<Arc<dyn Translator>>,
}

impl RecognitionClient {
    fn recognition_url(&self) -> String {
        format!(
            "{}?language={}&format=simple",
            self.stt_url,
            urlencoding::encode(&self.language)
        )
    }

    /// Recognize one WAV utterance
    ///
    /// Transport and service failures become canceled results.
    async fn recognize(&self, wav: Vec<u8>) -> RawRecognitionResult {
        tracing::debug!(audio_bytes = wav.len(), language = %self.language, "recognizing utterance");

        let response = match self
            .http
            .post(self.recognition_url())
            .header("Ocp-Apim-Subscription-Key", self.key.expose_secret())
            .header(
                "Content-Type",
                format!("audio/wav; codecs=audio/pcm; samplerate={SAMPLE_RATE}"),
            )
            .header("Accept", "application/json")
            .body(wav)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "speech request failed");
                return RawRecognitionResult::canceled(CancellationDetails::error(
                    "ConnectionFailure",
                    e.to_string(),
                ));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let code = match status.as_u16() {
                401 | 403 => "AuthenticationFailure",
                400 => "BadRequest",
                429 => "TooManyRequests",
                _ => "ServiceError",
            };
            return RawRecognitionResult::canceled(CancellationDetails::error(
                code,
                format!("{status}: {body}"),
            ));
        }

        let body: ShortAudioResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return RawRecognitionResult::canceled(CancellationDetails::error(
                    "ServiceError",
                    format!("invalid recognition response: {e}"),
                ));
            }
        };

        let raw = raw_from_status(&body.recognition_status, body.display_text);
        self.annotate(raw).await
    }

    /// Attach detected language and translations to a recognized result
    async fn annotate(&self, raw: RawRecognitionResult) -> RawRecognitionResult {
        let Some(translator) = &self.translator else {
            return raw;
        };
        if raw.reason != ResultReason::RecognizedSpeech || raw.text.trim().is_empty() {
            return raw;
        }

        match translator.translate(&raw.text, &self.translate_to).await {
            Ok(translation) => {
                let detected = translation
                    .detected_language
                    .map(|d| resolve_language(&d, &self.detect_languages));

                if translation.translations.is_empty() {
                    match detected {
                        Some(language) => raw.with_language(language),
                        None => raw,
                    }
                } else {
                    RawRecognitionResult {
                        reason: ResultReason::TranslatedSpeech,
                        detected_language: detected,
                        translations: translation.translations,
                        ..raw
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "speech not translated");
                raw
            }
        }
    }
}

/// Map a short-audio `RecognitionStatus` to a raw result
fn raw_from_status(status: &str, text: String) -> RawRecognitionResult {
    match status {
        "Success" => RawRecognitionResult::recognized(text),
        "NoMatch" | "InitialSilenceTimeout" | "BabbleTimeout" => RawRecognitionResult::no_match(),
        "Error" => RawRecognitionResult::canceled(CancellationDetails::error(
            "ServiceError",
            "speech service reported an error",
        )),
        "EndOfDictation" => RawRecognitionResult::canceled(CancellationDetails::end_of_stream()),
        other => RawRecognitionResult::unknown(other),
    }
}

/// Prefer the configured candidate tag (`de-DE`) over the bare detected code (`de`)
fn resolve_language(detected: &str, candidates: &[String]) -> String {
    candidates
        .iter()
        .find(|c| is_same_language(Some(c.as_str()), detected))
        .cloned()
        .unwrap_or_else(|| detected.to_string())
}

/// Background capture thread handle
struct ContinuousSession {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Azure Speech recognizer and synthesizer
pub struct AzureSpeech {
    recognition: Arc<RecognitionClient>,
    tts_url: String,
    voice: String,
    continuous: Mutex<Option<ContinuousSession>>,
}

impl AzureSpeech {
    /// Create a client for the configured region
    ///
    /// A translator is attached when language detection or translation is requested.
    #[must_use]
    pub fn new(config: &SpeechConfig) -> Self {
        let translator = config.wants_translation().then(|| {
            Arc::new(AzureTranslator::new(
                SecretString::from(config.key.expose_secret().to_string()),
                config.region.clone(),
            )) as Arc<dyn Translator>
        });

        if translator.is_some() {
            tracing::info!(
                detect = ?config.detect_languages,
                translate_to = ?config.translate_to,
                "language detection and translation enabled"
            );
        }

        Self::with_translator(config, translator)
    }

    /// Create a client with an explicit translator
    #[must_use]
    pub fn with_translator(config: &SpeechConfig, translator: Option<Arc<dyn Translator>>) -> Self {
        let region = &config.region;
        let recognition = RecognitionClient {
            http: reqwest::Client::new(),
            key: SecretString::from(config.key.expose_secret().to_string()),
            stt_url: format!(
                "https://{region}.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1"
            ),
            language: config.recognition_language().to_string(),
            detect_languages: config.detect_languages.clone(),
            translate_to: config.translate_to.clone(),
            translator,
        };

        Self {
            recognition: Arc::new(recognition),
            tts_url: format!("https://{region}.tts.speech.microsoft.com/cognitiveservices/v1"),
            voice: config.voice.clone(),
            continuous: Mutex::new(None),
        }
    }

    fn session_slot(&self) -> Result<std::sync::MutexGuard<'_, Option<ContinuousSession>>> {
        self.continuous
            .lock()
            .map_err(|_| Error::Recognition("continuous session lock poisoned".to_string()))
    }
}

#[async_trait]
impl SpeechRecognizer for AzureSpeech {
    async fn listen_once(&self) -> Result<RawRecognitionResult> {
        let samples = tokio::task::spawn_blocking(|| record_utterance(INITIAL_SILENCE_TIMEOUT))
            .await
            .map_err(|e| Error::Audio(e.to_string()))??;

        let Some(samples) = samples else {
            return Ok(RawRecognitionResult::no_match());
        };

        let wav = samples_to_wav(&samples, SAMPLE_RATE)?;
        Ok(self.recognition.recognize(wav).await)
    }
}

#[async_trait]
impl ContinuousRecognizer for AzureSpeech {
    async fn start_continuous(&self, sink: EventSink) -> Result<()> {
        let mut slot = self.session_slot()?;
        if slot.is_some() {
            return Err(Error::Recognition(
                "continuous recognition already running".to_string(),
            ));
        }

        let stop = Arc::new(AtomicBool::new(false));
        let recognition = Arc::clone(&self.recognition);
        let runtime = Handle::current();
        let thread_stop = Arc::clone(&stop);

        let handle = std::thread::Builder::new()
            .name("voicecoach-recognition".to_string())
            .spawn(move || run_capture_loop(&recognition, &runtime, &sink, &thread_stop))?;

        *slot = Some(ContinuousSession { stop, handle });
        tracing::info!("continuous recognition started");
        Ok(())
    }

    async fn stop_continuous(&self) -> Result<()> {
        let session = self.session_slot()?.take();
        let Some(session) = session else {
            return Ok(());
        };

        session.stop.store(true, Ordering::Release);
        tokio::task::spawn_blocking(move || session.handle.join())
            .await
            .map_err(|e| Error::Recognition(e.to_string()))?
            .map_err(|_| Error::Recognition("recognition thread panicked".to_string()))?;

        tracing::info!("continuous recognition stopped");
        Ok(())
    }
}

/// Capture, segment and recognize until stopped (runs on its own thread)
///
/// cpal streams are not `Send`, so the capture lives entirely on this thread and
/// HTTP calls are driven through the runtime handle.
fn run_capture_loop(
    recognition: &RecognitionClient,
    runtime: &Handle,
    sink: &EventSink,
    stop: &AtomicBool,
) {
    sink.emit(RecognitionEvent::SessionStarted);

    let capture = AudioCapture::new().and_then(|mut capture| {
        capture.start()?;
        Ok(capture)
    });
    let mut capture = match capture {
        Ok(capture) => capture,
        Err(e) => {
            sink.emit(RecognitionEvent::Canceled(CancellationDetails::error(
                "AudioDeviceFailure",
                e.to_string(),
            )));
            sink.emit(RecognitionEvent::SessionStopped);
            return;
        }
    };

    let mut segmenter = UtteranceSegmenter::new();

    while !stop.load(Ordering::Acquire) && !sink.is_closed() {
        std::thread::sleep(POLL_INTERVAL);

        match segmenter.process(&capture.take_buffer()) {
            Some(SegmentEvent::SpeechStarted) => {
                sink.emit(RecognitionEvent::Recognizing {
                    text: String::new(),
                    detected_language: None,
                });
            }
            Some(SegmentEvent::Utterance(samples)) => {
                let raw = match samples_to_wav(&samples, SAMPLE_RATE) {
                    Ok(wav) => runtime.block_on(recognition.recognize(wav)),
                    Err(e) => RawRecognitionResult::canceled(CancellationDetails::error(
                        "AudioEncodingFailure",
                        e.to_string(),
                    )),
                };

                // A failed request means the stream is unusable
                if let Some(details) = raw
                    .cancellation
                    .as_ref()
                    .filter(|d| d.reason == CancellationReason::Error)
                {
                    sink.emit(RecognitionEvent::Canceled(details.clone()));
                    break;
                }
                sink.emit(RecognitionEvent::Recognized(raw));
            }
            None => {}
        }
    }

    capture.stop();
    sink.emit(RecognitionEvent::SessionStopped);
}

#[async_trait]
impl SpeechSynthesizer for AzureSpeech {
    async fn synthesize(&self, text: &str) -> Result<SynthesisResult> {
        if text.trim().is_empty() {
            return Ok(SynthesisResult { audio_bytes: 0 });
        }

        let response = self
            .recognition
            .http
            .post(&self.tts_url)
            .header(
                "Ocp-Apim-Subscription-Key",
                self.recognition.key.expose_secret(),
            )
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", SYNTHESIS_FORMAT)
            .header("User-Agent", "voicecoach")
            .body(build_ssml(&self.voice, text))
            .send()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("speech synthesis error {status}: {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?
            .to_vec();
        let audio_bytes = audio.len();

        tokio::task::spawn_blocking(move || AudioPlayback::new()?.play_mp3_blocking(&audio))
            .await
            .map_err(|e| Error::Audio(e.to_string()))??;

        tracing::info!(text, audio_bytes, "speech synthesized to speaker");
        Ok(SynthesisResult { audio_bytes })
    }
}

/// Build the SSML document for a voice
fn build_ssml(voice: &str, text: &str) -> String {
    let lang = voice.splitn(3, '-').take(2).collect::<Vec<_>>().join("-");
    format!(
        "<speak version='1.0' xml:lang='{lang}'><voice name='{}'>{}</voice></speak>",
        escape_xml(voice),
        escape_xml(text)
    )
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
