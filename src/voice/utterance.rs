//! Utterance segmentation
//!
//! Splits a microphone stream into utterances using local energy detection:
//! an utterance starts when energy rises above the threshold and is complete
//! after enough trailing silence.

use super::SAMPLE_RATE;

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to count as an utterance (in samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Silence duration to consider end of utterance (in samples)
const SILENCE_SAMPLES: usize = 8000; // 0.5 seconds

/// Longest utterance before it is cut (in samples)
const MAX_UTTERANCE_SAMPLES: usize = SAMPLE_RATE as usize * 30;

/// State of the segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Waiting for speech
    Idle,
    /// Speech detected, accumulating
    Speaking,
}

/// Result of feeding audio to the segmenter
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentEvent {
    /// Speech activity began
    SpeechStarted,
    /// A complete utterance (speech followed by silence)
    Utterance(Vec<f32>),
}

/// Detects utterance boundaries in audio
pub struct UtteranceSegmenter {
    state: SegmenterState,
    speech_buffer: Vec<f32>,
    silence_counter: usize,
}

impl UtteranceSegmenter {
    /// Create a new segmenter
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SegmenterState::Idle,
            speech_buffer: Vec::new(),
            silence_counter: 0,
        }
    }

    /// Process audio samples
    ///
    /// Returns an event when speech starts or an utterance completes
    pub fn process(&mut self, samples: &[f32]) -> Option<SegmentEvent> {
        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            SegmenterState::Idle => {
                if is_speech {
                    self.state = SegmenterState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech detected");
                    return Some(SegmentEvent::SpeechStarted);
                }
            }
            SegmenterState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                tracing::trace!(
                    buffer_len = self.speech_buffer.len(),
                    silence = self.silence_counter,
                    is_speech,
                    energy,
                    "speaking state"
                );

                let speech_len = self.speech_buffer.len().saturating_sub(self.silence_counter);
                if (self.silence_counter > SILENCE_SAMPLES && speech_len > MIN_SPEECH_SAMPLES)
                    || self.speech_buffer.len() >= MAX_UTTERANCE_SAMPLES
                {
                    let utterance = self.take_speech_buffer();
                    tracing::debug!(samples = utterance.len(), "utterance complete");
                    self.reset();
                    return Some(SegmentEvent::Utterance(utterance));
                }

                // Too much silence without enough speech: a blip, not an utterance
                if self.silence_counter > SILENCE_SAMPLES {
                    tracing::trace!("discarding short noise");
                    self.reset();
                }
            }
        }

        None
    }

    /// Take the speech buffer, clearing it
    pub fn take_speech_buffer(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.speech_buffer)
    }

    /// Check if speech is being accumulated
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.state == SegmenterState::Speaking
    }

    /// Reset to idle state
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.speech_buffer.clear();
        self.silence_counter = 0;
    }

    /// Get current state
    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }
}

impl Default for UtteranceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
