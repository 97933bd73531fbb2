//! Local audio I/O
//!
//! Microphone capture, utterance segmentation and speaker playback used by
//! the speech service client. Recognition and synthesis themselves happen in
//! the cloud (see `speech`).

mod capture;
mod playback;
mod utterance;

pub use capture::{AudioCapture, POLL_INTERVAL, SAMPLE_RATE, record_utterance, samples_to_wav};
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE, decode_mp3};
pub use utterance::{SegmentEvent, SegmenterState, UtteranceSegmenter, calculate_energy};
