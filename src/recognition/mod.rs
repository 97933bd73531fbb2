//! Speech recognition results and events
//!
//! Raw results from the speech collaborator are classified into a small set of
//! semantic categories. Continuous recognition delivers results as events.

mod events;
mod outcome;

pub use events::{CompletionSignal, EventSink, RecognitionEvent, Termination};
pub use outcome::{
    CancellationDetails, CancellationReason, OutcomeCategory, RawRecognitionResult,
    RecognitionOutcome, ResultReason, classify, is_same_language,
};
