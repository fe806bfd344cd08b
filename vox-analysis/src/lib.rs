//! Vocal analysis for VOX
//!
//! Provides the analysis ring buffer, monophonic pitch estimation
//! and scale quantization used by the correction path.

mod error;
mod pitch;
mod ring;
mod scale;

pub use error::AnalysisError;
pub use pitch::{
    is_in_range, PitchAlgorithm, PitchEstimate, PitchEstimator, MAX_FREQUENCY_HZ, MIN_CONFIDENCE_SAMPLES,
    MIN_FREQUENCY_HZ,
};
pub use ring::{RingAnalysisBuffer, ANALYSIS_WINDOW_SECS};
pub use scale::{frequency_to_note, note_to_frequency, pitch_ratio, Scale, ScaleQuantizer, A4_FREQUENCY};
