//! Vocal processing engine for VOX - correction, harmony and effects
//!
//! This module provides the real-time processing pipeline:
//! - Processor: Entry point (configure / process / reset)
//! - Tuner: Pitch analysis and scale-snapped correction
//! - Shifter: Phase vocoder pitch shifting
//! - Effects: Doubler, harmony voices, formant shift and feedback delay
//! - Params: Lock-free parameter store and factory presets

mod config;
mod error;
mod meter;
mod params;
mod presets;
mod processor;
mod shifter;
mod smoother;
mod tuner;
pub mod effects;

pub use config::{ProcessorConfig, DEFAULT_FRAME_SIZE, MAX_FRAME_SIZE, MIN_FRAME_SIZE};
pub use effects::{
    FeedbackDelayLine, FormantShifter, HarmonyVoiceBank, ReverbSettings, VocalDoubler, VocalEffects, Voice,
};
pub use error::ConfigError;
pub use meter::AnalysisMeter;
pub use params::{db_to_gain, ParamId, ParamSnapshot, VocalParams, PARAM_COUNT};
pub use presets::{find_preset, factory_preset, Preset, DEFAULT_PRESET, FACTORY_PRESETS};
pub use processor::VocalProcessor;
pub use shifter::{PhaseVocoderShifter, BYPASS_TOLERANCE};
pub use smoother::{speed_to_ramp_ms, RatioSmoother};
pub use tuner::PitchTuner;

pub use vox_analysis::{PitchAlgorithm, PitchEstimate, Scale};
