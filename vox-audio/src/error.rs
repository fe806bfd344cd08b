//! Processor configuration errors

use thiserror::Error;
use vox_analysis::AnalysisError;

/// Errors raised by `configure`
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    #[error("Invalid block size: {0}")]
    InvalidBlockSize(usize),

    #[error("Invalid channel count: {0}")]
    InvalidChannelCount(usize),

    #[error("Invalid frame size: {0} (expected a power of two in 256..=16384)")]
    InvalidFrameSize(usize),

    #[error("Analysis setup failed: {0}")]
    Analysis(#[from] AnalysisError),
}
