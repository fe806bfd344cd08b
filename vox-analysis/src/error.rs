//! Analysis errors

use thiserror::Error;

/// Errors raised while constructing analysis components
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f64),
}

/// Validate a sample rate shared by every analysis component
pub(crate) fn check_sample_rate(sample_rate: f64) -> Result<(), AnalysisError> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::InvalidSampleRate(sample_rate))
    }
}
