//! Processing session configuration

use crate::error::ConfigError;

/// Default STFT frame size of the correction shifter
pub const DEFAULT_FRAME_SIZE: usize = 2048;
/// Smallest accepted STFT frame size
pub const MIN_FRAME_SIZE: usize = 256;
/// Largest accepted STFT frame size
pub const MAX_FRAME_SIZE: usize = 16384;

/// Sample rate, block size, channel count and frame size of a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessorConfig {
    pub sample_rate: f64,
    /// Largest block `process` is expected to see (longer blocks are chunked)
    pub block_size: usize,
    pub channels: usize,
    /// Correction shifter frame size (power of two)
    pub frame_size: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            block_size: 512,
            channels: 2,
            frame_size: DEFAULT_FRAME_SIZE,
        }
    }
}

impl ProcessorConfig {
    pub fn new(sample_rate: f64, block_size: usize, channels: usize) -> Self {
        Self {
            sample_rate,
            block_size,
            channels,
            frame_size: DEFAULT_FRAME_SIZE,
        }
    }

    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    /// Check every field, reporting the first invalid one
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if self.block_size == 0 {
            return Err(ConfigError::InvalidBlockSize(self.block_size));
        }
        if self.channels == 0 {
            return Err(ConfigError::InvalidChannelCount(self.channels));
        }
        validate_frame_size(self.frame_size)
    }
}

/// Frame sizes must be powers of two within `MIN_FRAME_SIZE..=MAX_FRAME_SIZE`
pub(crate) fn validate_frame_size(frame_size: usize) -> Result<(), ConfigError> {
    if frame_size.is_power_of_two() && (MIN_FRAME_SIZE..=MAX_FRAME_SIZE).contains(&frame_size) {
        Ok(())
    } else {
        Err(ConfigError::InvalidFrameSize(frame_size))
    }
}
