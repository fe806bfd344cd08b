//! Circular accumulation buffer feeding the pitch estimator
//!
//! The buffer holds ~100ms of audio. Every time the write cursor wraps back
//! to zero a full analysis cycle is complete and the contents are in
//! chronological order, ready for one estimation pass.

use crate::error::{check_sample_rate, AnalysisError};

/// Length of one analysis cycle in seconds
pub const ANALYSIS_WINDOW_SECS: f64 = 0.1;

/// Fixed-capacity ring used once per fill cycle
pub struct RingAnalysisBuffer {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl RingAnalysisBuffer {
    /// Create a ring sized for `sample_rate`
    pub fn new(sample_rate: f64) -> Result<Self, AnalysisError> {
        check_sample_rate(sample_rate)?;
        let capacity = ((sample_rate * ANALYSIS_WINDOW_SECS).round() as usize).max(1);

        Ok(Self {
            buffer: vec![0.0; capacity],
            write_pos: 0,
        })
    }

    /// Write one sample. Returns true when the cursor wraps to zero.
    #[inline]
    pub fn push(&mut self, sample: f32) -> bool {
        self.buffer[self.write_pos] = sample;
        self.write_pos += 1;
        if self.write_pos == self.buffer.len() {
            self.write_pos = 0;
            true
        } else {
            false
        }
    }

    /// Buffer contents. Chronological right after `push` returned true.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.buffer
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.write_pos
    }

    /// Zero contents and cursor without resizing
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
