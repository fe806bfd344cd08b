//! Analysis results published by the audio thread
//!
//! Lock-free: the audio thread stores, any other thread loads.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use vox_analysis::PitchEstimate;

/// Last pitch analysis and applied correction ratio
pub struct AnalysisMeter {
    pitch_hz: AtomicU32,
    confidence: AtomicU32,
    detected: AtomicBool,
    ratio: AtomicU32,
}

impl AnalysisMeter {
    pub fn new() -> Self {
        Self {
            pitch_hz: AtomicU32::new(0.0f32.to_bits()),
            confidence: AtomicU32::new(0.0f32.to_bits()),
            detected: AtomicBool::new(false),
            ratio: AtomicU32::new(1.0f32.to_bits()),
        }
    }

    /// Store an estimate and the correction ratio in effect
    pub fn publish(&self, estimate: &PitchEstimate, ratio: f32) {
        self.pitch_hz.store(estimate.frequency_hz.to_bits(), Ordering::Relaxed);
        self.confidence.store(estimate.confidence.to_bits(), Ordering::Relaxed);
        self.detected.store(estimate.detected, Ordering::Relaxed);
        self.ratio.store(ratio.to_bits(), Ordering::Relaxed);
    }

    /// Detected pitch in Hz (0.0 when none)
    pub fn pitch_hz(&self) -> f32 {
        f32::from_bits(self.pitch_hz.load(Ordering::Relaxed))
    }

    /// Confidence of the last analysis (0.0 - 1.0)
    pub fn confidence(&self) -> f32 {
        f32::from_bits(self.confidence.load(Ordering::Relaxed))
    }

    pub fn detected(&self) -> bool {
        self.detected.load(Ordering::Relaxed)
    }

    /// Correction ratio applied to the last block
    pub fn ratio(&self) -> f32 {
        f32::from_bits(self.ratio.load(Ordering::Relaxed))
    }

    /// Last estimate as a value
    pub fn estimate(&self) -> PitchEstimate {
        PitchEstimate {
            frequency_hz: self.pitch_hz(),
            confidence: self.confidence(),
            detected: self.detected(),
        }
    }

    pub fn reset(&self) {
        self.publish(&PitchEstimate::NONE, 1.0);
    }
}

impl Default for AnalysisMeter {
    fn default() -> Self {
        Self::new()
    }
}
