//! Pitch correction path
//!
//! The mono mix of each block fills the analysis ring. Every full ring
//! (~100ms) is analyzed; a confident, in-range pitch is snapped toward the
//! selected scale and the resulting ratio is approached by a linear ramp.
//! Each channel is shifted by its own phase vocoder.

use crate::config::ProcessorConfig;
use crate::error::ConfigError;
use crate::params::ParamSnapshot;
use crate::shifter::PhaseVocoderShifter;
use crate::smoother::RatioSmoother;
use tracing::debug;
use vox_analysis::{pitch_ratio, PitchEstimate, PitchEstimator, RingAnalysisBuffer, ScaleQuantizer};

/// Correction engine for all channels
pub struct PitchTuner {
    ring: RingAnalysisBuffer,
    estimator: PitchEstimator,
    quantizer: ScaleQuantizer,
    smoother: RatioSmoother,
    /// One shifter per channel (phase state is never shared)
    shifters: Vec<PhaseVocoderShifter>,
    /// Result of the last analysis cycle
    estimate: PitchEstimate,
}

impl PitchTuner {
    /// Allocate the correction path for `config`
    pub fn new(config: &ProcessorConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let shifters = (0..config.channels)
            .map(|_| PhaseVocoderShifter::new(config.frame_size))
            .collect::<Result<Vec<_>, _>>()?;

        let ring = RingAnalysisBuffer::new(config.sample_rate)?;
        debug!(
            "Pitch tuner: {} Hz, analysis window {} samples, frame {}",
            config.sample_rate,
            ring.capacity(),
            config.frame_size
        );

        Ok(Self {
            ring,
            estimator: PitchEstimator::new(config.sample_rate)?,
            quantizer: ScaleQuantizer::new(),
            smoother: RatioSmoother::new(config.sample_rate as f32, 1.0),
            shifters,
            estimate: PitchEstimate::NONE,
        })
    }

    /// Rebuild for a new configuration. Leaves the tuner untouched on error.
    pub fn configure(&mut self, config: &ProcessorConfig) -> Result<(), ConfigError> {
        *self = Self::new(config)?;
        Ok(())
    }

    /// Analyze and correct one block in place
    pub fn process<C: AsMut<[f32]>>(&mut self, block: &mut [C], params: &ParamSnapshot) {
        let channels = block.len().min(self.shifters.len());
        if channels == 0 {
            return;
        }
        let len = block[..channels]
            .iter_mut()
            .map(|c| c.as_mut().len())
            .max()
            .unwrap_or(0);
        if len == 0 {
            return;
        }

        self.analyze(&mut block[..channels], len);

        let target = self.target_ratio(params);
        self.smoother.set_speed(params.correction_speed);
        self.smoother.set_target(target);
        let ratio = self.smoother.skip(len);

        for (channel, shifter) in block.iter_mut().zip(self.shifters.iter_mut()) {
            shifter.shift_in_place(channel.as_mut(), ratio);
        }
    }

    /// Feed the mono mix into the ring, estimating on every full cycle
    fn analyze<C: AsMut<[f32]>>(&mut self, block: &mut [C], len: usize) {
        let scale = 1.0 / block.len() as f32;
        for i in 0..len {
            let mut sum = 0.0;
            for channel in block.iter_mut() {
                if let Some(&sample) = channel.as_mut().get(i) {
                    sum += sample;
                }
            }

            if self.ring.push(sum * scale) {
                self.estimate = self.estimator.estimate(self.ring.as_slice());
            }
        }
    }

    /// Ratio that moves the detected pitch onto its scale target
    fn target_ratio(&mut self, params: &ParamSnapshot) -> f32 {
        if !self.estimate.detected {
            return 1.0;
        }

        self.quantizer.set_root_from_frequency(params.key_center_hz);
        let detected = self.estimate.frequency_hz;
        let target = self
            .quantizer
            .quantize(detected, params.scale(), params.correction_strength);
        pitch_ratio(detected, target)
    }

    /// Result of the last analysis cycle
    pub fn estimate(&self) -> PitchEstimate {
        self.estimate
    }

    /// Ratio applied to the last block
    pub fn current_ratio(&self) -> f32 {
        self.smoother.current()
    }

    /// Correction delay in samples (one analysis frame)
    pub fn latency_samples(&self) -> usize {
        self.shifters.first().map_or(0, |s| s.latency())
    }

    /// Clear ring, shifter phases and ramp without reallocating
    pub fn reset(&mut self) {
        self.ring.reset();
        self.smoother.reset_to(1.0);
        for shifter in &mut self.shifters {
            shifter.reset();
        }
        self.estimate = PitchEstimate::NONE;
    }
}
