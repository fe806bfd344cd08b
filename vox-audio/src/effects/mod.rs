//! Vocal effects chain
//!
//! Fixed order per channel, each stage skipped when its amount is zero:
//! doubler → harmony → formant → feedback delay.
//! Reverb is rendered outside this crate; the chain only publishes its
//! (smoothed) settings.

mod delay;
mod doubler;
mod formant;
mod harmony;

pub use delay::{FeedbackDelayLine, MAX_DELAY_SECS};
pub use doubler::{VocalDoubler, MAX_DOUBLING_DELAY_MS};
pub use formant::FormantShifter;
pub use harmony::{HarmonyVoiceBank, Voice, MAX_VOICES};

use crate::config::ProcessorConfig;
use crate::error::ConfigError;
use crate::params::ParamSnapshot;
use crate::smoother::RatioSmoother;

/// Reverb wet level ramp length
const REVERB_RAMP_MS: f32 = 50.0;

/// Linear read at a fractional position; zero outside the block
#[inline]
pub(crate) fn read_linear(source: &[f32], position: f32) -> f32 {
    let last = match source.len().checked_sub(1) {
        Some(last) => last,
        None => return 0.0,
    };
    if !(position >= 0.0) || position > last as f32 {
        return 0.0;
    }

    let index = position as usize;
    if index >= last {
        return source[last];
    }
    let frac = position - index as f32;
    source[index] * (1.0 - frac) + source[index + 1] * frac
}

/// `value` bounded to `min..=max`, or `fallback` when it is NaN or infinite
#[inline]
pub(crate) fn finite_clamp(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.max(min).min(max)
    } else {
        fallback
    }
}

/// Settings handed to the external reverb
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbSettings {
    pub room_size: f32,
    pub damping: f32,
    pub wet_level: f32,
    pub dry_level: f32,
    pub width: f32,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        Self {
            room_size: 0.5,
            damping: 0.5,
            wet_level: 0.0,
            dry_level: 1.0,
            width: 1.0,
        }
    }
}

/// Effects owned by one channel
struct ChannelEffects {
    doubler: VocalDoubler,
    harmony: HarmonyVoiceBank,
    formant: FormantShifter,
    delay: FeedbackDelayLine,
}

impl ChannelEffects {
    fn new(sample_rate: f32, block_size: usize) -> Self {
        Self {
            doubler: VocalDoubler::new(sample_rate),
            harmony: HarmonyVoiceBank::new(block_size),
            formant: FormantShifter::new(block_size),
            delay: FeedbackDelayLine::new(sample_rate),
        }
    }

    fn process(&mut self, samples: &mut [f32], params: &ParamSnapshot) {
        if params.doubling_amount > 0.0 {
            self.doubler.process(
                samples,
                params.doubling_amount,
                params.doubling_delay_ms,
                params.doubling_detune_cents,
            );
        }

        let voices = params.harmony_voice_count();
        if params.harmony_amount > 0.0 && voices > 1 {
            self.harmony.mix(
                samples,
                voices,
                params.harmony_amount,
                params.harmony_interval,
                params.harmony_detune_cents,
            );
        }

        if params.formant_amount > 0.0 {
            self.formant.process(samples, params.formant_shift, params.formant_amount);
        }

        if params.delay_mix > 0.0 {
            self.delay.process(
                samples,
                params.delay_time_ms,
                params.delay_feedback,
                params.delay_mix,
                params.delay_filter_hz,
            );
        }
    }

    fn reset(&mut self) {
        self.doubler.reset();
        self.harmony.reset();
        self.formant.reset();
        self.delay.reset();
    }
}

/// Per-channel effects chain plus the reverb boundary
pub struct VocalEffects {
    channels: Vec<ChannelEffects>,
    reverb_wet: RatioSmoother,
    reverb: ReverbSettings,
}

impl VocalEffects {
    /// Allocate the chain for `config` (which must already be valid)
    pub fn new(config: &ProcessorConfig) -> Self {
        let sample_rate = config.sample_rate as f32;
        let mut reverb_wet = RatioSmoother::new(sample_rate, 0.0);
        reverb_wet.set_ramp_ms(REVERB_RAMP_MS);

        Self {
            channels: (0..config.channels)
                .map(|_| ChannelEffects::new(sample_rate, config.block_size))
                .collect(),
            reverb_wet,
            reverb: ReverbSettings::default(),
        }
    }

    /// Rebuild for a new configuration. Leaves the chain untouched on error.
    pub fn configure(&mut self, config: &ProcessorConfig) -> Result<(), ConfigError> {
        config.validate()?;
        *self = Self::new(config);
        Ok(())
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Run the chain on every configured channel
    pub fn process<C: AsMut<[f32]>>(&mut self, block: &mut [C], params: &ParamSnapshot) {
        let mut block_len = 0;
        for (channel, effects) in block.iter_mut().zip(self.channels.iter_mut()) {
            let samples = channel.as_mut();
            block_len = block_len.max(samples.len());
            effects.process(samples, params);
        }

        self.update_reverb(params, block_len);
    }

    fn update_reverb(&mut self, params: &ParamSnapshot, block_len: usize) {
        self.reverb_wet.set_target(params.reverb_amount.clamp(0.0, 1.0));
        let wet = self.reverb_wet.skip(block_len);

        self.reverb = ReverbSettings {
            room_size: params.reverb_size.clamp(0.0, 1.0),
            damping: params.reverb_damping.clamp(0.0, 1.0),
            wet_level: wet,
            dry_level: 1.0 - wet,
            width: params.reverb_width.clamp(0.0, 1.0),
        };
    }

    /// Settings for the external reverb after the last block
    pub fn reverb_settings(&self) -> ReverbSettings {
        self.reverb
    }

    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
        self.reverb_wet.reset_to(0.0);
        self.reverb = ReverbSettings::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config() -> ProcessorConfig {
        ProcessorConfig::new(8000.0, 128, 2)
    }

    fn block(len: usize) -> Vec<Vec<f32>> {
        (0..2)
            .map(|c| (0..len).map(|i| ((i + c * 7) as f32 * 0.13).sin() * 0.5).collect())
            .collect()
    }

    #[test]
    fn test_read_linear_bounds() {
        let src = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(read_linear(&src, 0.0), 0.0);
        assert_relative_eq!(read_linear(&src, 1.5), 1.5);
        assert_eq!(read_linear(&src, 3.0), 3.0);
        assert_eq!(read_linear(&src, 3.01), 0.0);
        assert_eq!(read_linear(&src, -0.5), 0.0);
        assert_eq!(read_linear(&src, f32::NAN), 0.0);
        assert_eq!(read_linear(&[], 0.0), 0.0);
    }

    #[test]
    fn test_defaults_leave_signal_untouched() {
        let mut effects = VocalEffects::new(&config());
        let input = block(128);
        let mut output = input.clone();
        effects.process(&mut output, &ParamSnapshot::default());
        assert_eq!(input, output);
    }

    #[test]
    fn test_single_voice_harmony_is_skipped() {
        let mut effects = VocalEffects::new(&config());
        let params = ParamSnapshot {
            harmony_amount: 1.0,
            harmony_voices: 1.0,
            ..ParamSnapshot::default()
        };
        let input = block(64);
        let mut output = input.clone();
        effects.process(&mut output, &params);
        assert_eq!(input, output);
    }

    #[test]
    fn test_extra_channels_untouched() {
        let mut effects = VocalEffects::new(&ProcessorConfig::new(8000.0, 64, 1));
        let params = ParamSnapshot {
            doubling_amount: 1.0,
            doubling_delay_ms: 0.0,
            ..ParamSnapshot::default()
        };
        let input = block(64);
        let mut output = input.clone();
        effects.process(&mut output, &params);
        assert_ne!(input[0], output[0]);
        assert_eq!(input[1], output[1]);
    }

    #[test]
    fn test_reverb_wet_is_smoothed() {
        let mut effects = VocalEffects::new(&config());
        let params = ParamSnapshot {
            reverb_amount: 0.8,
            reverb_size: 0.3,
            ..ParamSnapshot::default()
        };

        // 50ms ramp at 8kHz is 400 samples
        let mut data = block(100);
        effects.process(&mut data, &params);
        let first = effects.reverb_settings();
        assert_relative_eq!(first.wet_level, 0.2, epsilon = 1e-4);
        assert_relative_eq!(first.dry_level, 0.8, epsilon = 1e-4);
        assert_eq!(first.room_size, 0.3);

        for _ in 0..4 {
            effects.process(&mut data, &params);
        }
        assert_relative_eq!(effects.reverb_settings().wet_level, 0.8);
    }

    #[test]
    fn test_reset_matches_fresh_chain() {
        let params = ParamSnapshot {
            doubling_amount: 0.6,
            harmony_amount: 0.5,
            harmony_voices: 3.0,
            formant_amount: 0.4,
            formant_shift: 0.3,
            delay_mix: 0.5,
            delay_time_ms: 5.0,
            reverb_amount: 0.4,
            ..ParamSnapshot::default()
        };

        let mut fresh = VocalEffects::new(&config());
        let mut expected = block(128);
        fresh.process(&mut expected, &params);

        let mut reused = VocalEffects::new(&config());
        let mut warmup = block(300);
        reused.process(&mut warmup, &params);
        reused.reset();
        let mut actual = block(128);
        reused.process(&mut actual, &params);

        assert_eq!(expected, actual);
        assert_eq!(fresh.reverb_settings(), reused.reverb_settings());
    }

    #[test]
    fn test_configure_rejects_and_keeps_state() {
        let mut effects = VocalEffects::new(&config());
        let bad = ProcessorConfig { channels: 0, ..config() };
        assert!(effects.configure(&bad).is_err());
        assert_eq!(effects.channel_count(), 2);

        assert!(effects.configure(&ProcessorConfig::new(8000.0, 64, 3)).is_ok());
        assert_eq!(effects.channel_count(), 3);
    }
}
