//! Top-level vocal processor
//!
//! Signal flow per block:
//! input gain → pitch correction → effects chain → output gain
//!
//! `configure` allocates everything; `process` is real-time safe (no
//! allocation, locking or logging) and a no-op until configured.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ProcessorConfig;
use crate::effects::{ReverbSettings, VocalEffects};
use crate::error::ConfigError;
use crate::meter::AnalysisMeter;
use crate::params::VocalParams;
use crate::smoother::RatioSmoother;
use crate::tuner::PitchTuner;

/// Gain ramp length
const GAIN_RAMP_MS: f32 = 50.0;

/// Everything sized by `configure`
struct ProcessorState {
    config: ProcessorConfig,
    tuner: PitchTuner,
    effects: VocalEffects,
    input_gain: RatioSmoother,
    output_gain: RatioSmoother,
}

fn gain_smoother(sample_rate: f64, initial: f32) -> RatioSmoother {
    let mut smoother = RatioSmoother::new(sample_rate as f32, initial);
    smoother.set_ramp_ms(GAIN_RAMP_MS);
    smoother
}

/// Apply a ramped gain to every channel, advancing `gain` by the block length
fn apply_gain<C: AsMut<[f32]>>(block: &mut [C], gain: &mut RatioSmoother, len: usize) {
    if !gain.is_smoothing() && gain.current() == 1.0 {
        return;
    }

    for channel in block.iter_mut() {
        // Each channel walks its own copy of the ramp
        let mut ramp = gain.clone();
        for sample in channel.as_mut().iter_mut() {
            *sample *= ramp.next_value();
        }
    }
    gain.skip(len);
}

/// Real-time vocal pitch correction and harmonization
pub struct VocalProcessor {
    params: Arc<VocalParams>,
    meter: Arc<AnalysisMeter>,
    state: Option<ProcessorState>,
}

impl VocalProcessor {
    /// Create an unconfigured processor reading `params`
    pub fn new(params: Arc<VocalParams>) -> Self {
        Self {
            params,
            meter: Arc::new(AnalysisMeter::new()),
            state: None,
        }
    }

    /// Allocate all buffers for `config`. On error the previous state is kept.
    pub fn configure(&mut self, config: ProcessorConfig) -> Result<(), ConfigError> {
        let tuner = match PitchTuner::new(&config) {
            Ok(tuner) => tuner,
            Err(e) => {
                warn!("Rejected processor configuration {:?}: {}", config, e);
                return Err(e);
            }
        };

        let snapshot = self.params.snapshot();
        self.state = Some(ProcessorState {
            config,
            tuner,
            effects: VocalEffects::new(&config),
            input_gain: gain_smoother(config.sample_rate, snapshot.input_gain()),
            output_gain: gain_smoother(config.sample_rate, snapshot.output_gain()),
        });
        self.meter.reset();

        info!(
            "Vocal processor configured: {} Hz, block {}, {} channel(s), frame {}",
            config.sample_rate, config.block_size, config.channels, config.frame_size
        );
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.state.is_some()
    }

    pub fn config(&self) -> Option<ProcessorConfig> {
        self.state.as_ref().map(|s| s.config)
    }

    /// Process one block in place. Channels beyond the configured count are untouched.
    pub fn process<C: AsMut<[f32]>>(&mut self, block: &mut [C]) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        let channels = block.len().min(state.config.channels);
        let block = &mut block[..channels];
        let len = block.iter_mut().map(|c| c.as_mut().len()).max().unwrap_or(0);
        if len == 0 {
            return;
        }

        let params = self.params.snapshot();
        if params.bypass {
            return;
        }

        state.input_gain.set_target(params.input_gain());
        apply_gain(block, &mut state.input_gain, len);

        if params.correction_enabled {
            state.tuner.process(block, &params);
        }

        state.effects.process(block, &params);

        state.output_gain.set_target(params.output_gain());
        apply_gain(block, &mut state.output_gain, len);

        self.meter
            .publish(&state.tuner.estimate(), state.tuner.current_ratio());
    }

    /// Clear all processing state without reallocating
    pub fn reset(&mut self) {
        let snapshot = self.params.snapshot();
        if let Some(state) = self.state.as_mut() {
            state.tuner.reset();
            state.effects.reset();
            state.input_gain.reset_to(snapshot.input_gain());
            state.output_gain.reset_to(snapshot.output_gain());
            debug!("Vocal processor reset");
        }
        self.meter.reset();
    }

    /// Shared parameter store
    pub fn params(&self) -> &Arc<VocalParams> {
        &self.params
    }

    /// Published analysis results
    pub fn meter(&self) -> &Arc<AnalysisMeter> {
        &self.meter
    }

    /// Settings for the external reverb
    pub fn reverb_settings(&self) -> ReverbSettings {
        self.state
            .as_ref()
            .map_or_else(ReverbSettings::default, |s| s.effects.reverb_settings())
    }

    /// Delay introduced by pitch correction, in samples
    pub fn latency_samples(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.tuner.latency_samples())
    }
}
