//! Linear parameter ramps
//!
//! A value that glides linearly to a new target over a fixed ramp length.
//! Changing the target restarts the ramp from the current value, so the
//! pitch ratio never jumps between blocks.

/// Shortest correction ramp (speed = 1.0)
pub const MIN_RAMP_MS: f32 = 1.0;
/// Longest correction ramp (speed = 0.0)
pub const MAX_RAMP_MS: f32 = 100.0;

/// Ramp length in milliseconds for a correction speed (0.0 - 1.0)
#[inline]
pub fn speed_to_ramp_ms(speed: f32) -> f32 {
    let speed = if speed.is_finite() { speed.clamp(0.0, 1.0) } else { 0.5 };
    MIN_RAMP_MS + (MAX_RAMP_MS - MIN_RAMP_MS) * (1.0 - speed)
}

/// Linearly ramped value (pitch ratios, gains)
#[derive(Debug, Clone)]
pub struct RatioSmoother {
    sample_rate: f32,
    current: f32,
    target: f32,
    /// Increment per sample while ramping
    step: f32,
    /// Samples left in the current ramp
    remaining: usize,
    /// Ramp length in samples
    ramp_samples: usize,
}

impl RatioSmoother {
    /// Create a smoother resting at `initial`
    pub fn new(sample_rate: f32, initial: f32) -> Self {
        let mut smoother = Self {
            sample_rate: sample_rate.max(1.0),
            current: initial,
            target: initial,
            step: 0.0,
            remaining: 0,
            ramp_samples: 1,
        };
        smoother.set_ramp_ms(MAX_RAMP_MS);
        smoother
    }

    /// Ramp length in milliseconds (applies to the next target change)
    pub fn set_ramp_ms(&mut self, ramp_ms: f32) {
        let ramp_ms = if ramp_ms.is_finite() { ramp_ms.max(0.0) } else { MAX_RAMP_MS };
        self.ramp_samples = ((ramp_ms * 0.001 * self.sample_rate).round() as usize).max(1);
    }

    /// Ramp length from a correction speed (0.0 = 100ms, 1.0 = 1ms)
    pub fn set_speed(&mut self, speed: f32) {
        self.set_ramp_ms(speed_to_ramp_ms(speed));
    }

    pub fn ramp_samples(&self) -> usize {
        self.ramp_samples
    }

    /// Start ramping toward `target` (ignored when unchanged or not finite)
    pub fn set_target(&mut self, target: f32) {
        if !target.is_finite() || target == self.target {
            return;
        }
        self.target = target;
        self.remaining = self.ramp_samples;
        self.step = (self.target - self.current) / self.ramp_samples as f32;
    }

    /// Advance one sample
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        if self.remaining == 0 {
            return self.target;
        }
        self.remaining -= 1;
        self.current = if self.remaining == 0 {
            self.target
        } else {
            self.current + self.step
        };
        self.current
    }

    /// Advance `samples` at once and return the new value
    pub fn skip(&mut self, samples: usize) -> f32 {
        if samples >= self.remaining {
            self.remaining = 0;
            self.current = self.target;
        } else {
            self.remaining -= samples;
            self.current += self.step * samples as f32;
        }
        self.current
    }

    /// Jump to `value` with no ramp
    pub fn reset_to(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.remaining = 0;
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn is_smoothing(&self) -> bool {
        self.remaining > 0
    }
}
