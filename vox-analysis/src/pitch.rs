//! Monophonic pitch estimation
//!
//! Two interchangeable time-domain estimators over the lag range of a
//! singing voice (80 Hz - 2 kHz):
//!
//! 1. **Autocorrelation** - mean product of the signal with a lagged copy,
//!    normalized by the signal energy. The best lag is the first peak that
//!    reaches 90% of the global maximum, which keeps the estimate off
//!    sub-harmonics.
//! 2. **Difference function** (YIN-style) - mean squared difference between
//!    the signal and a lagged copy, normalized so silence never looks
//!    periodic. The best lag is the first dip close to the global minimum.
//!
//! Both refine the winning lag with parabolic interpolation.
//!
//! A fused confidence score combines autocorrelation strength around the
//! detected period, a difference-function confidence and a harmonicity
//! measure over the first 8 multiples of the period.

use crate::error::{check_sample_rate, AnalysisError};

/// Lowest frequency accepted by range gating
pub const MIN_FREQUENCY_HZ: f32 = 80.0;
/// Highest frequency accepted by range gating
pub const MAX_FREQUENCY_HZ: f32 = 2000.0;
/// Inputs shorter than this never produce a confidence score
pub const MIN_CONFIDENCE_SAMPLES: usize = 1024;

/// Normalized correlation a candidate must exceed
const AUTOCORRELATION_THRESHOLD: f32 = 0.1;
/// Normalized difference a candidate must stay below
const DIFFERENCE_THRESHOLD: f32 = 0.1;
/// Fraction of the global correlation maximum the first peak must reach
const PEAK_PICK_RATIO: f32 = 0.9;
/// How far above the global minimum the first accepted dip may lie
const DIP_TOLERANCE: f32 = 0.1;
/// Search radius (samples) around the period when re-scoring confidence
const RESCORE_RADIUS: usize = 2;
/// Number of period multiples summed for harmonicity
const HARMONICS: usize = 8;

/// Confidence metric weights: autocorrelation, difference, harmonicity
const WEIGHT_AUTOCORRELATION: f32 = 0.4;
const WEIGHT_DIFFERENCE: f32 = 0.3;
const WEIGHT_HARMONICITY: f32 = 0.3;

/// Estimation algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum PitchAlgorithm {
    /// Normalized autocorrelation (default)
    #[default]
    Autocorrelation,
    /// YIN-style squared difference function
    Difference,
}

/// Result of one estimation pass
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PitchEstimate {
    /// Detected frequency in Hz (0.0 when nothing reliable was found)
    pub frequency_hz: f32,
    /// Fused confidence (0.0 - 1.0)
    pub confidence: f32,
    /// True when the frequency is in range and confident enough
    pub detected: bool,
}

impl PitchEstimate {
    /// "No reliable pitch"
    pub const NONE: Self = Self {
        frequency_hz: 0.0,
        confidence: 0.0,
        detected: false,
    };
}

/// Check whether a frequency passes range gating
#[inline]
pub fn is_in_range(frequency_hz: f32) -> bool {
    (MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&frequency_hz)
}

/// Pitch estimator with pre-allocated lag buffers
pub struct PitchEstimator {
    sample_rate: f32,
    algorithm: PitchAlgorithm,
    min_confidence: f32,
    /// First lag searched (2 kHz period)
    min_lag: usize,
    /// One past the last lag searched (80 Hz period)
    max_lag: usize,
    /// Normalized correlation per lag (reused every pass)
    correlation: Vec<f32>,
    /// Normalized difference per lag (reused every pass)
    difference: Vec<f32>,
}

impl PitchEstimator {
    /// Create an estimator for `sample_rate`
    pub fn new(sample_rate: f64) -> Result<Self, AnalysisError> {
        check_sample_rate(sample_rate)?;

        let min_lag = ((sample_rate / MAX_FREQUENCY_HZ as f64) as usize).max(1);
        let max_lag = ((sample_rate / MIN_FREQUENCY_HZ as f64) as usize).max(min_lag);

        // One extra slot on each side for parabolic interpolation
        Ok(Self {
            sample_rate: sample_rate as f32,
            algorithm: PitchAlgorithm::default(),
            min_confidence: 0.3,
            min_lag,
            max_lag,
            correlation: vec![0.0; max_lag + 2],
            difference: vec![0.0; max_lag + 2],
        })
    }

    /// Select the estimation algorithm
    pub fn set_algorithm(&mut self, algorithm: PitchAlgorithm) {
        self.algorithm = algorithm;
    }

    pub fn algorithm(&self) -> PitchAlgorithm {
        self.algorithm
    }

    /// Minimum fused confidence for `detected` (0.0 - 1.0)
    pub fn set_min_confidence(&mut self, min_confidence: f32) {
        self.min_confidence = if min_confidence.is_finite() {
            min_confidence.clamp(0.0, 1.0)
        } else {
            0.3
        };
    }

    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Estimate pitch and confidence of `samples`
    pub fn estimate(&mut self, samples: &[f32]) -> PitchEstimate {
        if samples.len() < MIN_CONFIDENCE_SAMPLES {
            return PitchEstimate::NONE;
        }

        let frequency = match self.algorithm {
            PitchAlgorithm::Autocorrelation => self.autocorrelation_pitch(samples),
            PitchAlgorithm::Difference => self.difference_pitch(samples),
        };

        if frequency <= 0.0 {
            return PitchEstimate::NONE;
        }

        let confidence = self.confidence(samples, frequency);
        if is_in_range(frequency) && confidence >= self.min_confidence {
            PitchEstimate {
                frequency_hz: frequency,
                confidence,
                detected: true,
            }
        } else {
            PitchEstimate {
                frequency_hz: 0.0,
                confidence,
                detected: false,
            }
        }
    }

    /// Autocorrelation estimator. Returns 0.0 when nothing clears the threshold.
    pub fn autocorrelation_pitch(&mut self, samples: &[f32]) -> f32 {
        let Some((lo, hi)) = self.lag_bounds(samples.len()) else {
            return 0.0;
        };
        let energy = mean_energy(samples);
        if energy <= f64::EPSILON {
            return 0.0;
        }

        for lag in lo - 1..=hi {
            self.correlation[lag] = (mean_product(samples, lag) / energy) as f32;
        }

        let corr = &self.correlation;
        let (mut best_lag, mut best) = (lo, f32::MIN);
        for (lag, &c) in corr.iter().enumerate().take(hi).skip(lo) {
            if c > best {
                best = c;
                best_lag = lag;
            }
        }

        if best <= AUTOCORRELATION_THRESHOLD {
            return 0.0;
        }

        // First peak close to the maximum (avoids picking a multiple of the period)
        let floor = best * PEAK_PICK_RATIO;
        let chosen = (lo..hi)
            .find(|&lag| corr[lag] >= floor && corr[lag] >= corr[lag - 1] && corr[lag] >= corr[lag + 1])
            .unwrap_or(best_lag);

        let period = refine_lag(chosen, corr[chosen - 1], corr[chosen], corr[chosen + 1]);
        self.sample_rate / period
    }

    /// Difference-function estimator. Returns 0.0 when nothing clears the threshold.
    pub fn difference_pitch(&mut self, samples: &[f32]) -> f32 {
        let Some((lo, hi)) = self.lag_bounds(samples.len()) else {
            return 0.0;
        };
        let energy = mean_energy(samples);
        if energy <= f64::EPSILON {
            return 0.0;
        }

        for lag in lo - 1..=hi {
            self.difference[lag] = (mean_squared_difference(samples, lag) / (2.0 * energy)) as f32;
        }

        let diff = &self.difference;
        let (mut min_lag, mut min) = (lo, f32::MAX);
        for (lag, &d) in diff.iter().enumerate().take(hi).skip(lo) {
            if d < min {
                min = d;
                min_lag = lag;
            }
        }

        if min >= DIFFERENCE_THRESHOLD {
            return 0.0;
        }

        let ceiling = min + DIP_TOLERANCE;
        let chosen = (lo..hi)
            .find(|&lag| diff[lag] <= ceiling && diff[lag] <= diff[lag - 1] && diff[lag] <= diff[lag + 1])
            .unwrap_or(min_lag);

        let period = refine_lag(chosen, diff[chosen - 1], diff[chosen], diff[chosen + 1]);
        self.sample_rate / period
    }

    /// Fused confidence of `frequency_hz` being the fundamental of `samples`
    pub fn confidence(&self, samples: &[f32], frequency_hz: f32) -> f32 {
        if samples.len() < MIN_CONFIDENCE_SAMPLES || !(frequency_hz > 0.0) {
            return 0.0;
        }

        let energy = mean_energy(samples);
        if energy <= f64::EPSILON {
            return 0.0;
        }

        let period = self.sample_rate / frequency_hz;
        let center = period.round() as usize;
        let lo = center.saturating_sub(RESCORE_RADIUS).max(1);
        let hi = (center + RESCORE_RADIUS).min(samples.len() - 1);
        if lo > hi {
            return 0.0;
        }

        let mut strength = f32::MIN;
        let mut min_difference = f32::MAX;
        for lag in lo..=hi {
            strength = strength.max((mean_product(samples, lag) / energy) as f32);
            min_difference =
                min_difference.min((mean_squared_difference(samples, lag) / (2.0 * energy)) as f32);
        }

        let autocorrelation_score = (strength * 2.0).clamp(0.0, 1.0);
        let difference_score = (1.0 - min_difference * 10.0).clamp(0.0, 1.0);
        let harmonicity_score = (harmonicity(samples, period) * 10.0).clamp(0.0, 1.0);

        (WEIGHT_AUTOCORRELATION * autocorrelation_score
            + WEIGHT_DIFFERENCE * difference_score
            + WEIGHT_HARMONICITY * harmonicity_score)
            .clamp(0.0, 1.0)
    }

    /// Searchable lag range `[lo, hi)` for an input of `len` samples.
    /// Guarantees `lo >= 1` and `hi + 1 < len` so neighbours are valid.
    fn lag_bounds(&self, len: usize) -> Option<(usize, usize)> {
        let lo = self.min_lag.max(1);
        let hi = self.max_lag.min(len / 2);
        (lo < hi && hi + 1 < len).then_some((lo, hi))
    }
}

/// Mean of x² over the whole input
#[inline]
fn mean_energy(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&s| s as f64 * s as f64).sum::<f64>() / samples.len() as f64
}

/// Mean product of the signal with itself shifted by `lag`
#[inline]
fn mean_product(samples: &[f32], lag: usize) -> f64 {
    let count = samples.len().saturating_sub(lag);
    if count == 0 {
        return 0.0;
    }
    lagged_product_sum(samples, lag) / count as f64
}

/// Mean squared difference between the signal and itself shifted by `lag`
#[inline]
fn mean_squared_difference(samples: &[f32], lag: usize) -> f64 {
    let count = samples.len().saturating_sub(lag);
    if count == 0 {
        return 0.0;
    }
    let sum: f64 = samples[..count]
        .iter()
        .zip(&samples[lag..])
        .map(|(&a, &b)| {
            let d = a as f64 - b as f64;
            d * d
        })
        .sum();
    sum / count as f64
}

#[inline]
fn lagged_product_sum(samples: &[f32], lag: usize) -> f64 {
    let count = samples.len().saturating_sub(lag);
    samples[..count]
        .iter()
        .zip(&samples[lag..])
        .map(|(&a, &b)| a as f64 * b as f64)
        .sum()
}

/// Energy found at the first 8 multiples of `period`, relative to total energy
fn harmonicity(samples: &[f32], period: f32) -> f32 {
    let total: f64 = samples.iter().map(|&s| s as f64 * s as f64).sum();
    if total <= f64::EPSILON {
        return 0.0;
    }

    let mut sum = 0.0f64;
    for h in 1..=HARMONICS {
        let lag = (period * h as f32).round() as usize;
        if lag == 0 || lag >= samples.len() {
            break;
        }
        sum += lagged_product_sum(samples, lag);
    }

    (sum / total) as f32
}

/// Parabolic interpolation around an extremum at `lag`
#[inline]
fn refine_lag(lag: usize, prev: f32, center: f32, next: f32) -> f32 {
    let denom = prev - 2.0 * center + next;
    if denom.abs() <= f32::EPSILON {
        return lag as f32;
    }
    let offset = (0.5 * (prev - next) / denom).clamp(-0.5, 0.5);
    lag as f32 + offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SR: f64 = 44100.0;

    fn sine(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / SR as f32).sin())
            .collect()
    }

    fn noise(len: usize) -> Vec<f32> {
        let mut state = 0x1234_5678u32;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn test_sine_accuracy_autocorrelation() {
        let mut est = PitchEstimator::new(SR).unwrap();
        for freq in [110.0, 196.0, 261.63, 440.0, 523.25, 880.0, 1318.5, 1760.0] {
            let result = est.estimate(&sine(freq, 0.8, 4410));
            assert!(result.detected, "{} Hz not detected", freq);
            let error = (result.frequency_hz - freq).abs() / freq;
            assert!(error <= 0.01, "{} Hz estimated as {}", freq, result.frequency_hz);
            assert!(result.confidence > 0.5, "{} Hz confidence {}", freq, result.confidence);
        }
    }

    #[test]
    fn test_sine_accuracy_difference() {
        let mut est = PitchEstimator::new(SR).unwrap();
        est.set_algorithm(PitchAlgorithm::Difference);
        for freq in [110.0, 220.0, 440.0, 987.77, 1500.0] {
            let result = est.estimate(&sine(freq, 0.5, 4410));
            assert!(result.detected, "{} Hz not detected", freq);
            let error = (result.frequency_hz - freq).abs() / freq;
            assert!(error <= 0.01, "{} Hz estimated as {}", freq, result.frequency_hz);
            assert!(result.confidence > 0.5);
        }
    }

    #[test]
    fn test_harmonic_rich_signal_finds_fundamental() {
        let mut est = PitchEstimator::new(SR).unwrap();
        let freq = 200.0;
        let signal: Vec<f32> = (0..4410)
            .map(|i| {
                let t = i as f32 / SR as f32;
                0.5 * (2.0 * PI * freq * t).sin()
                    + 0.3 * (2.0 * PI * 2.0 * freq * t).sin()
                    + 0.2 * (2.0 * PI * 3.0 * freq * t).sin()
            })
            .collect();

        let result = est.estimate(&signal);
        assert!(result.detected);
        assert!((result.frequency_hz - freq).abs() / freq < 0.01, "got {}", result.frequency_hz);
    }

    #[test]
    fn test_short_input_has_zero_confidence() {
        let mut est = PitchEstimator::new(SR).unwrap();
        let result = est.estimate(&sine(440.0, 0.8, 1023));
        assert_eq!(result.confidence, 0.0);
        assert!(!result.detected);
        assert_eq!(est.confidence(&sine(440.0, 0.8, 512), 440.0), 0.0);
    }

    #[test]
    fn test_silence_is_not_detected() {
        let mut est = PitchEstimator::new(SR).unwrap();
        let silence = vec![0.0; 4410];
        assert_eq!(est.estimate(&silence), PitchEstimate::NONE);
        assert_eq!(est.autocorrelation_pitch(&silence), 0.0);
        assert_eq!(est.difference_pitch(&silence), 0.0);
    }

    #[test]
    fn test_noise_is_not_detected() {
        let mut est = PitchEstimator::new(SR).unwrap();
        let signal = noise(4410);
        assert!(!est.estimate(&signal).detected);

        est.set_algorithm(PitchAlgorithm::Difference);
        assert!(!est.estimate(&signal).detected);
    }

    #[test]
    fn test_out_of_range_is_gated() {
        let mut est = PitchEstimator::new(SR).unwrap();
        // 50 Hz is below the searched lag range
        let result = est.estimate(&sine(50.0, 0.8, 4410));
        assert!(!result.detected);
        assert_eq!(result.frequency_hz, 0.0);
    }

    #[test]
    fn test_confidence_bounds() {
        let est = PitchEstimator::new(SR).unwrap();
        let signal = sine(330.0, 0.9, 4410);
        for f in [100.0, 330.0, 660.0, 1500.0] {
            let c = est.confidence(&signal, f);
            assert!((0.0..=1.0).contains(&c));
        }
        assert!(est.confidence(&noise(4410), 330.0) < 0.5);
    }

    #[test]
    fn test_min_confidence_setter() {
        let mut est = PitchEstimator::new(SR).unwrap();
        est.set_min_confidence(2.0);
        assert_eq!(est.min_confidence(), 1.0);
        est.set_min_confidence(f32::NAN);
        assert!(est.min_confidence().is_finite());
    }

    #[test]
    fn test_range_gate() {
        assert!(is_in_range(80.0));
        assert!(is_in_range(2000.0));
        assert!(!is_in_range(79.9));
        assert!(!is_in_range(2000.1));
        assert!(!is_in_range(f32::NAN));
    }

    #[test]
    fn test_refine_lag_symmetric_is_exact() {
        assert_eq!(refine_lag(10, 0.5, 1.0, 0.5), 10.0);
        assert!(refine_lag(10, 0.4, 1.0, 0.6) > 10.0);
    }
}
