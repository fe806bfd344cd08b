//! Feedback echo with a low-passed feedback path
//!
//! Single tap read at the delay time; the tap is low-passed (one pole),
//! fed back into the line and mixed with the dry input.

use super::finite_clamp;
use std::f32::consts::PI;

/// Maximum delay time in seconds
pub const MAX_DELAY_SECS: f32 = 2.0;
/// Cutoff used when the requested one is not a number
const FALLBACK_CUTOFF_HZ: f32 = 8000.0;
/// Lowest filter cutoff
const MIN_CUTOFF_HZ: f32 = 20.0;

/// Mono feedback delay line
pub struct FeedbackDelayLine {
    sample_rate: f32,
    /// Circular buffer (2 seconds)
    buffer: Vec<f32>,
    write_pos: usize,
    /// One-pole low-pass state on the delayed signal
    filter_state: f32,
}

impl FeedbackDelayLine {
    /// Create a delay line for `sample_rate`
    pub fn new(sample_rate: f32) -> Self {
        let len = ((sample_rate * MAX_DELAY_SECS) as usize).max(2);
        Self {
            sample_rate,
            buffer: vec![0.0; len],
            write_pos: 0,
            filter_state: 0.0,
        }
    }

    /// Delay in whole samples for `delay_ms`, at least 1
    pub fn delay_samples(&self, delay_ms: f32) -> usize {
        let samples = (delay_ms.max(0.0) * 0.001 * self.sample_rate).round() as usize;
        samples.clamp(1, self.buffer.len() - 1)
    }

    /// Echo `samples` in place
    pub fn process(&mut self, samples: &mut [f32], delay_ms: f32, feedback: f32, mix: f32, filter_cutoff_hz: f32) {
        let delay = self.delay_samples(delay_ms);
        let feedback = finite_clamp(feedback, 0.0, 0.95, 0.0);
        let mix = finite_clamp(mix, 0.0, 1.0, 0.0);
        let nyquist = self.sample_rate * 0.5;
        let cutoff = finite_clamp(
            filter_cutoff_hz,
            MIN_CUTOFF_HZ,
            nyquist,
            FALLBACK_CUTOFF_HZ.min(nyquist),
        );
        let coeff = 1.0 - (-2.0 * PI * cutoff / self.sample_rate).exp();
        let len = self.buffer.len();

        for sample in samples.iter_mut() {
            let read_pos = (self.write_pos + len - delay) % len;
            let delayed = self.buffer[read_pos];

            self.filter_state += coeff * (delayed - self.filter_state);
            let filtered = self.filter_state;

            let input = *sample;
            self.buffer[self.write_pos] = input + filtered * feedback;
            self.write_pos = (self.write_pos + 1) % len;

            *sample = input * (1.0 - mix) + filtered * mix;
        }
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
        self.filter_state = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(len: usize) -> Vec<f32> {
        let mut v = vec![0.0; len];
        v[0] = 1.0;
        v
    }

    #[test]
    fn test_delay_samples_minimum_one() {
        let delay = FeedbackDelayLine::new(1000.0);
        assert_eq!(delay.delay_samples(0.0), 1);
        assert_eq!(delay.delay_samples(10.0), 10);
        assert_eq!(delay.delay_samples(5000.0), 1999);
    }

    #[test]
    fn test_echo_arrives_after_delay() {
        let mut delay = FeedbackDelayLine::new(1000.0);
        let mut signal = impulse(64);
        // Cutoff at Nyquist keeps the filter nearly transparent
        delay.process(&mut signal, 10.0, 0.0, 1.0, 500.0);

        assert_eq!(signal[..10].iter().filter(|s| s.abs() > 1e-6).count(), 0);
        assert!(signal[10] > 0.5);
    }

    #[test]
    fn test_zero_mix_is_dry() {
        let mut delay = FeedbackDelayLine::new(1000.0);
        let input: Vec<f32> = (0..50).map(|i| (i as f32 * 0.2).sin()).collect();
        let mut out = input.clone();
        delay.process(&mut out, 5.0, 0.5, 0.0, 8000.0);
        assert_eq!(out, input);
    }

    #[test]
    fn test_feedback_repeats_decay() {
        let mut delay = FeedbackDelayLine::new(1000.0);
        let mut signal = impulse(100);
        delay.process(&mut signal, 20.0, 0.5, 1.0, 500.0);

        let first: f32 = signal[18..30].iter().map(|s| s.abs()).sum();
        let second: f32 = signal[38..50].iter().map(|s| s.abs()).sum();
        assert!(first > 0.5);
        assert!(second > 0.1 && second < first);
    }

    #[test]
    fn test_reset_clears_tail() {
        let mut delay = FeedbackDelayLine::new(1000.0);
        let mut signal = impulse(5);
        delay.process(&mut signal, 10.0, 0.9, 1.0, 500.0);
        delay.reset();

        let mut silence = vec![0.0; 40];
        delay.process(&mut silence, 10.0, 0.9, 1.0, 500.0);
        assert!(silence.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_non_finite_settings_stay_finite() {
        let input: Vec<f32> = (0..64).map(|i| (i as f32 * 0.3).sin()).collect();

        let mut delay = FeedbackDelayLine::new(1000.0);
        let mut out = input.clone();
        delay.process(&mut out, 5.0, f32::NAN, f32::NAN, 8000.0);
        assert_eq!(out, input);

        let mut delay = FeedbackDelayLine::new(1000.0);
        let mut out = input.clone();
        delay.process(&mut out, f32::NAN, f32::INFINITY, 1.0, f32::NAN);
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_low_sample_rate_bounds_cutoff() {
        // Nyquist (15 Hz) sits below the lowest cutoff
        let mut delay = FeedbackDelayLine::new(30.0);
        let mut signal = impulse(40);
        delay.process(&mut signal, 100.0, 0.5, 1.0, 8000.0);
        assert!(signal.iter().all(|s| s.is_finite()));
        assert!(signal[3].abs() > 0.1);
    }
}
