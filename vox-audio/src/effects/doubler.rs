//! Vocal doubler - delayed, slowly detuned copy of the voice
//!
//! The dry voice is written into a short circular buffer and read back at
//! `delay_ms` plus a slow (0.5 Hz) cyclic offset. Sweeping the read offset
//! bends the copy's pitch: the modulation depth is chosen so the peak
//! deviation equals the requested detune plus up to 8 cents of natural drift.

use super::finite_clamp;
use std::f32::consts::PI;

/// Longest base delay in milliseconds
pub const MAX_DOUBLING_DELAY_MS: f32 = 100.0;
/// Modulation rate in Hz
const LFO_RATE_HZ: f32 = 0.5;
/// Natural pitch drift of a second take, in cents
const NATURAL_DETUNE_CENTS: f32 = 8.0;
/// Largest detune accepted, in cents
const MAX_DETUNE_CENTS: f32 = 50.0;

/// Relative pitch deviation for a detune in cents
#[inline]
fn cents_to_deviation(cents: f32) -> f32 {
    (2.0f32.powf(cents.abs() / 1200.0) - 1.0).abs()
}

/// Doubler for one channel
pub struct VocalDoubler {
    sample_rate: f32,
    /// Circular buffer: 100ms plus modulation headroom
    buffer: Vec<f32>,
    write_pos: usize,
    /// LFO phase (0.0 - 1.0)
    lfo_phase: f32,
}

impl VocalDoubler {
    /// Create a doubler for `sample_rate`
    pub fn new(sample_rate: f32) -> Self {
        let base = (MAX_DOUBLING_DELAY_MS * 0.001 * sample_rate).ceil() as usize;
        let max_depth = Self::depth_samples(sample_rate, 1.0, MAX_DETUNE_CENTS);
        let len = base + 2 * max_depth.ceil() as usize + 4;

        Self {
            sample_rate,
            buffer: vec![0.0; len],
            write_pos: 0,
            lfo_phase: 0.0,
        }
    }

    /// Read offset swing (samples) giving the wanted peak pitch deviation
    fn depth_samples(sample_rate: f32, amount: f32, detune_cents: f32) -> f32 {
        let deviation = (cents_to_deviation(detune_cents.clamp(-MAX_DETUNE_CENTS, MAX_DETUNE_CENTS))
            + cents_to_deviation(NATURAL_DETUNE_CENTS))
            * finite_clamp(amount, 0.0, 1.0, 0.0);
        // offset = D * (1 - cos(2π f t)) peaks in slope at D * 2π f / sr per sample
        deviation * sample_rate / (2.0 * PI * LFO_RATE_HZ)
    }

    /// Double `samples` in place
    pub fn process(&mut self, samples: &mut [f32], amount: f32, delay_ms: f32, detune_cents: f32) {
        let amount = finite_clamp(amount, 0.0, 1.0, 0.0);
        let delay_ms = finite_clamp(delay_ms, 0.0, MAX_DOUBLING_DELAY_MS, 0.0);
        let detune_cents = if detune_cents.is_finite() { detune_cents } else { 0.0 };

        let base = delay_ms * 0.001 * self.sample_rate;
        let depth = Self::depth_samples(self.sample_rate, amount, detune_cents);
        let phase_inc = LFO_RATE_HZ / self.sample_rate;
        let len = self.buffer.len();

        for sample in samples.iter_mut() {
            let input = *sample;
            self.buffer[self.write_pos] = input;

            let offset = base + depth * (1.0 - (2.0 * PI * self.lfo_phase).cos());
            let mut read_pos = self.write_pos as f32 - offset;
            if read_pos < 0.0 {
                read_pos += len as f32;
            }

            let index = (read_pos as usize).min(len - 1);
            let frac = read_pos - index as f32;
            let next = (index + 1) % len;
            let delayed = self.buffer[index] * (1.0 - frac) + self.buffer[next] * frac;

            *sample = input + delayed * amount;

            self.write_pos = (self.write_pos + 1) % len;
            self.lfo_phase += phase_inc;
            if self.lfo_phase >= 1.0 {
                self.lfo_phase -= 1.0;
            }
        }
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
        self.lfo_phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_buffer_covers_max_offset() {
        let sr = 48000.0;
        let doubler = VocalDoubler::new(sr);
        let max_offset = MAX_DOUBLING_DELAY_MS * 0.001 * sr + 2.0 * VocalDoubler::depth_samples(sr, 1.0, 50.0);
        assert!((doubler.buffer.len() as f32) > max_offset + 1.0);
    }

    #[test]
    fn test_depth_scales_with_amount_and_detune() {
        let sr = 44100.0;
        assert_eq!(VocalDoubler::depth_samples(sr, 0.0, 50.0), 0.0);
        let small = VocalDoubler::depth_samples(sr, 1.0, 0.0);
        let large = VocalDoubler::depth_samples(sr, 1.0, 30.0);
        assert!(small > 0.0 && large > small);
        assert_relative_eq!(
            VocalDoubler::depth_samples(sr, 1.0, -30.0),
            large,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_copy_arrives_after_delay() {
        let sr = 1000.0;
        let mut doubler = VocalDoubler::new(sr);
        let mut signal = vec![0.0; 64];
        signal[0] = 1.0;
        // Tiny amount keeps the modulation negligible over 64 samples
        doubler.process(&mut signal, 0.01, 20.0, 0.0);

        assert_relative_eq!(signal[0], 1.0, epsilon = 1e-6);
        assert!(signal[1..19].iter().all(|&s| s.abs() < 1e-6));
        assert!(signal[20] > 0.005);
    }

    #[test]
    fn test_zero_delay_reinforces_dry() {
        let mut doubler = VocalDoubler::new(44100.0);
        let mut signal = vec![0.25; 8];
        doubler.process(&mut signal, 1.0, 0.0, 0.0);
        // First sample: LFO at rest, the copy is the dry sample itself
        assert_relative_eq!(signal[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_reset_restores_fresh_state() {
        let input: Vec<f32> = (0..256).map(|i| (i as f32 * 0.07).sin()).collect();

        let mut fresh = VocalDoubler::new(8000.0);
        let mut expected = input.clone();
        fresh.process(&mut expected, 0.7, 10.0, 12.0);

        let mut reused = VocalDoubler::new(8000.0);
        let mut warmup = vec![0.9; 300];
        reused.process(&mut warmup, 1.0, 30.0, -20.0);
        reused.reset();
        let mut actual = input.clone();
        reused.process(&mut actual, 0.7, 10.0, 12.0);

        assert_eq!(expected, actual);
    }

    #[test]
    fn test_non_finite_settings_are_neutralized() {
        let input: Vec<f32> = (0..128).map(|i| (i as f32 * 0.11).sin()).collect();

        let mut doubler = VocalDoubler::new(8000.0);
        let mut out = input.clone();
        doubler.process(&mut out, f32::NAN, 10.0, 5.0);
        assert_eq!(out, input);

        let mut doubler = VocalDoubler::new(8000.0);
        let mut out = input.clone();
        doubler.process(&mut out, 0.5, f32::NAN, f32::INFINITY);
        assert!(out.iter().all(|s| s.is_finite()));
    }
}
