//! Streaming phase vocoder pitch shifter
//!
//! Shifts pitch without changing duration:
//! 1. Hann-window the last `frame_size` input samples every hop (75% overlap)
//! 2. Estimate each bin's instantaneous frequency from its phase advance
//! 3. Move each bin's magnitude to `round(k * ratio)`, scaling its frequency
//! 4. Accumulate output phases, inverse FFT, window and overlap-add
//!
//! Latency is one frame (`frame_size` samples) whether or not the ratio is
//! inside the bypass band; entering or leaving the band crossfades between
//! the resynthesized and the delayed dry signal over one hop. All buffers,
//! FFT plans and scratch space are allocated up front; `shift_in_place`
//! never allocates.

use crate::config::validate_frame_size;
use crate::error::ConfigError;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

const TWO_PI: f32 = 2.0 * PI;

/// Ratios closer to 1.0 than this output the delayed dry signal
pub const BYPASS_TOLERANCE: f32 = 0.001;

/// Hann² overlap-add sum at 75% overlap
const WINDOW_OLA_SUM: f32 = 1.5;

/// Phase vocoder pitch shifter for one channel
pub struct PhaseVocoderShifter {
    /// FFT size
    frame_size: usize,
    /// Hop size (frame_size / 4)
    hop_size: usize,
    /// Number of non-redundant bins (frame_size / 2 + 1)
    num_bins: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    /// Pre-computed Hann window (analysis and synthesis)
    window: Vec<f32>,
    /// Last `frame_size` input samples
    input_fifo: Vec<f32>,
    /// Finished output samples for the current hop
    output_fifo: Vec<f32>,
    /// Overlap-add accumulator
    output_accum: Vec<f32>,
    /// FFT working buffer
    spectrum: Vec<Complex<f32>>,
    /// Shared FFT/IFFT scratch
    scratch: Vec<Complex<f32>>,
    /// Previous analysis phase per bin
    last_phase: Vec<f32>,
    /// Accumulated synthesis phase per bin
    sum_phase: Vec<f32>,
    /// Remapped magnitudes (pre-allocated)
    synthesis_magnitude: Vec<f32>,
    /// Remapped instantaneous frequencies in rad/sample (pre-allocated)
    synthesis_omega: Vec<f32>,
    /// FIFO cursor, runs from frame_size - hop_size to frame_size
    rover: usize,
    /// Whether the last hop was resynthesized
    engaged: bool,
    /// IFFT normalization and window overlap compensation
    ola_gain: f32,
}

impl PhaseVocoderShifter {
    /// Create a shifter with a power-of-two `frame_size` (256 - 16384)
    pub fn new(frame_size: usize) -> Result<Self, ConfigError> {
        validate_frame_size(frame_size)?;

        let hop_size = frame_size / 4;
        let num_bins = frame_size / 2 + 1;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frame_size);
        let ifft = planner.plan_fft_inverse(frame_size);
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());

        let window: Vec<f32> = (0..frame_size)
            .map(|i| 0.5 * (1.0 - (TWO_PI * i as f32 / frame_size as f32).cos()))
            .collect();

        Ok(Self {
            frame_size,
            hop_size,
            num_bins,
            fft,
            ifft,
            window,
            input_fifo: vec![0.0; frame_size],
            output_fifo: vec![0.0; frame_size],
            output_accum: vec![0.0; frame_size],
            spectrum: vec![Complex::new(0.0, 0.0); frame_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            last_phase: vec![0.0; num_bins],
            sum_phase: vec![0.0; num_bins],
            synthesis_magnitude: vec![0.0; num_bins],
            synthesis_omega: vec![0.0; num_bins],
            rover: frame_size - hop_size,
            engaged: false,
            ola_gain: 1.0 / (frame_size as f32 * WINDOW_OLA_SUM),
        })
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Processing delay in samples, the same inside and outside the bypass band
    pub fn latency(&self) -> usize {
        self.frame_size
    }

    /// Start of the FIFO cursor range
    fn fifo_offset(&self) -> usize {
        self.frame_size - self.hop_size
    }

    /// Shift `samples` by `ratio` (2.0 = one octave up) in place.
    ///
    /// Ratios within `BYPASS_TOLERANCE` of 1.0 output the input delayed by
    /// `latency()`. The analysis keeps running so re-engaging starts from
    /// current phase history.
    pub fn shift_in_place(&mut self, samples: &mut [f32], ratio: f32) {
        if samples.is_empty() {
            return;
        }

        let engaged = ratio.is_finite() && ratio > 0.0 && (ratio - 1.0).abs() >= BYPASS_TOLERANCE;
        let offset = self.fifo_offset();

        for sample in samples.iter_mut() {
            self.input_fifo[self.rover] = *sample;
            *sample = self.output_fifo[self.rover - offset];
            self.rover += 1;

            if self.rover >= self.frame_size {
                self.rover = offset;
                self.process_frame(if engaged { ratio } else { 1.0 });
                self.blend_dry(engaged);
                self.input_fifo.copy_within(self.hop_size.., 0);
            }
        }
    }

    /// Analyze, remap and resynthesize one hop
    fn process_frame(&mut self, ratio: f32) {
        let n = self.frame_size;
        let hop = self.hop_size as f32;
        let bin_omega = TWO_PI / n as f32;
        let expected_advance = bin_omega * hop;

        for ((bin, &x), &w) in self.spectrum.iter_mut().zip(&self.input_fifo).zip(&self.window) {
            *bin = Complex::new(x * w, 0.0);
        }
        self.fft.process_with_scratch(&mut self.spectrum, &mut self.scratch);

        self.synthesis_magnitude.fill(0.0);
        self.synthesis_omega.fill(0.0);

        for k in 0..self.num_bins {
            let bin = self.spectrum[k];
            let magnitude = bin.norm();
            let phase = bin.arg();

            let delta = wrap_phase(phase - self.last_phase[k] - k as f32 * expected_advance);
            self.last_phase[k] = phase;

            let omega = k as f32 * bin_omega + delta / hop;
            let target = (k as f32 * ratio).round() as usize;
            if target < self.num_bins {
                self.synthesis_magnitude[target] += magnitude;
                self.synthesis_omega[target] = omega * ratio;
            }
        }

        for j in 0..self.num_bins {
            self.sum_phase[j] = wrap_phase(self.sum_phase[j] + self.synthesis_omega[j] * hop);
            self.spectrum[j] = Complex::from_polar(self.synthesis_magnitude[j], self.sum_phase[j]);
        }
        // Hermitian mirror for a real output
        for j in self.num_bins..n {
            self.spectrum[j] = self.spectrum[n - j].conj();
        }

        self.ifft.process_with_scratch(&mut self.spectrum, &mut self.scratch);

        for ((acc, bin), &w) in self.output_accum.iter_mut().zip(&self.spectrum).zip(&self.window) {
            *acc += w * bin.re * self.ola_gain;
        }

        let hop_size = self.hop_size;
        self.output_fifo[..hop_size].copy_from_slice(&self.output_accum[..hop_size]);
        self.output_accum.copy_within(hop_size.., 0);
        self.output_accum[n - hop_size..].fill(0.0);
    }

    /// Mix the finished hop with the dry samples it was built from,
    /// crossfading when the bypass state changes
    fn blend_dry(&mut self, engaged: bool) {
        let hop_size = self.hop_size;
        let (output, dry) = (&mut self.output_fifo[..hop_size], &self.input_fifo[..hop_size]);

        match (self.engaged, engaged) {
            (true, true) => {}
            (false, false) => output.copy_from_slice(dry),
            (was, _) => {
                let start = if was { 1.0 } else { 0.0 };
                let step = (1.0 - 2.0 * start) / hop_size as f32;
                for (i, (out, &x)) in output.iter_mut().zip(dry).enumerate() {
                    let wet = start + step * (i + 1) as f32;
                    *out = x + (*out - x) * wet;
                }
            }
        }
        self.engaged = engaged;
    }

    /// Zero all buffers and phase state
    pub fn reset(&mut self) {
        self.input_fifo.fill(0.0);
        self.output_fifo.fill(0.0);
        self.output_accum.fill(0.0);
        self.spectrum.fill(Complex::new(0.0, 0.0));
        self.last_phase.fill(0.0);
        self.sum_phase.fill(0.0);
        self.synthesis_magnitude.fill(0.0);
        self.synthesis_omega.fill(0.0);
        self.rover = self.fifo_offset();
        self.engaged = false;
    }
}

/// Wrap phase to [-π, π]
#[inline(always)]
fn wrap_phase(phase: f32) -> f32 {
    phase - TWO_PI * (phase / TWO_PI).round()
}
