//! Coarse formant shift
//!
//! Resamples the dry block at `1 + shift * 0.5` and cross-fades it with the
//! input. No envelope preservation. Like the harmony voices it reads at
//! `i * ratio`, so a positive shift raises the formants.

use super::read_linear;

/// Shifts below this magnitude are ignored
const MIN_SHIFT: f32 = 0.01;
/// Amounts below this are ignored
const MIN_AMOUNT: f32 = 0.01;

/// Resampling formant shifter
pub struct FormantShifter {
    /// Dry copy of the chunk being processed
    dry: Vec<f32>,
}

impl FormantShifter {
    /// Create a shifter for blocks of up to `block_size` samples
    pub fn new(block_size: usize) -> Self {
        Self {
            dry: vec![0.0; block_size.max(1)],
        }
    }

    /// Resampling ratio for a shift in -1.0..=1.0
    #[inline]
    pub fn ratio(shift: f32) -> f32 {
        1.0 + shift.clamp(-1.0, 1.0) * 0.5
    }

    /// Apply `shift` (-1.0 - 1.0) blended by `amount` (0.0 - 1.0)
    pub fn process(&mut self, samples: &mut [f32], shift: f32, amount: f32) {
        if !(shift.abs() >= MIN_SHIFT) || !(amount >= MIN_AMOUNT) {
            return;
        }

        let amount = amount.min(1.0);
        let ratio = Self::ratio(shift);
        let chunk_size = self.dry.len();

        for chunk in samples.chunks_mut(chunk_size) {
            let dry = &mut self.dry[..chunk.len()];
            dry.copy_from_slice(chunk);

            for (i, sample) in chunk.iter_mut().enumerate() {
                let shifted = read_linear(dry, i as f32 * ratio);
                *sample = *sample * (1.0 - amount) + shifted * amount;
            }
        }
    }

    pub fn reset(&mut self) {
        self.dry.fill(0.0);
    }
}
