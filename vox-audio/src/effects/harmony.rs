//! Harmony voices by block resampling
//!
//! Each voice is a resampled copy of the dry block at a fixed interval from
//! the root. This is a cheap approximation: the block is read faster (or
//! slower), so a raised voice ends early and a lowered one covers only part
//! of the block. Reading at `i * ratio` (not `i / ratio`) is deliberate so a
//! ratio of 2.0 sounds an octave up.

use super::{finite_clamp, read_linear};

/// Maximum simultaneous voices (root included)
pub const MAX_VOICES: usize = 8;
/// Widest interval between neighbouring voices, in semitones
const MAX_INTERVAL_SEMITONES: f32 = 12.0;
/// Widest per-voice detune, in cents
const MAX_DETUNE_CENTS: f32 = 50.0;

/// One harmony voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    /// Playback ratio (2.0 = one octave up)
    pub pitch_ratio: f32,
    /// Offset from the dry signal (voices are time-aligned)
    pub delay_samples: usize,
    /// Mix gain
    pub gain: f32,
}

impl Voice {
    /// Derive voice `index` of `voice_count`
    pub fn derive(index: usize, voice_count: usize, amount: f32, interval_semitones: f32, detune_cents: f32) -> Self {
        let pitch_ratio = if index == 0 {
            1.0
        } else {
            let v = index as f32;
            2.0f32.powf((interval_semitones * v + detune_cents * v / 100.0) / 12.0)
        };

        Self {
            pitch_ratio,
            delay_samples: 0,
            gain: amount / voice_count.max(1) as f32,
        }
    }
}

/// Bank of up to 8 resampled voices
pub struct HarmonyVoiceBank {
    /// Dry copy of the chunk being processed
    dry: Vec<f32>,
}

impl HarmonyVoiceBank {
    /// Create a bank for blocks of up to `block_size` samples
    pub fn new(block_size: usize) -> Self {
        Self {
            dry: vec![0.0; block_size.max(1)],
        }
    }

    pub fn block_size(&self) -> usize {
        self.dry.len()
    }

    /// Add `voice_count` voices to `samples`
    pub fn mix(
        &mut self,
        samples: &mut [f32],
        voice_count: usize,
        amount: f32,
        interval_semitones: f32,
        detune_cents: f32,
    ) {
        let voice_count = voice_count.clamp(1, MAX_VOICES);
        let amount = finite_clamp(amount, 0.0, 1.0, 0.0);
        if samples.is_empty() || amount <= 0.0 {
            return;
        }
        let interval_semitones =
            finite_clamp(interval_semitones, -MAX_INTERVAL_SEMITONES, MAX_INTERVAL_SEMITONES, 0.0);
        let detune_cents = finite_clamp(detune_cents, -MAX_DETUNE_CENTS, MAX_DETUNE_CENTS, 0.0);

        let chunk_size = self.dry.len();
        for chunk in samples.chunks_mut(chunk_size) {
            let dry = &mut self.dry[..chunk.len()];
            dry.copy_from_slice(chunk);

            for index in 0..voice_count {
                let voice = Voice::derive(index, voice_count, amount, interval_semitones, detune_cents);
                for (i, sample) in chunk.iter_mut().enumerate() {
                    *sample += read_linear(dry, i as f32 * voice.pitch_ratio) * voice.gain;
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.dry.fill(0.0);
    }
}
