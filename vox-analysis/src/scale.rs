//! Musical scales and pitch quantization
//!
//! Snaps a detected frequency toward the nearest tone of one of 8 built-in
//! scales, relative to a root pitch class.

use std::fmt;

/// Reference frequency for A4 (440 Hz)
pub const A4_FREQUENCY: f32 = 440.0;
/// MIDI note number of A4
pub const A4_NOTE: f32 = 69.0;

/// Built-in scale, selected by index 0-7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scale {
    #[default]
    Chromatic,
    Major,
    Minor,
    Lydian,
    Dorian,
    Mixolydian,
    Phrygian,
    Locrian,
}

const CHROMATIC: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];
const MAJOR: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
const MINOR: [u8; 7] = [0, 2, 3, 5, 7, 8, 10];
const LYDIAN: [u8; 7] = [0, 2, 4, 6, 7, 9, 11];
const DORIAN: [u8; 7] = [0, 1, 3, 5, 7, 8, 10];
const MIXOLYDIAN: [u8; 7] = [0, 2, 3, 5, 7, 9, 10];
const PHRYGIAN: [u8; 7] = [0, 1, 3, 5, 6, 8, 10];
const LOCRIAN: [u8; 7] = [0, 2, 3, 6, 7, 8, 11];

impl Scale {
    /// All scales in index order
    pub const ALL: [Scale; 8] = [
        Scale::Chromatic,
        Scale::Major,
        Scale::Minor,
        Scale::Lydian,
        Scale::Dorian,
        Scale::Mixolydian,
        Scale::Phrygian,
        Scale::Locrian,
    ];

    /// Scale for index 0-7
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Semitone offsets from the root, ascending
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            Scale::Chromatic => &CHROMATIC,
            Scale::Major => &MAJOR,
            Scale::Minor => &MINOR,
            Scale::Lydian => &LYDIAN,
            Scale::Dorian => &DORIAN,
            Scale::Mixolydian => &MIXOLYDIAN,
            Scale::Phrygian => &PHRYGIAN,
            Scale::Locrian => &LOCRIAN,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scale::Chromatic => "Chromatic",
            Scale::Major => "Major",
            Scale::Minor => "Minor",
            Scale::Lydian => "Lydian",
            Scale::Dorian => "Dorian",
            Scale::Mixolydian => "Mixolydian",
            Scale::Phrygian => "Phrygian",
            Scale::Locrian => "Locrian",
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Convert frequency (Hz) to a continuous MIDI note number
#[inline]
pub fn frequency_to_note(frequency_hz: f32) -> f32 {
    A4_NOTE + 12.0 * (frequency_hz / A4_FREQUENCY).log2()
}

/// Convert a (possibly fractional) MIDI note number to frequency (Hz)
#[inline]
pub fn note_to_frequency(note: f32) -> f32 {
    A4_FREQUENCY * 2.0f32.powf((note - A4_NOTE) / 12.0)
}

/// Ratio that moves `from_hz` onto `to_hz` (1.0 when either is invalid)
#[inline]
pub fn pitch_ratio(from_hz: f32, to_hz: f32) -> f32 {
    if from_hz > 0.0 && to_hz > 0.0 && from_hz.is_finite() && to_hz.is_finite() {
        to_hz / from_hz
    } else {
        1.0
    }
}

/// Snaps frequencies toward scale tones
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaleQuantizer {
    /// Root pitch class (0-11, where 0=C)
    root: u8,
}

impl ScaleQuantizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root pitch class (0-11, where 0=C)
    pub fn root(&self) -> u8 {
        self.root
    }

    pub fn set_root(&mut self, pitch_class: u8) {
        self.root = pitch_class % 12;
    }

    /// Use the pitch class nearest to `key_center_hz` as root
    pub fn set_root_from_frequency(&mut self, key_center_hz: f32) {
        if key_center_hz > 0.0 && key_center_hz.is_finite() {
            let note = frequency_to_note(key_center_hz).round() as i32;
            self.root = note.rem_euclid(12) as u8;
        }
    }

    /// Target frequency for `frequency_hz`, blended by `strength` (0.0 - 1.0)
    pub fn quantize(&self, frequency_hz: f32, scale: Scale, strength: f32) -> f32 {
        if !(frequency_hz > 0.0) || !frequency_hz.is_finite() {
            return frequency_hz;
        }

        let strength = if strength.is_finite() {
            strength.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let target = note_to_frequency(self.nearest_note(frequency_to_note(frequency_hz), scale));
        frequency_hz + (target - frequency_hz) * strength
    }

    /// Nearest scale note to a continuous MIDI note
    pub fn nearest_note(&self, note: f32, scale: Scale) -> f32 {
        if scale == Scale::Chromatic {
            return note.round();
        }

        let offset = (note - self.root as f32).rem_euclid(12.0);
        let octave_base = note - offset;

        // Strict comparison keeps the first entry on ties
        let mut best = 0u8;
        let mut best_distance = f32::MAX;
        for &entry in scale.intervals() {
            let distance = (offset - entry as f32).abs();
            if distance < best_distance {
                best_distance = distance;
                best = entry;
            }
        }

        octave_base + best as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_note_frequency_conversion() {
        assert_relative_eq!(frequency_to_note(440.0), 69.0, epsilon = 1e-5);
        assert_relative_eq!(frequency_to_note(880.0), 81.0, epsilon = 1e-5);
        assert_relative_eq!(note_to_frequency(60.0), 261.6256, epsilon = 1e-2);
        assert_relative_eq!(note_to_frequency(frequency_to_note(317.0)), 317.0, epsilon = 1e-2);
    }

    #[test]
    fn test_chromatic_full_strength_snaps() {
        let q = ScaleQuantizer::new();
        assert_relative_eq!(q.quantize(446.0, Scale::Chromatic, 1.0), 440.0, epsilon = 1e-3);
        assert_relative_eq!(q.quantize(435.0, Scale::Chromatic, 1.0), 440.0, epsilon = 1e-3);
    }

    #[test]
    fn test_zero_strength_is_identity() {
        let q = ScaleQuantizer::new();
        for scale in Scale::ALL {
            for f in [95.0, 233.3, 446.0, 1234.5] {
                assert_eq!(q.quantize(f, scale, 0.0), f);
            }
        }
    }

    #[test]
    fn test_partial_strength_blends() {
        let q = ScaleQuantizer::new();
        let half = q.quantize(446.0, Scale::Chromatic, 0.5);
        assert_relative_eq!(half, 443.0, epsilon = 1e-3);
    }

    #[test]
    fn test_major_scale_snaps_to_table() {
        let q = ScaleQuantizer::new();
        // C# (61) is not in C major: first entry wins the tie with D
        assert_eq!(q.nearest_note(61.0, Scale::Major), 60.0);
        // A sharp C# is closer to D
        let sharp = note_to_frequency(61.3);
        assert_relative_eq!(
            q.quantize(sharp, Scale::Major, 1.0),
            note_to_frequency(62.0),
            epsilon = 1e-2
        );
        // Slightly sharp E stays on E
        let e = note_to_frequency(64.2);
        assert_relative_eq!(q.quantize(e, Scale::Major, 1.0), note_to_frequency(64.0), epsilon = 1e-2);
    }

    #[test]
    fn test_root_shifts_table() {
        let mut q = ScaleQuantizer::new();
        q.set_root_from_frequency(440.0);
        assert_eq!(q.root(), 9);
        // A# relative to A is 1 semitone: A major snaps to A
        let note = q.nearest_note(70.0, Scale::Major);
        assert_relative_eq!(note, 69.0, epsilon = 1e-4);
        // G# is the major 7th of A
        assert_relative_eq!(q.nearest_note(68.1, Scale::Major), 68.0, epsilon = 1e-4);
    }

    #[test]
    fn test_invalid_frequency_passthrough() {
        let q = ScaleQuantizer::new();
        assert_eq!(q.quantize(0.0, Scale::Major, 1.0), 0.0);
        assert_eq!(q.quantize(-5.0, Scale::Major, 1.0), -5.0);
        assert!(q.quantize(f32::NAN, Scale::Major, 1.0).is_nan());
    }

    #[test]
    fn test_scale_index_roundtrip() {
        for (i, scale) in Scale::ALL.iter().enumerate() {
            assert_eq!(Scale::from_index(i), Some(*scale));
            assert_eq!(scale.index(), i);
        }
        assert_eq!(Scale::from_index(8), None);
        assert_eq!(Scale::Chromatic.intervals().len(), 12);
        assert_eq!(Scale::Locrian.intervals(), &[0, 2, 3, 6, 7, 8, 11]);
    }

    #[test]
    fn test_pitch_ratio_guards() {
        assert_relative_eq!(pitch_ratio(220.0, 440.0), 2.0);
        assert_eq!(pitch_ratio(0.0, 440.0), 1.0);
        assert_eq!(pitch_ratio(440.0, f32::INFINITY), 1.0);
    }
}
