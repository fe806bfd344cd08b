//! Factory presets
//!
//! Percent-style values (0 - 100) as shown to users; `apply` converts them
//! into the 0.0 - 1.0 parameter domain.

use crate::params::{ParamId, ParamSnapshot, VocalParams};

/// Tolerance for percent and dB values in `matches`
const VALUE_TOLERANCE: f32 = 0.05;
/// Tolerance for delay time (ms) in `matches`
const TIME_TOLERANCE_MS: f32 = 0.5;

/// One factory program
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    /// Correction strength (%)
    pub correction: f32,
    /// Correction speed (%)
    pub speed: f32,
    pub correction_enabled: bool,
    /// Reverb amount (%)
    pub reverb: f32,
    pub delay_time_ms: f32,
    /// Delay feedback (%)
    pub delay_feedback: f32,
    /// Delay wet mix (%)
    pub delay_mix: f32,
    /// Harmony amount (%)
    pub harmony: f32,
    pub harmony_voices: u8,
    pub input_gain_db: f32,
    pub output_gain_db: f32,
    pub bypass: bool,
}

#[allow(clippy::too_many_arguments)]
const fn preset(
    name: &'static str,
    correction: f32,
    speed: f32,
    reverb: f32,
    delay_time_ms: f32,
    delay_feedback: f32,
    delay_mix: f32,
    harmony: f32,
    harmony_voices: u8,
    input_gain_db: f32,
    output_gain_db: f32,
) -> Preset {
    Preset {
        name,
        correction,
        speed,
        correction_enabled: true,
        reverb,
        delay_time_ms,
        delay_feedback,
        delay_mix,
        harmony,
        harmony_voices,
        input_gain_db,
        output_gain_db,
        bypass: false,
    }
}

/// Built-in programs, index 8 restores the defaults
pub const FACTORY_PRESETS: [Preset; 13] = [
    preset("GOD - Perfect Vocal", 85.0, 70.0, 25.0, 200.0, 20.0, 50.0, 15.0, 2, 2.0, 0.0),
    preset("GOD - Studio Master", 95.0, 80.0, 35.0, 300.0, 25.0, 50.0, 20.0, 3, 1.5, -1.0),
    preset("GOD - Pop Hit Maker", 90.0, 75.0, 40.0, 250.0, 30.0, 50.0, 45.0, 4, 3.0, 0.5),
    preset("GOD - Rock Legend", 60.0, 50.0, 60.0, 500.0, 40.0, 50.0, 30.0, 3, 4.0, 1.0),
    preset("GOD - R&B Smooth", 80.0, 60.0, 50.0, 400.0, 35.0, 50.0, 55.0, 5, 2.5, 0.0),
    preset("GOD - Trap Vocal", 70.0, 65.0, 70.0, 150.0, 40.0, 50.0, 25.0, 2, 3.0, 1.0),
    preset("GOD - Live Performance", 75.0, 85.0, 30.0, 200.0, 15.0, 50.0, 10.0, 2, 1.0, 0.0),
    preset("GOD - Creative Chaos", 50.0, 40.0, 60.0, 600.0, 40.0, 50.0, 50.0, 4, 2.0, 0.5),
    preset("Default", 50.0, 50.0, 0.0, 250.0, 30.0, 0.0, 0.0, 2, 0.0, 0.0),
    preset("Vocal Doubling", 30.0, 40.0, 15.0, 20.0, 10.0, 50.0, 0.0, 2, 1.0, 0.0),
    preset("Harmony", 40.0, 60.0, 20.0, 100.0, 15.0, 50.0, 80.0, 4, 0.5, 0.0),
    preset("Reverb", 20.0, 30.0, 80.0, 50.0, 5.0, 50.0, 0.0, 2, 0.0, 0.0),
    preset("Delay", 25.0, 35.0, 10.0, 500.0, 60.0, 50.0, 0.0, 2, 0.0, 0.0),
];

/// Index of the preset that equals the parameter defaults
pub const DEFAULT_PRESET: usize = 8;

/// Look up a factory preset by index
pub fn factory_preset(index: usize) -> Option<&'static Preset> {
    FACTORY_PRESETS.get(index)
}

/// Look up a factory preset by name (case-insensitive)
pub fn find_preset(name: &str) -> Option<&'static Preset> {
    FACTORY_PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

#[inline]
fn within(value: f32, expected: f32, tolerance: f32) -> bool {
    (value - expected).abs() < tolerance
}

impl Preset {
    /// Write this preset into `params`. Parameters it does not cover are kept.
    pub fn apply(&self, params: &VocalParams) {
        params.set(ParamId::CorrectionStrength, self.correction / 100.0);
        params.set(ParamId::CorrectionSpeed, self.speed / 100.0);
        params.set_correction_enabled(self.correction_enabled);
        params.set(ParamId::ReverbAmount, self.reverb / 100.0);
        params.set(ParamId::DelayTimeMs, self.delay_time_ms);
        params.set(ParamId::DelayFeedback, self.delay_feedback / 100.0);
        params.set(ParamId::DelayMix, self.delay_mix / 100.0);
        params.set(ParamId::HarmonyAmount, self.harmony / 100.0);
        params.set(ParamId::HarmonyVoices, self.harmony_voices as f32);
        params.set(ParamId::InputGainDb, self.input_gain_db);
        params.set(ParamId::OutputGainDb, self.output_gain_db);
        params.set_bypass(self.bypass);
    }

    /// Whether `snapshot` still equals this preset within tolerance
    pub fn matches(&self, snapshot: &ParamSnapshot) -> bool {
        within(snapshot.correction_strength * 100.0, self.correction, VALUE_TOLERANCE)
            && within(snapshot.correction_speed * 100.0, self.speed, VALUE_TOLERANCE)
            && snapshot.correction_enabled == self.correction_enabled
            && within(snapshot.reverb_amount * 100.0, self.reverb, VALUE_TOLERANCE)
            && within(snapshot.delay_time_ms, self.delay_time_ms, TIME_TOLERANCE_MS)
            && within(snapshot.delay_feedback * 100.0, self.delay_feedback, VALUE_TOLERANCE)
            && within(snapshot.delay_mix * 100.0, self.delay_mix, VALUE_TOLERANCE)
            && within(snapshot.harmony_amount * 100.0, self.harmony, VALUE_TOLERANCE)
            && snapshot.harmony_voice_count() == self.harmony_voices as usize
            && within(snapshot.input_gain_db, self.input_gain_db, VALUE_TOLERANCE)
            && within(snapshot.output_gain_db, self.output_gain_db, VALUE_TOLERANCE)
            && snapshot.bypass == self.bypass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preset_matches_defaults() {
        let params = VocalParams::new();
        assert!(FACTORY_PRESETS[DEFAULT_PRESET].matches(&params.snapshot()));
        assert!(!FACTORY_PRESETS[0].matches(&params.snapshot()));
    }

    #[test]
    fn test_apply_then_matches() {
        for preset in &FACTORY_PRESETS {
            let params = VocalParams::new();
            preset.apply(&params);
            assert!(preset.matches(&params.snapshot()), "{}", preset.name);
        }
    }

    #[test]
    fn test_apply_converts_percent() {
        let params = VocalParams::new();
        FACTORY_PRESETS[2].apply(&params);
        let snap = params.snapshot();
        assert!((snap.correction_strength - 0.9).abs() < 1e-6);
        assert!((snap.harmony_amount - 0.45).abs() < 1e-6);
        assert_eq!(snap.harmony_voice_count(), 4);
        assert_eq!(snap.input_gain_db, 3.0);
    }

    #[test]
    fn test_edit_breaks_match() {
        let params = VocalParams::new();
        let preset = &FACTORY_PRESETS[4];
        preset.apply(&params);
        params.set(ParamId::DelayTimeMs, preset.delay_time_ms + 0.4);
        assert!(preset.matches(&params.snapshot()));
        params.set(ParamId::DelayTimeMs, preset.delay_time_ms + 1.0);
        assert!(!preset.matches(&params.snapshot()));
    }

    #[test]
    fn test_lookup() {
        assert_eq!(find_preset("harmony").map(|p| p.harmony_voices), Some(4));
        assert!(find_preset("missing").is_none());
        assert_eq!(factory_preset(12).map(|p| p.name), Some("Delay"));
        assert!(factory_preset(13).is_none());
    }

    #[test]
    fn test_values_inside_domains() {
        for preset in &FACTORY_PRESETS {
            for (id, value) in [
                (ParamId::CorrectionStrength, preset.correction / 100.0),
                (ParamId::DelayTimeMs, preset.delay_time_ms),
                (ParamId::DelayFeedback, preset.delay_feedback / 100.0),
                (ParamId::InputGainDb, preset.input_gain_db),
                (ParamId::OutputGainDb, preset.output_gain_db),
            ] {
                assert_eq!(id.sanitize(value), value, "{} {}", preset.name, id.name());
            }
        }
    }
}
