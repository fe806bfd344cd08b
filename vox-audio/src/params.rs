//! Lock-free parameter store shared between control and audio threads
//!
//! Every parameter lives in its own atomic cell (f32 bits in an `AtomicU32`).
//! The control side writes through sanitizing setters; the audio thread takes
//! one `ParamSnapshot` at the start of each block.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use vox_analysis::Scale;

/// Identifies one continuous parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    CorrectionStrength,
    CorrectionSpeed,
    KeyCenterHz,
    ScaleMode,
    ReverbAmount,
    ReverbSize,
    ReverbDamping,
    ReverbWidth,
    DelayTimeMs,
    DelayFeedback,
    DelayMix,
    DelayFilterHz,
    HarmonyAmount,
    HarmonyVoices,
    HarmonyInterval,
    HarmonyDetuneCents,
    DoublingAmount,
    DoublingDelayMs,
    DoublingDetuneCents,
    FormantShift,
    FormantAmount,
    InputGainDb,
    OutputGainDb,
}

/// Number of continuous parameters
pub const PARAM_COUNT: usize = 23;

impl ParamId {
    /// All parameters in storage order
    pub const ALL: [ParamId; PARAM_COUNT] = [
        ParamId::CorrectionStrength,
        ParamId::CorrectionSpeed,
        ParamId::KeyCenterHz,
        ParamId::ScaleMode,
        ParamId::ReverbAmount,
        ParamId::ReverbSize,
        ParamId::ReverbDamping,
        ParamId::ReverbWidth,
        ParamId::DelayTimeMs,
        ParamId::DelayFeedback,
        ParamId::DelayMix,
        ParamId::DelayFilterHz,
        ParamId::HarmonyAmount,
        ParamId::HarmonyVoices,
        ParamId::HarmonyInterval,
        ParamId::HarmonyDetuneCents,
        ParamId::DoublingAmount,
        ParamId::DoublingDelayMs,
        ParamId::DoublingDetuneCents,
        ParamId::FormantShift,
        ParamId::FormantAmount,
        ParamId::InputGainDb,
        ParamId::OutputGainDb,
    ];

    /// Name used in configuration files
    pub fn name(self) -> &'static str {
        match self {
            ParamId::CorrectionStrength => "correction_strength",
            ParamId::CorrectionSpeed => "correction_speed",
            ParamId::KeyCenterHz => "key_center_hz",
            ParamId::ScaleMode => "scale_mode",
            ParamId::ReverbAmount => "reverb_amount",
            ParamId::ReverbSize => "reverb_size",
            ParamId::ReverbDamping => "reverb_damping",
            ParamId::ReverbWidth => "reverb_width",
            ParamId::DelayTimeMs => "delay_time_ms",
            ParamId::DelayFeedback => "delay_feedback",
            ParamId::DelayMix => "delay_mix",
            ParamId::DelayFilterHz => "delay_filter_hz",
            ParamId::HarmonyAmount => "harmony_amount",
            ParamId::HarmonyVoices => "harmony_voices",
            ParamId::HarmonyInterval => "harmony_interval",
            ParamId::HarmonyDetuneCents => "harmony_detune_cents",
            ParamId::DoublingAmount => "doubling_amount",
            ParamId::DoublingDelayMs => "doubling_delay_ms",
            ParamId::DoublingDetuneCents => "doubling_detune_cents",
            ParamId::FormantShift => "formant_shift",
            ParamId::FormantAmount => "formant_amount",
            ParamId::InputGainDb => "input_gain_db",
            ParamId::OutputGainDb => "output_gain_db",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.name() == name)
    }

    /// Inclusive (min, max) domain
    pub fn range(self) -> (f32, f32) {
        match self {
            ParamId::KeyCenterHz => (80.0, 2000.0),
            ParamId::ScaleMode => (0.0, 7.0),
            ParamId::DelayTimeMs => (0.0, 2000.0),
            ParamId::DelayFeedback => (0.0, 0.95),
            ParamId::DelayFilterHz => (20.0, 20000.0),
            ParamId::HarmonyVoices => (1.0, 8.0),
            ParamId::HarmonyInterval => (-12.0, 12.0),
            ParamId::HarmonyDetuneCents | ParamId::DoublingDetuneCents => (-50.0, 50.0),
            ParamId::DoublingDelayMs => (0.0, 100.0),
            ParamId::FormantShift => (-1.0, 1.0),
            ParamId::InputGainDb | ParamId::OutputGainDb => (-24.0, 12.0),
            _ => (0.0, 1.0),
        }
    }

    pub fn default_value(self) -> f32 {
        match self {
            ParamId::CorrectionStrength | ParamId::CorrectionSpeed => 0.5,
            ParamId::KeyCenterHz => 440.0,
            ParamId::ReverbSize | ParamId::ReverbDamping => 0.5,
            ParamId::ReverbWidth => 1.0,
            ParamId::DelayTimeMs => 250.0,
            ParamId::DelayFeedback => 0.3,
            ParamId::DelayFilterHz => 8000.0,
            ParamId::HarmonyVoices => 2.0,
            ParamId::HarmonyInterval => 3.0,
            ParamId::DoublingDelayMs => 20.0,
            ParamId::DoublingDetuneCents => 5.0,
            _ => 0.0,
        }
    }

    /// Whether only whole numbers are meaningful
    fn is_integer(self) -> bool {
        matches!(self, ParamId::ScaleMode | ParamId::HarmonyVoices)
    }

    /// Replace NaN/∞ by the default, clamp to the domain, round integer parameters
    pub fn sanitize(self, value: f32) -> f32 {
        let (min, max) = self.range();
        let value = if value.is_finite() { value } else { self.default_value() };
        let value = value.clamp(min, max);
        if self.is_integer() {
            value.round()
        } else {
            value
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Shared parameter store
pub struct VocalParams {
    values: [AtomicU32; PARAM_COUNT],
    correction_enabled: AtomicBool,
    bypass: AtomicBool,
}

impl VocalParams {
    pub fn new() -> Self {
        Self {
            values: std::array::from_fn(|i| AtomicU32::new(ParamId::ALL[i].default_value().to_bits())),
            correction_enabled: AtomicBool::new(true),
            bypass: AtomicBool::new(false),
        }
    }

    /// Set a parameter (sanitized and clamped)
    pub fn set(&self, id: ParamId, value: f32) {
        self.values[id.index()].store(id.sanitize(value).to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self, id: ParamId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    /// Set a parameter by its configuration name. Returns false for unknown names.
    pub fn set_by_name(&self, name: &str, value: f32) -> bool {
        match ParamId::from_name(name) {
            Some(id) => {
                self.set(id, value);
                true
            }
            None => false,
        }
    }

    pub fn set_correction_enabled(&self, enabled: bool) {
        self.correction_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn correction_enabled(&self) -> bool {
        self.correction_enabled.load(Ordering::Relaxed)
    }

    pub fn set_bypass(&self, bypass: bool) {
        self.bypass.store(bypass, Ordering::Relaxed);
    }

    pub fn bypass(&self) -> bool {
        self.bypass.load(Ordering::Relaxed)
    }

    /// Restore every parameter to its default
    pub fn reset_to_defaults(&self) {
        for id in ParamId::ALL {
            self.set(id, id.default_value());
        }
        self.set_correction_enabled(true);
        self.set_bypass(false);
    }

    /// Read all parameters at once
    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            correction_strength: self.get(ParamId::CorrectionStrength),
            correction_speed: self.get(ParamId::CorrectionSpeed),
            key_center_hz: self.get(ParamId::KeyCenterHz),
            scale_mode: self.get(ParamId::ScaleMode),
            reverb_amount: self.get(ParamId::ReverbAmount),
            reverb_size: self.get(ParamId::ReverbSize),
            reverb_damping: self.get(ParamId::ReverbDamping),
            reverb_width: self.get(ParamId::ReverbWidth),
            delay_time_ms: self.get(ParamId::DelayTimeMs),
            delay_feedback: self.get(ParamId::DelayFeedback),
            delay_mix: self.get(ParamId::DelayMix),
            delay_filter_hz: self.get(ParamId::DelayFilterHz),
            harmony_amount: self.get(ParamId::HarmonyAmount),
            harmony_voices: self.get(ParamId::HarmonyVoices),
            harmony_interval: self.get(ParamId::HarmonyInterval),
            harmony_detune_cents: self.get(ParamId::HarmonyDetuneCents),
            doubling_amount: self.get(ParamId::DoublingAmount),
            doubling_delay_ms: self.get(ParamId::DoublingDelayMs),
            doubling_detune_cents: self.get(ParamId::DoublingDetuneCents),
            formant_shift: self.get(ParamId::FormantShift),
            formant_amount: self.get(ParamId::FormantAmount),
            input_gain_db: self.get(ParamId::InputGainDb),
            output_gain_db: self.get(ParamId::OutputGainDb),
            correction_enabled: self.correction_enabled(),
            bypass: self.bypass(),
        }
    }
}

impl Default for VocalParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameter values for one block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSnapshot {
    pub correction_strength: f32,
    pub correction_speed: f32,
    pub key_center_hz: f32,
    pub scale_mode: f32,
    pub reverb_amount: f32,
    pub reverb_size: f32,
    pub reverb_damping: f32,
    pub reverb_width: f32,
    pub delay_time_ms: f32,
    pub delay_feedback: f32,
    pub delay_mix: f32,
    pub delay_filter_hz: f32,
    pub harmony_amount: f32,
    pub harmony_voices: f32,
    pub harmony_interval: f32,
    pub harmony_detune_cents: f32,
    pub doubling_amount: f32,
    pub doubling_delay_ms: f32,
    pub doubling_detune_cents: f32,
    pub formant_shift: f32,
    pub formant_amount: f32,
    pub input_gain_db: f32,
    pub output_gain_db: f32,
    pub correction_enabled: bool,
    pub bypass: bool,
}

impl Default for ParamSnapshot {
    fn default() -> Self {
        VocalParams::new().snapshot()
    }
}

impl ParamSnapshot {
    /// Selected scale
    pub fn scale(&self) -> Scale {
        Scale::from_index(self.scale_mode.max(0.0).round() as usize).unwrap_or_default()
    }

    /// Harmony voice count (1 - 8)
    pub fn harmony_voice_count(&self) -> usize {
        self.harmony_voices.round().clamp(1.0, 8.0) as usize
    }

    /// Input gain as a linear factor
    pub fn input_gain(&self) -> f32 {
        db_to_gain(self.input_gain_db)
    }

    /// Output gain as a linear factor
    pub fn output_gain(&self) -> f32 {
        db_to_gain(self.output_gain_db)
    }
}

/// Decibels to linear gain
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let params = VocalParams::new();
        let snap = params.snapshot();
        assert_eq!(snap.correction_strength, 0.5);
        assert_eq!(snap.key_center_hz, 440.0);
        assert_eq!(snap.delay_time_ms, 250.0);
        assert_eq!(snap.delay_mix, 0.0);
        assert_eq!(snap.harmony_voices, 2.0);
        assert_eq!(snap.harmony_interval, 3.0);
        assert_eq!(snap.doubling_detune_cents, 5.0);
        assert_eq!(snap.reverb_width, 1.0);
        assert!(snap.correction_enabled);
        assert!(!snap.bypass);
        assert_eq!(snap.scale(), Scale::Chromatic);
    }

    #[test]
    fn test_setters_clamp_out_of_domain() {
        let params = VocalParams::new();
        for id in ParamId::ALL {
            let (min, max) = id.range();
            params.set(id, max + 1000.0);
            assert_eq!(params.get(id), max, "{}", id.name());
            params.set(id, min - 1000.0);
            assert_eq!(params.get(id), min, "{}", id.name());
        }
    }

    #[test]
    fn test_setters_sanitize_non_finite() {
        let params = VocalParams::new();
        for id in ParamId::ALL {
            params.set(id, f32::NAN);
            assert_eq!(params.get(id), id.default_value(), "{}", id.name());
            params.set(id, f32::INFINITY);
            assert_eq!(params.get(id), id.default_value(), "{}", id.name());
            params.set(id, f32::NEG_INFINITY);
            assert_eq!(params.get(id), id.default_value(), "{}", id.name());
        }
    }

    #[test]
    fn test_defaults_inside_domain() {
        for id in ParamId::ALL {
            let (min, max) = id.range();
            let d = id.default_value();
            assert!(d >= min && d <= max, "{}", id.name());
        }
    }

    #[test]
    fn test_integer_params_round() {
        let params = VocalParams::new();
        params.set(ParamId::HarmonyVoices, 3.6);
        assert_eq!(params.get(ParamId::HarmonyVoices), 4.0);
        params.set(ParamId::ScaleMode, 2.2);
        assert_eq!(params.snapshot().scale(), Scale::Minor);
    }

    #[test]
    fn test_names_roundtrip() {
        for id in ParamId::ALL {
            assert_eq!(ParamId::from_name(id.name()), Some(id));
        }
        assert_eq!(ParamId::from_name("nope"), None);

        let params = VocalParams::new();
        assert!(params.set_by_name("delay_mix", 0.4));
        assert_relative_eq!(params.get(ParamId::DelayMix), 0.4);
        assert!(!params.set_by_name("volume", 1.0));
    }

    #[test]
    fn test_storage_order_matches_ids() {
        for (i, id) in ParamId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn test_reset_to_defaults() {
        let params = VocalParams::new();
        params.set(ParamId::FormantShift, 0.7);
        params.set_bypass(true);
        params.set_correction_enabled(false);
        params.reset_to_defaults();
        assert_eq!(params.snapshot(), ParamSnapshot::default());
    }

    #[test]
    fn test_gain_conversion() {
        assert_relative_eq!(db_to_gain(0.0), 1.0);
        assert_relative_eq!(db_to_gain(-20.0), 0.1, epsilon = 1e-6);
        assert_relative_eq!(db_to_gain(6.0), 1.9952, epsilon = 1e-3);
    }
}
