//! Session configuration persistence for VOX
//!
//! Stores the processing setup and parameter values in a simple
//! key=value text file. Parameter keys use the names from `ParamId::name`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use vox_audio::{factory_preset, ParamId, ProcessorConfig, VocalParams, DEFAULT_FRAME_SIZE};

/// Block size used when the file does not name one
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Session configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Processing sample rate; the input file's rate when unset
    pub sample_rate: Option<u32>,
    pub block_size: usize,
    pub frame_size: usize,
    /// Factory preset applied before the explicit parameter values
    pub preset: Option<usize>,
    /// Explicit parameter values, in file order
    pub params: Vec<(ParamId, f32)>,
    pub correction_enabled: Option<bool>,
    pub bypass: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: None,
            block_size: DEFAULT_BLOCK_SIZE,
            frame_size: DEFAULT_FRAME_SIZE,
            preset: None,
            params: Vec::new(),
            correction_enabled: None,
            bypass: None,
        }
    }
}

impl Config {
    /// Load config from the default location
    ///
    /// Returns default config if file doesn't exist or can't be read.
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_from(&path).unwrap_or_default()
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        debug!("Loaded config from {}", path.display());
        Ok(Self::parse(&content))
    }

    /// Save config to the default location
    pub fn save(&self) -> io::Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = self.serialize();
        fs::write(path, content)
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vox")
            .join("config.txt")
    }

    /// Record a parameter value, replacing an earlier one for the same id
    pub fn set_param(&mut self, id: ParamId, value: f32) {
        match self.params.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = value,
            None => self.params.push((id, value)),
        }
    }

    /// Apply one `key=value` setting. Returns false if the key is unknown
    /// or the value does not parse.
    pub fn set_entry(&mut self, key: &str, value: &str) -> bool {
        match key {
            "sample_rate" => parse_into(value, |v: u32| self.sample_rate = Some(v)),
            "block_size" => parse_into(value, |v: usize| self.block_size = v),
            "frame_size" => parse_into(value, |v: usize| self.frame_size = v),
            "preset" => parse_into(value, |v: usize| self.preset = Some(v)),
            "correction_enabled" => parse_into(value, |v: bool| self.correction_enabled = Some(v)),
            "bypass" => parse_into(value, |v: bool| self.bypass = Some(v)),
            _ => match ParamId::from_name(key) {
                Some(id) => parse_into(value, |v: f32| self.set_param(id, v)),
                None => false,
            },
        }
    }

    /// Write the preset and explicit values into `params`
    pub fn apply_params(&self, params: &VocalParams) {
        if let Some(index) = self.preset {
            match factory_preset(index) {
                Some(preset) => {
                    debug!("Applying preset {}: {}", index, preset.name);
                    preset.apply(params);
                }
                None => warn!("Unknown preset index {}", index),
            }
        }

        for &(id, value) in &self.params {
            params.set(id, value);
        }
        if let Some(enabled) = self.correction_enabled {
            params.set_correction_enabled(enabled);
        }
        if let Some(bypass) = self.bypass {
            params.set_bypass(bypass);
        }
    }

    /// Processor setup for a stream with `channels` at `input_sample_rate`
    pub fn processor_config(&self, channels: usize, input_sample_rate: u32) -> ProcessorConfig {
        let sample_rate = self.sample_rate.unwrap_or(input_sample_rate);
        ProcessorConfig::new(sample_rate as f64, self.block_size, channels).with_frame_size(self.frame_size)
    }

    /// Parse config from simple key=value format
    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                debug!("Ignoring config line without '=': {}", line);
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            if !config.set_entry(key, value) {
                if is_known_key(key) {
                    warn!("Skipping unparsable value for {}: {}", key, value);
                } else {
                    debug!("Ignoring unknown config key {}", key);
                }
            }
        }

        config
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        let mut lines = Vec::new();
        lines.push("# VOX Configuration".to_string());

        if let Some(rate) = self.sample_rate {
            lines.push(format!("sample_rate={}", rate));
        }
        lines.push(format!("block_size={}", self.block_size));
        lines.push(format!("frame_size={}", self.frame_size));
        if let Some(preset) = self.preset {
            lines.push(format!("preset={}", preset));
        }
        if let Some(enabled) = self.correction_enabled {
            lines.push(format!("correction_enabled={}", enabled));
        }
        if let Some(bypass) = self.bypass {
            lines.push(format!("bypass={}", bypass));
        }
        for (id, value) in &self.params {
            lines.push(format!("{}={}", id.name(), value));
        }

        lines.join("\n")
    }
}

fn parse_into<T: std::str::FromStr>(value: &str, mut store: impl FnMut(T)) -> bool {
    match value.parse() {
        Ok(v) => {
            store(v);
            true
        }
        Err(_) => false,
    }
}

fn is_known_key(key: &str) -> bool {
    matches!(
        key,
        "sample_rate" | "block_size" | "frame_size" | "preset" | "correction_enabled" | "bypass"
    ) || ParamId::from_name(key).is_some()
}
