//! VOX - offline vocal pitch correction and harmonization
//!
//! Renders an audio file through the vocal processor and writes a float WAV.
//!
//! Usage: vox <input> <output> [--config PATH] [--preset N] [--set key=value]...
//!            [--block-size N] [--verbose]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vox_audio::{VocalParams, VocalProcessor, FACTORY_PRESETS};
use vox_library::{write_wav, Config, TrackLoader};

/// Parsed command line
#[derive(Debug, Default)]
struct Args {
    input: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
    preset: Option<usize>,
    settings: Vec<(String, String)>,
    block_size: Option<usize>,
    verbose: bool,
}

fn usage() -> String {
    let mut text = String::from(
        "Usage: vox <input> <output> [--config PATH] [--preset N] [--set key=value]... \
         [--block-size N] [--verbose]\n\nPresets:\n",
    );
    for (i, preset) in FACTORY_PRESETS.iter().enumerate() {
        text.push_str(&format!("  {:>2}  {}\n", i, preset.name));
    }
    text
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--preset" => {
                let value = args.next().context("--preset needs an index")?;
                parsed.preset = Some(value.parse().with_context(|| format!("invalid preset index '{}'", value))?);
            }
            "--set" => {
                let value = args.next().context("--set needs key=value")?;
                let (key, val) = value
                    .split_once('=')
                    .with_context(|| format!("expected key=value, got '{}'", value))?;
                parsed.settings.push((key.trim().to_string(), val.trim().to_string()));
            }
            "--block-size" => {
                let value = args.next().context("--block-size needs a value")?;
                parsed.block_size = Some(value.parse().with_context(|| format!("invalid block size '{}'", value))?);
            }
            "-v" | "--verbose" => parsed.verbose = true,
            "-h" | "--help" => bail!("{}", usage()),
            flag if flag.starts_with("--") => bail!("unknown option '{}'\n\n{}", flag, usage()),
            _ => positional.push(arg),
        }
    }

    let [input, output]: [String; 2] = positional
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected <input> and <output>\n\n{}", usage()))?;
    parsed.input = PathBuf::from(input);
    parsed.output = PathBuf::from(output);
    Ok(parsed)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => Config::load_from(path).with_context(|| format!("reading {}", path.display()))?,
        None => Config::load(),
    };
    if let Some(preset) = args.preset {
        config.preset = Some(preset);
    }
    if let Some(block_size) = args.block_size {
        config.block_size = block_size;
    }
    for (key, value) in &args.settings {
        if !config.set_entry(key, value) {
            bail!("invalid setting {}={}", key, value);
        }
    }

    let params = Arc::new(VocalParams::new());
    config.apply_params(&params);

    let loader = match config.sample_rate {
        Some(rate) => TrackLoader::with_sample_rate(rate),
        None => TrackLoader::new(),
    };
    let audio = loader
        .load(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;
    info!(
        "Input: {} - {} ({} frames)",
        audio.metadata.artist,
        audio.metadata.title,
        audio.frames()
    );

    let processor_config = config.processor_config(audio.channels.len(), audio.sample_rate);
    let mut processor = VocalProcessor::new(params);
    processor.configure(processor_config)?;
    if processor.latency_samples() > 0 {
        info!("Correction latency: {} samples", processor.latency_samples());
    }

    let mut channels = audio.channels;
    let frames = channels.first().map_or(0, |c| c.len());
    let block_size = processor_config.block_size;
    let mut start = 0;
    while start < frames {
        let end = (start + block_size).min(frames);
        let mut block: Vec<&mut [f32]> = channels.iter_mut().map(|c| &mut c[start..end]).collect();
        processor.process(&mut block);
        start = end;
    }

    let meter = processor.meter();
    if meter.detected() {
        info!(
            "Last detected pitch: {:.1} Hz (confidence {:.2}, ratio {:.3})",
            meter.pitch_hz(),
            meter.confidence(),
            meter.ratio()
        );
    } else {
        warn!("No pitch detected at end of input");
    }

    let reverb = processor.reverb_settings();
    if reverb.wet_level > 0.0 {
        info!(
            "Reverb settings for the host: room {:.2}, damping {:.2}, wet {:.2}",
            reverb.room_size, reverb.damping, reverb.wet_level
        );
    }

    write_wav(&args.output, &channels, audio.sample_rate)
        .with_context(|| format!("writing {}", args.output.display()))?;
    Ok(())
}
