//! WAV output using hound (32-bit float)

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while writing audio
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Nothing to write: no channels")]
    NoChannels,
    #[error("Channel {channel} has {len} samples, expected {expected}")]
    ChannelLength {
        channel: usize,
        len: usize,
        expected: usize,
    },
}

/// Write planar `channels` to a 32-bit float WAV file
pub fn write_wav(path: &Path, channels: &[Vec<f32>], sample_rate: u32) -> Result<(), WriteError> {
    let first = channels.first().ok_or(WriteError::NoChannels)?;
    let frames = first.len();
    if let Some((channel, data)) = channels.iter().enumerate().find(|(_, c)| c.len() != frames) {
        return Err(WriteError::ChannelLength {
            channel,
            len: data.len(),
            expected: frames,
        });
    }

    let spec = WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for frame in 0..frames {
        for channel in channels {
            writer.write_sample(channel[frame])?;
        }
    }
    writer.finalize()?;

    info!(
        "Wrote {} ({} frames, {} channel(s), {} Hz)",
        path.display(),
        frames,
        channels.len(),
        sample_rate
    );
    Ok(())
}
