//! Audio file loading and decoding

use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during loading
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No audio track found in file")]
    NoAudioTrack,
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Resample error: {0}")]
    Resample(String),
}

/// Take metadata
#[derive(Debug, Clone, Default)]
pub struct TakeMetadata {
    pub title: String,
    pub artist: String,
    pub duration_secs: f64,
    /// Sample rate of the file before resampling
    pub source_sample_rate: u32,
}

/// A decoded recording, one buffer per channel
pub struct LoadedAudio {
    /// Planar samples (f32, normalized to -1.0 to 1.0)
    pub channels: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    pub metadata: TakeMetadata,
}

impl LoadedAudio {
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }
}

/// Audio file loader using Symphonia
#[derive(Debug, Clone, Default)]
pub struct TrackLoader {
    /// Resample to this rate when set
    target_sample_rate: Option<u32>,
}

impl TrackLoader {
    /// Loader that keeps the file's own sample rate
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader that resamples to `target_sample_rate`
    pub fn with_sample_rate(target_sample_rate: u32) -> Self {
        Self {
            target_sample_rate: Some(target_sample_rate),
        }
    }

    /// Load and decode an audio file
    pub fn load(&self, path: &Path) -> Result<LoadedAudio, LoadError> {
        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(LoadError::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let source_sample_rate = codec_params.sample_rate.unwrap_or(44100);
        let channel_count = codec_params
            .channels
            .map(|c| c.count())
            .unwrap_or(2)
            .max(1);

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut metadata = extract_metadata(&mut format, path);
        metadata.source_sample_rate = source_sample_rate;

        let mut interleaved: Vec<f32> = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(_) => break,
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(e) => {
                    debug!("Skipping undecodable packet: {}", e);
                    continue;
                }
            };

            let spec = *decoded.spec();
            let duration = decoded.capacity() as u64;

            let mut sample_buf = SampleBuffer::<f32>::new(duration, spec);
            sample_buf.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(sample_buf.samples());
        }

        let channels = deinterleave(&interleaved, channel_count);
        let frames = channels.first().map_or(0, |c| c.len());
        metadata.duration_secs = frames as f64 / source_sample_rate as f64;

        let (channels, sample_rate) = match self.target_sample_rate {
            Some(target) if target != source_sample_rate => {
                debug!("Resampling {} Hz -> {} Hz", source_sample_rate, target);
                (resample(&channels, source_sample_rate, target)?, target)
            }
            _ => (channels, source_sample_rate),
        };

        info!(
            "Loaded {} ({:.2}s, {} channel(s), {} Hz)",
            path.display(),
            metadata.duration_secs,
            channels.len(),
            sample_rate
        );

        Ok(LoadedAudio {
            channels,
            sample_rate,
            metadata,
        })
    }
}

/// Split interleaved samples into planar channels (trailing partial frame dropped)
pub fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let channels = channels.max(1);
    let frames = samples.len() / channels;
    (0..channels)
        .map(|ch| (0..frames).map(|f| samples[f * channels + ch]).collect())
        .collect()
}

/// Resample planar audio from `source_rate` to `target_rate`
pub fn resample(channels: &[Vec<f32>], source_rate: u32, target_rate: u32) -> Result<Vec<Vec<f32>>, LoadError> {
    use rubato::{FftFixedInOut, Resampler};

    let channel_count = channels.len();
    let frames = channels.first().map_or(0, |c| c.len());
    if channel_count == 0 || frames == 0 {
        return Ok(vec![Vec::new(); channel_count]);
    }

    let mut resampler = FftFixedInOut::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        1024,
        channel_count,
    )
    .map_err(|e| LoadError::Resample(e.to_string()))?;

    let chunk_size = resampler.input_frames_next();
    let mut output: Vec<Vec<f32>> = vec![Vec::new(); channel_count];

    let mut pos = 0;
    while pos + chunk_size <= frames {
        let input_refs: Vec<&[f32]> = channels.iter().map(|ch| &ch[pos..pos + chunk_size]).collect();

        let resampled = resampler
            .process(&input_refs, None)
            .map_err(|e| LoadError::Resample(e.to_string()))?;

        for (ch, data) in resampled.into_iter().enumerate() {
            output[ch].extend(data);
        }

        pos += chunk_size;
    }

    // Remaining samples (padded with zeros)
    if pos < frames {
        let remaining = frames - pos;
        let padded: Vec<Vec<f32>> = channels
            .iter()
            .map(|ch| {
                let mut v = ch[pos..].to_vec();
                v.resize(chunk_size, 0.0);
                v
            })
            .collect();

        let input_refs: Vec<&[f32]> = padded.iter().map(|v| v.as_slice()).collect();
        let resampled = resampler
            .process(&input_refs, None)
            .map_err(|e| LoadError::Resample(e.to_string()))?;

        // Only the proportional amount of output
        let output_frames = (remaining * target_rate as usize) / source_rate as usize;
        for (ch, data) in resampled.into_iter().enumerate() {
            output[ch].extend(&data[..output_frames.min(data.len())]);
        }
    }

    Ok(output)
}

/// Extract title/artist tags, falling back to the file name
fn extract_metadata(
    format: &mut Box<dyn symphonia::core::formats::FormatReader>,
    path: &Path,
) -> TakeMetadata {
    let mut metadata = TakeMetadata {
        title: path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown")
            .to_string(),
        artist: "Unknown".to_string(),
        ..Default::default()
    };

    if let Some(meta) = format.metadata().current() {
        for tag in meta.tags() {
            match tag.std_key {
                Some(symphonia::core::meta::StandardTagKey::TrackTitle) => {
                    metadata.title = tag.value.to_string();
                }
                Some(symphonia::core::meta::StandardTagKey::Artist) => {
                    metadata.artist = tag.value.to_string();
                }
                _ => {}
            }
        }
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::write_wav;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_deinterleave() {
        let planar = deinterleave(&[1.0, -1.0, 2.0, -2.0, 3.0], 2);
        assert_eq!(planar, vec![vec![1.0, 2.0], vec![-1.0, -2.0]]);
        assert_eq!(deinterleave(&[0.5, 0.25], 0), vec![vec![0.5, 0.25]]);
    }

    #[test]
    fn test_resample_length() {
        let input = vec![vec![0.1f32; 4410]];
        let output = resample(&input, 44100, 48000).unwrap();
        let expected = 4800.0;
        assert!((output[0].len() as f32 - expected).abs() / expected < 0.05);
        assert!(resample(&[], 44100, 48000).unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let loader = TrackLoader::new();
        let result = loader.load(Path::new("/definitely/not/here.wav"));
        assert!(matches!(result, Err(LoadError::Io(_))));
    }

    #[test]
    fn test_load_written_wav() {
        let path = std::env::temp_dir().join(format!("vox-loader-{}.wav", std::process::id()));
        let tone: Vec<f32> = (0..2205).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        write_wav(&path, &[tone.clone()], 22050).unwrap();

        let audio = TrackLoader::new().load(&path).unwrap();
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.channels.len(), 1);
        assert_eq!(audio.frames(), tone.len());
        assert_abs_diff_eq!(audio.channels[0][100], tone[100], epsilon = 1e-6);
        assert!((audio.metadata.duration_secs - 0.1).abs() < 1e-6);

        std::fs::remove_file(&path).ok();
    }
}
