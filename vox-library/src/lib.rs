//! Render session support for VOX - configuration, loading and writing

mod config;
mod loader;
mod writer;

pub use config::{Config, DEFAULT_BLOCK_SIZE};
pub use loader::{deinterleave, resample, LoadError, LoadedAudio, TakeMetadata, TrackLoader};
pub use writer::{write_wav, WriteError};
