// Sound module
// Click buffers, background decoding and sample-accurate playback

pub mod asset;
pub mod loader;
pub mod source;

pub use asset::{FallbackTones, SoundAsset};
pub use loader::{PendingSounds, SoundLoadError, SoundPaths, load_sound, load_sound_asset};
pub use source::{ClickOutput, ClickRenderer, SoundSource};

/// Which click sounds are in use
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SoundStatus {
    /// Synthesized tones, no files configured
    #[default]
    Synthesized,
    /// Files are being decoded, synthesized tones meanwhile
    Loading,
    /// Decoded files installed
    Samples,
    /// Decoding failed, synthesized tones stay in use
    Failed(String),
}

impl SoundStatus {
    pub fn label(&self) -> &str {
        match self {
            SoundStatus::Synthesized => "Synthesized clicks",
            SoundStatus::Loading => "Loading sounds...",
            SoundStatus::Samples => "Sample clicks",
            SoundStatus::Failed(_) => "Sound load failed, using synthesized clicks",
        }
    }
}
