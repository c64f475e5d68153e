// Audio module - cpal backend, the clock clicks are scheduled against and
// the real-time callback

pub mod clock;
pub mod device;
pub mod dsp_utils;
pub mod engine;
pub mod format_conversion;
pub mod parameters;

pub use clock::{AudioClock, ManualClock, SampleClock};
pub use engine::AudioEngine;
pub use parameters::{AtomicBackendStatus, AtomicF32, BackendStatus};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Audio configuration error: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Unsupported sample format: {0:?}. Supported formats: F32, I16, U16")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("Error in stream creation: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Error starting stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}
