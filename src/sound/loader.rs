// Sound loader - Decodes the tick/tock files off the control path

use super::asset::SoundAsset;
use claxon::FlacReader;
use hound::{SampleFormat, WavReader};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SoundLoadError {
    #[error("Unsupported sound format: {0}")]
    UnsupportedFormat(String),

    #[error("WAV decode error in {path}: {source}")]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("FLAC decode error in {path}: {source}")]
    Flac {
        path: PathBuf,
        #[source]
        source: claxon::Error,
    },

    #[error("Sound file {0} contains no samples")]
    Empty(PathBuf),

    #[error("Tick and tock sample rates differ ({tick} Hz vs {tock} Hz)")]
    SampleRateMismatch { tick: u32, tock: u32 },

    #[error("Sound loader stopped before finishing")]
    Disconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Locations of the two click files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundPaths {
    pub tick: PathBuf,
    pub tock: PathBuf,
}

/// One decoded mono buffer
#[derive(Debug, Clone)]
pub struct DecodedSound {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Decode a WAV or FLAC file and down-mix it to mono
pub fn load_sound(path: &Path) -> Result<DecodedSound, SoundLoadError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    let sound = match extension.as_str() {
        "wav" | "wave" => load_wav(path)?,
        "flac" => load_flac(path)?,
        _ => return Err(SoundLoadError::UnsupportedFormat(extension)),
    };

    if sound.samples.is_empty() {
        return Err(SoundLoadError::Empty(path.to_path_buf()));
    }
    Ok(sound)
}

/// Decode both clicks into one asset
pub fn load_sound_asset(paths: &SoundPaths) -> Result<SoundAsset, SoundLoadError> {
    let tick = load_sound(&paths.tick)?;
    let tock = load_sound(&paths.tock)?;

    if tick.sample_rate != tock.sample_rate {
        return Err(SoundLoadError::SampleRateMismatch {
            tick: tick.sample_rate,
            tock: tock.sample_rate,
        });
    }

    Ok(SoundAsset::new(tick.samples, tock.samples, tick.sample_rate))
}

fn load_wav(path: &Path) -> Result<DecodedSound, SoundLoadError> {
    let wav_error = |source: hound::Error| SoundLoadError::Wav {
        path: path.to_path_buf(),
        source,
    };

    let reader = WavReader::open(path).map_err(wav_error)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(wav_error)?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(wav_error)?
        }
    };

    Ok(DecodedSound {
        samples: downmix(&interleaved, spec.channels as usize),
        sample_rate: spec.sample_rate,
    })
}

fn load_flac(path: &Path) -> Result<DecodedSound, SoundLoadError> {
    let flac_error = |source: claxon::Error| SoundLoadError::Flac {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = FlacReader::open(path).map_err(flac_error)?;
    let info = reader.streaminfo();
    let scale = (1i64 << (info.bits_per_sample.saturating_sub(1))) as f32;

    let interleaved: Vec<f32> = reader
        .samples()
        .map(|s| s.map(|v| v as f32 / scale))
        .collect::<Result<_, _>>()
        .map_err(flac_error)?;

    Ok(DecodedSound {
        samples: downmix(&interleaved, info.channels as usize),
        sample_rate: info.sample_rate,
    })
}

/// Average interleaved channels into one
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Decoding running on a background thread
///
/// The result is read once through [`PendingSounds::try_take`]; the asset only
/// becomes visible as a whole, never partially decoded.
pub struct PendingSounds {
    receiver: Receiver<Result<SoundAsset, SoundLoadError>>,
}

impl PendingSounds {
    /// Start decoding `paths` on a new thread
    pub fn spawn(paths: SoundPaths) -> Result<Self, SoundLoadError> {
        let (sender, receiver) = mpsc::channel();

        thread::Builder::new()
            .name("sound-loader".to_string())
            .spawn(move || {
                debug!(tick = %paths.tick.display(), tock = %paths.tock.display(), "decoding click sounds");
                let result = load_sound_asset(&paths);
                if result.is_ok() {
                    info!("click sounds decoded");
                }
                // Receiver gone means the engine was dropped meanwhile
                let _ = sender.send(result);
            })?;

        Ok(Self { receiver })
    }

    /// `None` while decoding is still running
    pub fn try_take(&self) -> Option<Result<SoundAsset, SoundLoadError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(SoundLoadError::Disconnected)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: &[i16]) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &s in frames {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_unsupported_format() {
        let result = load_sound(Path::new("click.xyz"));
        assert!(matches!(result, Err(SoundLoadError::UnsupportedFormat(ext)) if ext == "xyz"));
    }

    #[test]
    fn test_missing_wav_is_decode_error() {
        let result = load_sound(Path::new("does/not/exist.wav"));
        assert!(matches!(result, Err(SoundLoadError::Wav { .. })));
    }

    #[test]
    fn test_load_mono_wav() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tick.wav");
        write_wav(&path, 1, 44100, &[0, i16::MAX / 2, -(i16::MAX / 2)]);

        let sound = load_sound(&path).unwrap();
        assert_eq!(sound.sample_rate, 44100);
        assert_eq!(sound.samples.len(), 3);
        assert!((sound.samples[1] - 0.5).abs() < 0.001);
        assert!((sound.samples[2] + 0.5).abs() < 0.001);
    }

    #[test]
    fn test_stereo_wav_is_downmixed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tock.wav");
        write_wav(&path, 2, 48000, &[16384, 0, 16384, 16384]);

        let sound = load_sound(&path).unwrap();
        assert_eq!(sound.samples.len(), 2);
        assert!((sound.samples[0] - 0.25).abs() < 0.001);
        assert!((sound.samples[1] - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_empty_wav_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav(&path, 1, 48000, &[]);

        assert!(matches!(load_sound(&path), Err(SoundLoadError::Empty(_))));
    }

    #[test]
    fn test_sample_rate_mismatch() {
        let dir = TempDir::new().unwrap();
        let tick = dir.path().join("tick.wav");
        let tock = dir.path().join("tock.wav");
        write_wav(&tick, 1, 44100, &[100, 200]);
        write_wav(&tock, 1, 48000, &[100, 200]);

        let result = load_sound_asset(&SoundPaths { tick, tock });
        assert!(matches!(
            result,
            Err(SoundLoadError::SampleRateMismatch { tick: 44100, tock: 48000 })
        ));
    }

    #[test]
    fn test_background_decode() {
        let dir = TempDir::new().unwrap();
        let tick = dir.path().join("tick.wav");
        let tock = dir.path().join("tock.wav");
        write_wav(&tick, 1, 48000, &[1000; 64]);
        write_wav(&tock, 1, 48000, &[2000; 128]);

        let pending = PendingSounds::spawn(SoundPaths { tick, tock }).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let result = loop {
            if let Some(result) = pending.try_take() {
                break result;
            }
            assert!(Instant::now() < deadline, "decode never finished");
            std::thread::sleep(Duration::from_millis(5));
        };

        let asset = result.unwrap();
        assert_eq!(asset.buffer(false).len(), 64);
        assert_eq!(asset.buffer(true).len(), 128);
    }
}
