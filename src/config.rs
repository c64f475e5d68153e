// Engine configuration - RON or JSON file, picked by extension

use crate::sequencer::scheduler::SchedulerTiming;
use crate::sequencer::tap_tempo::TapTempoConfig;
use crate::sequencer::tempo::{BeatsPerCycle, Bpm, Subdivision, TempoState};
use crate::sound::loader::SoundPaths;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported config file extension: {0:?}")]
    UnsupportedExtension(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Ron,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "ron" => Ok(Self::Ron),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedExtension(extension)),
        }
    }
}

/// Everything the binary needs to build a metronome
///
/// Tempo fields hold raw numbers and are clamped when the engine reads them,
/// so a hand-edited file with `bpm: 500` still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bpm: i64,
    pub beats_per_cycle: i64,
    pub subdivision: Subdivision,
    pub accent_first_beat: bool,
    pub muted: bool,

    pub lookahead_ms: u64,
    pub tick_interval_ms: u64,
    pub tap_resync_ms: u64,
    pub tap_timeout_ms: u64,
    pub tap_history: usize,
    pub pulse_ms: u64,

    pub volume: f32,
    pub output_device: Option<String>,
    pub sounds: Option<SoundPaths>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bpm: 120,
            beats_per_cycle: 4,
            subdivision: Subdivision::Quarter,
            accent_first_beat: true,
            muted: false,
            lookahead_ms: 100,
            tick_interval_ms: 25,
            tap_resync_ms: 50,
            tap_timeout_ms: 2000,
            tap_history: 5,
            pulse_ms: 100,
            volume: 0.8,
            output_device: None,
            sounds: None,
        }
    }
}

impl EngineConfig {
    /// `<config dir>/band_metronome/config.ron`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("band_metronome").join("config.ron"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path)?;
        let text = fs::read_to_string(path)?;

        let config: Self = match format {
            ConfigFormat::Ron => ron::from_str(&text)?,
            ConfigFormat::Json => serde_json::from_str(&text)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Missing file means defaults; a broken one is logged and replaced by defaults
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => {
                info!(path = %path.display(), "config loaded");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring config file");
                Self::default()
            }
        }
    }

    /// Write the config, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let text = match ConfigFormat::from_path(path)? {
            ConfigFormat::Ron => {
                ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?
            }
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("lookahead_ms", self.lookahead_ms),
            ("tick_interval_ms", self.tick_interval_ms),
            ("tap_resync_ms", self.tap_resync_ms),
            ("tap_timeout_ms", self.tap_timeout_ms),
            ("pulse_ms", self.pulse_ms),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::Invalid(format!("{} must be greater than 0", name)));
        }

        if self.tick_interval_ms >= self.lookahead_ms {
            return Err(ConfigError::Invalid(format!(
                "tick_interval_ms ({}) must be shorter than lookahead_ms ({})",
                self.tick_interval_ms, self.lookahead_ms
            )));
        }

        if self.tap_history == 0 {
            return Err(ConfigError::Invalid(
                "tap_history must keep at least one tap".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.volume) {
            return Err(ConfigError::Invalid(format!(
                "volume must be within [0, 1], got {}",
                self.volume
            )));
        }

        Ok(())
    }

    pub fn tempo_state(&self) -> TempoState {
        TempoState {
            bpm: Bpm::clamped(self.bpm),
            beats_per_cycle: BeatsPerCycle::clamped(self.beats_per_cycle),
            subdivision: self.subdivision,
            accent_first_beat: self.accent_first_beat,
            muted: self.muted,
        }
    }

    pub fn scheduler_timing(&self) -> SchedulerTiming {
        SchedulerTiming {
            lookahead: self.lookahead_ms as f64 / 1000.0,
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            resync_offset: self.tap_resync_ms as f64 / 1000.0,
        }
    }

    pub fn tap_config(&self) -> TapTempoConfig {
        TapTempoConfig {
            session_timeout_ms: self.tap_timeout_ms as f64,
            retained_taps: self.tap_history,
            ..TapTempoConfig::default()
        }
    }
}
