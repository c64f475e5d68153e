// Tempo - Validated musical values for the click track
// BPM, beats per cycle (time signature numerator) and display subdivision

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when building tempo values from raw input
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TempoError {
    #[error("Beats per cycle must be between {min} and {max}, got {0}", min = BeatsPerCycle::MIN, max = BeatsPerCycle::MAX)]
    BeatsPerCycleOutOfRange(i64),

    #[error("Unknown subdivision: {0} (expected 4, 8 or 16)")]
    UnknownSubdivision(u8),
}

/// Tempo in beats per minute, always within [30, 300]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bpm(u16);

impl Bpm {
    pub const MIN: u16 = 30;
    pub const MAX: u16 = 300;

    /// Exact constructor, `None` when out of range
    pub fn new(bpm: u16) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&bpm).then_some(Self(bpm))
    }

    /// Clamp any integer into the valid range
    pub fn clamped(bpm: i64) -> Self {
        Self(bpm.clamp(Self::MIN as i64, Self::MAX as i64) as u16)
    }

    /// Round and clamp a fractional estimate (tap tempo)
    /// Non-finite values are rejected
    pub fn from_f64(bpm: f64) -> Option<Self> {
        if !bpm.is_finite() {
            return None;
        }
        Some(Self::clamped(bpm.round() as i64))
    }

    /// Parse text typed into the BPM field
    /// Non-numeric input is rejected, numeric input is clamped
    pub fn parse_clamped(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if let Ok(value) = trimmed.parse::<i64>() {
            return Some(Self::clamped(value));
        }
        trimmed.parse::<f64>().ok().and_then(Self::from_f64)
    }

    pub fn get(self) -> u16 {
        self.0
    }

    /// Add a signed delta, saturating at the range bounds
    pub fn offset(self, delta: i32) -> Self {
        Self::clamped(self.0 as i64 + delta as i64)
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(self) -> f64 {
        60.0 / self.0 as f64
    }
}

impl Default for Bpm {
    fn default() -> Self {
        Self(120)
    }
}

impl fmt::Display for Bpm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.0)
    }
}

/// Beats per cycle (numerator of the time signature), within [2, 12]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BeatsPerCycle(u8);

impl BeatsPerCycle {
    pub const MIN: u8 = 2;
    pub const MAX: u8 = 12;

    pub fn new(beats: i64) -> Result<Self, TempoError> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&beats) {
            Ok(Self(beats as u8))
        } else {
            Err(TempoError::BeatsPerCycleOutOfRange(beats))
        }
    }

    pub fn clamped(beats: i64) -> Self {
        Self(beats.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for BeatsPerCycle {
    fn default() -> Self {
        Self(4)
    }
}

impl TryFrom<i64> for BeatsPerCycle {
    type Error = TempoError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Displayed note value of a beat (denominator)
/// Only carried through to consumers, never changes the beat duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subdivision {
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
}

impl Subdivision {
    pub const ALL: [Subdivision; 3] = [Self::Quarter, Self::Eighth, Self::Sixteenth];

    pub fn value(self) -> u8 {
        match self {
            Self::Quarter => 4,
            Self::Eighth => 8,
            Self::Sixteenth => 16,
        }
    }
}

impl TryFrom<u8> for Subdivision {
    type Error = TempoError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Self::Quarter),
            8 => Ok(Self::Eighth),
            16 => Ok(Self::Sixteenth),
            other => Err(TempoError::UnknownSubdivision(other)),
        }
    }
}

/// Tempo configuration read by the scheduler on every tick
/// Only the metronome facade writes it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoState {
    pub bpm: Bpm,
    pub beats_per_cycle: BeatsPerCycle,
    pub subdivision: Subdivision,
    pub accent_first_beat: bool,
    pub muted: bool,
}

impl TempoState {
    /// Time signature as displayed, e.g. "7/8"
    pub fn signature_label(&self) -> String {
        format!("{}/{}", self.beats_per_cycle.get(), self.subdivision.value())
    }
}

impl Default for TempoState {
    fn default() -> Self {
        Self {
            bpm: Bpm::default(),
            beats_per_cycle: BeatsPerCycle::default(),
            subdivision: Subdivision::Quarter,
            accent_first_beat: true,
            muted: false,
        }
    }
}
