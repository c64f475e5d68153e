// Beat sequencer - Position within the cycle and accent decision

use super::tempo::BeatsPerCycle;

/// Tracks the current beat index modulo the configured beats per cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BeatSequencer {
    beat_index: u8,
}

impl BeatSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the beat that will be emitted next, in [0, beats_per_cycle)
    pub fn current(&self) -> u8 {
        self.beat_index
    }

    /// Whether the current beat carries the accent
    /// Never true when the accent is disabled, even on beat 0
    pub fn is_accented(&self, accent_first_beat: bool) -> bool {
        accent_first_beat && self.beat_index == 0
    }

    /// Move to the next beat, wrapping at the end of the cycle
    /// Returns the new index
    pub fn advance(&mut self, beats_per_cycle: BeatsPerCycle) -> u8 {
        self.beat_index = (self.beat_index + 1) % beats_per_cycle.get();
        self.beat_index
    }

    /// Back to the downbeat
    pub fn reset(&mut self) {
        self.beat_index = 0;
    }
}
