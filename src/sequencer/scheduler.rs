// Scheduler - Lookahead click scheduling
// Turns a coarse periodic control tick into note events stamped with exact
// audio-clock times, so playback precision does not depend on the tick period.

use super::beat::BeatSequencer;
use super::tempo::{BeatsPerCycle, Bpm, Subdivision, TempoState};
use std::time::Duration;
use tracing::debug;

/// Transport state of the click track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }
}

/// How a tempo change is applied while playing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempoChange {
    /// Takes effect on the next computed interval
    Smooth,
    /// Also pulls the next note close to "now" (tap tempo path)
    Resync,
}

/// Snapshot of the scheduling state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleState {
    /// Audio-clock time (seconds) of the next note to emit
    pub next_note_time: f64,
    /// Index of the next beat, in [0, beats_per_cycle)
    pub beat_index: u8,
    pub running: bool,
}

/// One click handed to the sound source and the visual notifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    /// Audio-clock time in seconds
    pub time: f64,
    pub beat_index: u8,
    pub accented: bool,
    pub beats_per_cycle: BeatsPerCycle,
    /// Display only
    pub subdivision: Subdivision,
}

impl NoteEvent {
    pub fn time_ms(&self) -> f64 {
        self.time * 1000.0
    }
}

/// Scheduler timing parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerTiming {
    /// How far ahead of the clock notes are emitted (seconds)
    pub lookahead: f64,
    /// Period of the control tick
    pub tick_interval: Duration,
    /// Distance from "now" of the first note after a tap resync (seconds)
    pub resync_offset: f64,
}

impl Default for SchedulerTiming {
    fn default() -> Self {
        Self {
            lookahead: 0.1,
            tick_interval: Duration::from_millis(25),
            resync_offset: 0.05,
        }
    }
}

/// Lookahead scheduler
///
/// Reads [`TempoState`] on every tick and only ever writes its own schedule.
/// The caller supplies the audio-clock time, which keeps the scheduler free of
/// any timer or thread: whatever periodic driver exists calls [`Scheduler::tick`]
/// and sleeps for the returned delay.
#[derive(Debug, Clone)]
pub struct Scheduler {
    timing: SchedulerTiming,
    state: TransportState,
    next_note_time: f64,
    last_note_time: Option<f64>,
    sequencer: BeatSequencer,
}

impl Scheduler {
    pub fn new(timing: SchedulerTiming) -> Self {
        Self {
            timing,
            state: TransportState::Stopped,
            next_note_time: 0.0,
            last_note_time: None,
            sequencer: BeatSequencer::new(),
        }
    }

    pub fn timing(&self) -> &SchedulerTiming {
        &self.timing
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_playing()
    }

    pub fn schedule_state(&self) -> ScheduleState {
        ScheduleState {
            next_note_time: self.next_note_time,
            beat_index: self.sequencer.current(),
            running: self.is_running(),
        }
    }

    /// Stopped -> Playing. The first note lands at `now` on beat 0.
    /// Returns false (and changes nothing) if already playing.
    pub fn start(&mut self, now: f64) -> bool {
        if self.state.is_playing() {
            return false;
        }

        self.next_note_time = now;
        self.last_note_time = None;
        self.sequencer.reset();
        self.state = TransportState::Playing;
        true
    }

    /// Playing -> Stopped. Clicks already emitted are left to ring out.
    /// Returns false if already stopped.
    pub fn stop(&mut self) -> bool {
        if !self.state.is_playing() {
            return false;
        }

        self.state = TransportState::Stopped;
        self.next_note_time = 0.0;
        self.last_note_time = None;
        self.sequencer.reset();
        true
    }

    /// Emit every note falling inside the lookahead window into `events`.
    ///
    /// Returns the delay before the next tick while playing, `None` once stopped
    /// (nothing to re-arm).
    pub fn tick(
        &mut self,
        now: f64,
        tempo: &TempoState,
        events: &mut Vec<NoteEvent>,
    ) -> Option<Duration> {
        if !self.state.is_playing() {
            return None;
        }

        self.skip_stalled_beats(now, tempo);

        let horizon = now + self.timing.lookahead;
        while self.next_note_time < horizon {
            events.push(NoteEvent {
                time: self.next_note_time,
                beat_index: self.sequencer.current(),
                accented: self.sequencer.is_accented(tempo.accent_first_beat),
                beats_per_cycle: tempo.beats_per_cycle,
                subdivision: tempo.subdivision,
            });

            self.last_note_time = Some(self.next_note_time);
            self.sequencer.advance(tempo.beats_per_cycle);
            self.next_note_time += tempo.bpm.beat_duration_seconds();
        }

        Some(self.timing.tick_interval)
    }

    /// Apply a new tempo to the running schedule.
    ///
    /// `Smooth` needs no work here: the next interval is computed from the new
    /// BPM when the pending note is emitted. `Resync` moves the pending note to
    /// `now + resync_offset`, but never closer than one new beat after the last
    /// emitted note so two clicks cannot pile up.
    pub fn apply_tempo_change(&mut self, now: f64, bpm: Bpm, change: TempoChange) {
        if !self.state.is_playing() || change == TempoChange::Smooth {
            return;
        }

        let mut target = now + self.timing.resync_offset;
        if let Some(last) = self.last_note_time {
            target = target.max(last + bpm.beat_duration_seconds());
        }

        debug!(
            from = self.next_note_time,
            to = target,
            bpm = bpm.get(),
            "resyncing next note after tap tempo"
        );
        self.next_note_time = target;
    }

    /// Restart the cycle on the downbeat without touching the note grid
    pub fn reset_beat(&mut self) {
        self.sequencer.reset();
    }

    /// After a stalled driver, jump over whole beats that are already in the
    /// past instead of emitting a burst of late clicks. The beat index keeps
    /// counting so the cycle phase is preserved.
    fn skip_stalled_beats(&mut self, now: f64, tempo: &TempoState) {
        let beat = tempo.bpm.beat_duration_seconds();
        let lag = now - self.next_note_time;
        if lag <= beat {
            return;
        }

        let skipped = (lag / beat).floor() as u64;
        self.next_note_time += skipped as f64 * beat;
        let cycle = tempo.beats_per_cycle.get() as u64;
        for _ in 0..(skipped % cycle) {
            self.sequencer.advance(tempo.beats_per_cycle);
        }

        debug!(skipped, "scheduler stalled, skipped late beats");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerTiming::default())
    }
}
