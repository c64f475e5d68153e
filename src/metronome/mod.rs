// Metronome - Entry point for the host form
//
// Every mutation of tempo and schedule goes through this type, so the
// scheduler has a single writer. The periodic driver only calls `tick()`.

pub mod driver;

pub use driver::TickDriver;

use crate::audio::clock::AudioClock;
use crate::config::EngineConfig;
use crate::sequencer::scheduler::{NoteEvent, ScheduleState, Scheduler, TempoChange};
use crate::sequencer::tap_tempo::{TapOutcome, TapState, TapTempo};
use crate::sequencer::tempo::{BeatsPerCycle, Bpm, Subdivision, TempoState};
use crate::sound::SoundStatus;
use crate::sound::loader::{PendingSounds, SoundPaths};
use crate::sound::source::SoundSource;
use crate::visual::pulse::{Pulse, VisualNotifier};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Beat subscription callback
pub type BeatListener = Box<dyn FnMut(&NoteEvent) + Send>;

/// Handle returned by [`Metronome::on_beat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub struct Metronome<C: AudioClock, S: SoundSource> {
    clock: C,
    sound: S,
    tempo: TempoState,
    scheduler: Scheduler,
    tap: TapTempo,
    visual: VisualNotifier,
    listeners: Vec<(ListenerId, BeatListener)>,
    next_listener_id: u64,
    sound_paths: Option<SoundPaths>,
    pending_sounds: Option<PendingSounds>,
    sounds_requested: bool,
    sound_status: SoundStatus,
    events: Vec<NoteEvent>,
}

impl<C: AudioClock, S: SoundSource> Metronome<C, S> {
    pub fn new(clock: C, sound: S) -> Self {
        Self::from_config(clock, sound, &EngineConfig::default())
    }

    pub fn from_config(clock: C, sound: S, config: &EngineConfig) -> Self {
        Self {
            clock,
            sound,
            tempo: config.tempo_state(),
            scheduler: Scheduler::new(config.scheduler_timing()),
            tap: TapTempo::new(config.tap_config()),
            visual: VisualNotifier::new(config.pulse_ms),
            listeners: Vec::new(),
            next_listener_id: 0,
            sound_paths: config.sounds.clone(),
            pending_sounds: None,
            sounds_requested: false,
            sound_status: SoundStatus::Synthesized,
            events: Vec::with_capacity(16),
        }
    }

    // ---- Transport ----

    /// Start playing on beat 0 at the current audio time.
    ///
    /// Returns whether the metronome is running afterwards. With the audio
    /// backend not ready yet nothing changes and false is returned; calling
    /// again later is enough.
    pub fn start(&mut self) -> bool {
        if self.scheduler.is_running() {
            return true;
        }

        if !self.clock.is_available() {
            debug!("audio backend not ready, start deferred");
            return false;
        }

        self.begin_sound_loading();

        let now = self.clock.now();
        self.scheduler.start(now);
        self.visual.clear();
        info!(bpm = self.tempo.bpm.get(), signature = %self.tempo.signature_label(), "metronome started");
        true
    }

    /// Stop scheduling; clicks already handed to the sound source ring out
    pub fn stop(&mut self) {
        if self.scheduler.stop() {
            self.visual.clear();
            info!("metronome stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Backend ready to honour `start()`
    pub fn is_available(&self) -> bool {
        self.clock.is_available()
    }

    // ---- Tempo ----

    /// Clamped to [30, 300]; while playing it applies from the next interval
    pub fn set_bpm(&mut self, bpm: i64) -> Bpm {
        self.apply_bpm(Bpm::clamped(bpm), TempoChange::Smooth)
    }

    /// Form field entry. Non-numeric text keeps the current tempo.
    pub fn set_bpm_text(&mut self, text: &str) -> Option<Bpm> {
        match Bpm::parse_clamped(text) {
            Some(bpm) => Some(self.apply_bpm(bpm, TempoChange::Smooth)),
            None => {
                debug!(text, "rejected BPM input");
                None
            }
        }
    }

    /// +/- buttons
    pub fn adjust_bpm(&mut self, delta: i32) -> Bpm {
        self.apply_bpm(self.tempo.bpm.offset(delta), TempoChange::Smooth)
    }

    pub fn bpm(&self) -> Bpm {
        self.tempo.bpm
    }

    fn apply_bpm(&mut self, bpm: Bpm, change: TempoChange) -> Bpm {
        if bpm != self.tempo.bpm {
            debug!(from = self.tempo.bpm.get(), to = bpm.get(), "tempo changed");
        }
        self.tempo.bpm = bpm;
        self.scheduler
            .apply_tempo_change(self.clock.now(), bpm, change);
        bpm
    }

    /// Beats per cycle clamped to [2, 12]. Restarts the cycle on the
    /// downbeat; the note grid and the tempo are kept.
    pub fn set_time_signature(&mut self, beats_per_cycle: i64, subdivision: Subdivision) {
        self.tempo.beats_per_cycle = BeatsPerCycle::clamped(beats_per_cycle);
        self.tempo.subdivision = subdivision;
        self.scheduler.reset_beat();
        debug!(signature = %self.tempo.signature_label(), "time signature changed");
    }

    pub fn set_accent_first_beat(&mut self, accent: bool) {
        self.tempo.accent_first_beat = accent;
    }

    /// Muted beats still count and still pulse, only the click is skipped
    pub fn set_muted(&mut self, muted: bool) {
        self.tempo.muted = muted;
    }

    pub fn tempo(&self) -> TempoState {
        self.tempo
    }

    // ---- Tap tempo ----

    /// Register a tap at `timestamp_ms` (any monotonic millisecond clock).
    ///
    /// Returns the session estimate, `None` until two taps are in. A new
    /// estimate is applied right away and, while playing, the next click is
    /// pulled close to now.
    pub fn register_tap(&mut self, timestamp_ms: f64) -> Option<Bpm> {
        match self.tap.register(timestamp_ms) {
            TapOutcome::Estimate(bpm) => Some(self.apply_bpm(bpm, TempoChange::Resync)),
            TapOutcome::SessionStarted => None,
            TapOutcome::Rejected => self.tap.session_estimate(),
        }
    }

    /// End an idle tap session; same time base as `register_tap`
    pub fn expire_taps(&mut self, now_ms: f64) -> bool {
        self.tap.expire(now_ms)
    }

    pub fn tap_state(&self) -> TapState {
        self.tap.state()
    }

    /// Last tap estimate, kept after the session ends
    pub fn last_tap_estimate(&self) -> Option<Bpm> {
        self.tap.last_estimate()
    }

    // ---- Listeners ----

    /// Called for every emitted note, muted or not
    pub fn on_beat(&mut self, listener: BeatListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_beat_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    // ---- Sounds ----

    /// Replace the click files. Decoding starts now when playing, on the
    /// next `start()` otherwise; current sounds stay until it completes.
    pub fn set_sound_paths(&mut self, paths: SoundPaths) {
        self.sound_paths = Some(paths);
        self.pending_sounds = None;
        self.sounds_requested = false;
        if self.scheduler.is_running() {
            self.begin_sound_loading();
        }
    }

    pub fn sound_status(&self) -> &SoundStatus {
        &self.sound_status
    }

    fn begin_sound_loading(&mut self) {
        if self.sounds_requested {
            return;
        }
        let Some(paths) = self.sound_paths.clone() else {
            return;
        };
        self.sounds_requested = true;

        match PendingSounds::spawn(paths) {
            Ok(pending) => {
                self.pending_sounds = Some(pending);
                self.sound_status = SoundStatus::Loading;
            }
            Err(e) => {
                warn!(error = %e, "could not start sound loader, keeping synthesized clicks");
                self.sound_status = SoundStatus::Failed(e.to_string());
            }
        }
    }

    fn poll_sounds(&mut self) {
        let Some(result) = self.pending_sounds.as_ref().and_then(PendingSounds::try_take) else {
            return;
        };
        self.pending_sounds = None;

        match result {
            Ok(asset) => {
                self.sound.install_sounds(Arc::new(asset));
                self.sound_status = SoundStatus::Samples;
                info!("click samples installed");
            }
            Err(e) => {
                warn!(error = %e, "sound decode failed, keeping synthesized clicks");
                self.sound_status = SoundStatus::Failed(e.to_string());
            }
        }
    }

    // ---- Scheduling ----

    /// One control tick: emit the notes inside the lookahead window.
    ///
    /// Returns the delay until the next tick while playing, `None` when stopped.
    pub fn tick(&mut self) -> Option<Duration> {
        self.poll_sounds();

        let now = self.clock.now();
        self.visual.poll(now);

        let mut events = std::mem::take(&mut self.events);
        events.clear();
        let rearm = self.scheduler.tick(now, &self.tempo, &mut events);

        for event in &events {
            if !self.tempo.muted {
                self.sound.play_click(event.time, event.accented);
            }
            self.visual.schedule(event, now);
            for (_, listener) in self.listeners.iter_mut() {
                listener(event);
            }
        }

        self.events = events;
        rearm
    }

    /// Driver period, also used while stopped
    pub fn tick_interval(&self) -> Duration {
        self.scheduler.timing().tick_interval
    }

    pub fn schedule_state(&self) -> ScheduleState {
        self.scheduler.schedule_state()
    }

    /// Beat lamp state at the current audio time
    pub fn pulse(&mut self) -> Option<Pulse> {
        self.visual.poll(self.clock.now())
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sound(&self) -> &S {
        &self.sound
    }
}
