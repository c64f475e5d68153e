// Visual notifier - Lights the beat lamp when the click is heard
//
// Notes are emitted up to one lookahead window before they sound. The pulse
// waits for the note's audio time instead of firing when the note was queued.

use crate::sequencer::scheduler::NoteEvent;
use tracing::trace;

/// A pulse, pending or lit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    pub beat_index: u8,
    pub accented: bool,
    pub beats_per_cycle: u8,
    /// Audio-clock time the pulse lights up
    pub at: f64,
}

#[derive(Debug, Clone)]
pub struct VisualNotifier {
    duration: f64,
    pending: Option<Pulse>,
    active: Option<Pulse>,
    cancelled: u64,
}

impl VisualNotifier {
    pub const DEFAULT_DURATION_MS: u64 = 100;

    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration: duration_ms as f64 / 1000.0,
            pending: None,
            active: None,
            cancelled: 0,
        }
    }

    /// Arm a pulse for `event`; returns the wait in ms before it lights
    ///
    /// A pending pulse that has not lit yet is replaced.
    pub fn schedule(&mut self, event: &NoteEvent, now: f64) -> f64 {
        self.poll(now);

        if let Some(stale) = self.pending.take() {
            self.cancelled += 1;
            trace!(beat = stale.beat_index, "stale pulse cancelled");
        }

        self.pending = Some(Pulse {
            beat_index: event.beat_index,
            accented: event.accented,
            beats_per_cycle: event.beats_per_cycle.get(),
            at: event.time,
        });

        ((event.time - now) * 1000.0).max(0.0)
    }

    /// Advance to `now`: light the due pulse, clear the expired one
    pub fn poll(&mut self, now: f64) -> Option<Pulse> {
        if let Some(pending) = self.pending
            && pending.at <= now
        {
            self.active = Some(pending);
            self.pending = None;
        }

        if let Some(active) = self.active
            && now >= active.at + self.duration
        {
            self.active = None;
        }

        self.active
    }

    /// Lit pulse as of the last poll
    pub fn active(&self) -> Option<Pulse> {
        self.active
    }

    pub fn pending(&self) -> Option<Pulse> {
        self.pending
    }

    /// Pulses replaced before they lit
    pub fn cancelled_count(&self) -> u64 {
        self.cancelled
    }

    /// Drop pending and lit pulses
    pub fn clear(&mut self) {
        self.pending = None;
        self.active = None;
    }
}

impl Default for VisualNotifier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DURATION_MS)
    }
}
