// Sequencer module
// Tempo values, beat position, lookahead scheduling and tap tempo

pub mod beat;
pub mod scheduler;
pub mod tap_tempo;
pub mod tempo;

pub use beat::BeatSequencer;
pub use scheduler::{
    NoteEvent, ScheduleState, Scheduler, SchedulerTiming, TempoChange, TransportState,
};
pub use tap_tempo::{TapOutcome, TapState, TapTempo, TapTempoConfig};
pub use tempo::{BeatsPerCycle, Bpm, Subdivision, TempoError, TempoState};
