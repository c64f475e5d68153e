// Band Metronome - Library exports for the binary, tests and benchmarks

pub mod audio;
pub mod config;
pub mod logging;
pub mod messaging;
pub mod metronome;
pub mod sequencer;
pub mod sound;
pub mod ui;
pub mod visual;

// Re-export commonly used types for convenience
pub use audio::clock::{AudioClock, ManualClock, SampleClock};
pub use audio::engine::AudioEngine;
pub use config::{ConfigError, EngineConfig};
pub use messaging::channels::{create_command_channel, create_notification_channel};
pub use metronome::{BeatListener, ListenerId, Metronome, TickDriver};
pub use sequencer::{
    BeatsPerCycle, Bpm, NoteEvent, ScheduleState, Scheduler, SchedulerTiming, Subdivision,
    TapState, TapTempo, TempoState, TransportState,
};
pub use sound::{ClickOutput, ClickRenderer, SoundAsset, SoundSource, SoundStatus};
pub use visual::{Pulse, VisualNotifier};
