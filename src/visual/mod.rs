// Visual module - Beat pulses aligned to audio time

pub mod pulse;

pub use pulse::{Pulse, VisualNotifier};
