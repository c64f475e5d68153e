// Audio clock - Time base for click scheduling
//
// Scheduling is done against the clock the audio hardware runs on, never
// against the timer that wakes the scheduler up. `SampleClock` counts the
// frames rendered by the output callback; it is only valid once that
// callback has run at least once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Monotonic time source, in seconds
pub trait AudioClock: Send {
    fn now(&self) -> f64;

    /// False while the backend has not produced any audio yet
    fn is_available(&self) -> bool;
}

/// Clock driven by the cpal output callback
#[derive(Clone)]
pub struct SampleClock {
    /// Frames rendered so far (incremented by the audio callback)
    sample_position: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    sample_rate: f64,
}

impl SampleClock {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_position: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            sample_rate: sample_rate as f64,
        }
    }

    /// Clock of an output that never started; `is_available` stays false
    pub fn disconnected(sample_rate: f32) -> Self {
        Self::new(sample_rate)
    }

    pub fn current_sample(&self) -> u64 {
        self.sample_position.load(Ordering::Acquire)
    }

    /// Called from the audio callback after rendering `frames`
    pub fn advance(&self, frames: usize) {
        self.sample_position
            .fetch_add(frames as u64, Ordering::Release);
        self.running.store(true, Ordering::Release);
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate as f32
    }

    pub fn seconds_to_samples(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate).round() as u64
    }
}

impl AudioClock for SampleClock {
    fn now(&self) -> f64 {
        self.current_sample() as f64 / self.sample_rate
    }

    fn is_available(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Hand-driven clock for tests and offline runs
#[derive(Clone)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
    available: Arc<AtomicBool>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            micros: Arc::new(AtomicU64::new(0)),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Jump to `seconds`; earlier values are ignored so time never runs back
    pub fn set(&self, seconds: f64) {
        let micros = (seconds.max(0.0) * 1_000_000.0).round() as u64;
        self.micros.fetch_max(micros, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: f64) {
        let micros = (seconds.max(0.0) * 1_000_000.0).round() as u64;
        self.micros.fetch_add(micros, Ordering::SeqCst);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        self.micros.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}
