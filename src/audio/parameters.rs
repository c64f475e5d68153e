// Shared state between the control side and the audio callback, lock-free

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

/// f32 stored as its bit pattern in an `AtomicU32`
#[derive(Clone)]
pub struct AtomicF32 {
    inner: Arc<AtomicU32>,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            inner: Arc::new(AtomicU32::new(value.to_bits())),
        }
    }

    pub fn set(&self, value: f32) {
        self.inner.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.inner.load(Ordering::Relaxed))
    }
}

impl Default for AtomicF32 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Output stream state as seen from the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Unavailable = 0,
    Starting = 1,
    Running = 2,
    Error = 3,
}

impl From<u8> for BackendStatus {
    fn from(value: u8) -> Self {
        match value {
            1 => BackendStatus::Starting,
            2 => BackendStatus::Running,
            3 => BackendStatus::Error,
            _ => BackendStatus::Unavailable,
        }
    }
}

#[derive(Clone)]
pub struct AtomicBackendStatus {
    inner: Arc<AtomicU8>,
}

impl AtomicBackendStatus {
    pub fn new(status: BackendStatus) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(status as u8)),
        }
    }

    pub fn get(&self) -> BackendStatus {
        BackendStatus::from(self.inner.load(Ordering::Relaxed))
    }

    pub fn set(&self, status: BackendStatus) {
        self.inner.store(status as u8, Ordering::Relaxed);
    }
}

impl Default for AtomicBackendStatus {
    fn default() -> Self {
        Self::new(BackendStatus::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_f32_shared_between_clones() {
        let volume = AtomicF32::new(0.8);
        let audio_side = volume.clone();
        volume.set(0.25);
        assert_eq!(audio_side.get(), 0.25);
    }

    #[test]
    fn test_backend_status_roundtrip() {
        let status = AtomicBackendStatus::default();
        assert_eq!(status.get(), BackendStatus::Unavailable);

        let callback_side = status.clone();
        callback_side.set(BackendStatus::Error);
        assert_eq!(status.get(), BackendStatus::Error);
        assert_eq!(BackendStatus::from(42), BackendStatus::Unavailable);
    }
}
