// Tick driver - The one periodic thread calling `Metronome::tick`
//
// Re-arming is a plain loop: sleep for whatever `tick()` asked for, tick
// again. There is never more than one loop per metronome, and `shutdown()`
// joins it so no tick can run afterwards.

use super::Metronome;
use crate::audio::clock::AudioClock;
use crate::sound::source::SoundSource;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error};

pub struct TickDriver {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TickDriver {
    /// Start ticking `metronome`. While it is stopped the loop keeps
    /// polling every `idle_interval` (sound loading, pulses).
    pub fn spawn<C, S>(
        metronome: Arc<Mutex<Metronome<C, S>>>,
        idle_interval: Duration,
    ) -> io::Result<Self>
    where
        C: AudioClock + 'static,
        S: SoundSource + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("metronome-tick".to_string())
            .spawn(move || {
                debug!("tick driver running");
                while !shutdown_flag.load(Ordering::Acquire) {
                    let delay = match metronome.lock() {
                        Ok(mut metronome) => metronome.tick().unwrap_or(idle_interval),
                        Err(_) => {
                            error!("metronome lock poisoned, tick driver exiting");
                            break;
                        }
                    };
                    thread::sleep(delay);
                }
                debug!("tick driver stopped");
            })?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the loop and wait for it
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            error!("tick driver panicked");
        }
    }
}

impl Drop for TickDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
