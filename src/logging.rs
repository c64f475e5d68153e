// Logging setup

use tracing_subscriber::{EnvFilter, fmt};

/// Install the global tracing subscriber
///
/// Level comes from `RUST_LOG` (e.g. `RUST_LOG=band_metronome=debug`),
/// `info` when unset. Call once, at startup.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A second call (tests, embedding hosts) keeps the first subscriber
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_names(true)
        .with_line_number(false)
        .try_init();
}
