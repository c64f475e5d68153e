use band_metronome::audio::{AtomicBackendStatus, AtomicF32, AudioEngine, BackendStatus, SampleClock};
use band_metronome::config::EngineConfig;
use band_metronome::logging::init_logging;
use band_metronome::messaging::channels::{
    COMMAND_CAPACITY, NOTIFICATION_CAPACITY, create_command_channel, create_notification_channel,
};
use band_metronome::messaging::notification::{Notification, NotificationCategory};
use band_metronome::metronome::{Metronome, TickDriver};
use band_metronome::sound::ClickOutput;
use band_metronome::ui::app::MetronomeApp;
use ringbuf::traits::Producer;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Rate assumed for the click scheduler when no output could be opened
const FALLBACK_SAMPLE_RATE: f32 = 48_000.0;

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

fn main() {
    init_logging();
    info!("Band Metronome {}", env!("CARGO_PKG_VERSION"));

    let config = match config_path_from_args().or_else(EngineConfig::default_path) {
        Some(path) => EngineConfig::load_or_default(&path),
        None => EngineConfig::default(),
    };

    let (command_tx, command_rx) = create_command_channel(COMMAND_CAPACITY);
    let (notification_tx, notification_rx) = create_notification_channel(NOTIFICATION_CAPACITY);
    let notification_tx = Arc::new(Mutex::new(notification_tx));

    let engine = match AudioEngine::new(
        config.output_device.as_deref(),
        config.volume,
        command_rx,
        notification_tx.clone(),
    ) {
        Ok(engine) => Some(engine),
        Err(e) => {
            // Keep the window usable; start() reports the missing backend
            error!(error = %e, "audio output unavailable");
            if let Ok(mut tx) = notification_tx.lock() {
                let _ = tx.try_push(Notification::error(
                    NotificationCategory::Audio,
                    format!("No audio output: {}", e),
                ));
            }
            None
        }
    };

    let (clock, sample_rate, volume, backend_status) = match &engine {
        Some(engine) => (
            engine.clock(),
            engine.sample_rate(),
            engine.volume.clone(),
            engine.status.clone(),
        ),
        None => (
            SampleClock::disconnected(FALLBACK_SAMPLE_RATE),
            FALLBACK_SAMPLE_RATE,
            AtomicF32::new(config.volume),
            AtomicBackendStatus::new(BackendStatus::Unavailable),
        ),
    };

    let output = ClickOutput::new(command_tx, sample_rate);
    let metronome = Arc::new(Mutex::new(Metronome::from_config(clock, output, &config)));

    let driver = match TickDriver::spawn(Arc::clone(&metronome), config.scheduler_timing().tick_interval) {
        Ok(driver) => driver,
        Err(e) => {
            error!(error = %e, "could not start the tick driver");
            return;
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([560.0, 320.0])
            .with_title("Band Metronome"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "Band Metronome",
        native_options,
        Box::new(move |_cc| {
            Ok(Box::new(MetronomeApp::new(
                metronome,
                driver,
                engine,
                volume,
                backend_status,
                notification_rx,
            )))
        }),
    );

    if let Err(e) = result {
        warn!(error = %e, "window closed with an error");
    }
}
