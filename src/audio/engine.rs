// Audio engine - cpal output stream rendering the clicks
//
// # Format Support
//
// The device's preferred sample format is detected with `sample_format()`.
// F32, I16 and U16 streams are supported; clicks are mixed in f32 and
// converted while writing each frame.
//
// # Timing
//
// The callback owns the `ClickRenderer` and the command consumer. Each
// buffer it drains pending commands, renders frame by frame and then
// advances the shared `SampleClock` by the number of frames written. The
// scheduler reads that clock, so a click scheduled for sample N is heard
// exactly N frames after the stream started.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer};
use std::sync::{Arc, Mutex};
use tracing::{error, info};

use crate::audio::AudioError;
use crate::audio::clock::SampleClock;
use crate::audio::device::AudioDeviceManager;
use crate::audio::dsp_utils::{OnePoleSmoother, flush_denormals_to_zero, soft_clip};
use crate::audio::format_conversion::write_mono_to_interleaved_frame;
use crate::audio::parameters::{AtomicBackendStatus, AtomicF32, BackendStatus};
use crate::messaging::channels::{CommandConsumer, NotificationProducer};
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::sound::source::ClickRenderer;

/// Volume smoothing time constant
const VOLUME_SMOOTHING_MS: f32 = 10.0;

pub struct AudioEngine {
    _stream: Stream,
    device_name: String,
    sample_rate: f32,
    clock: SampleClock,
    pub volume: AtomicF32,
    pub status: AtomicBackendStatus,
}

impl AudioEngine {
    /// Open `device_name` (or the default output) and start rendering
    pub fn new(
        device_name: Option<&str>,
        initial_volume: f32,
        command_rx: CommandConsumer,
        notification_tx: Arc<Mutex<NotificationProducer>>,
    ) -> Result<Self, AudioError> {
        let device = AudioDeviceManager::new()
            .resolve(device_name)
            .ok_or(AudioError::NoDevice)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let supported_config = device.default_output_config()?;
        let sample_format = supported_config.sample_format();
        let sample_rate = supported_config.sample_rate().0 as f32;
        let channels = supported_config.channels() as usize;
        let config: StreamConfig = supported_config.into();

        info!(
            device = %device_name,
            sample_rate,
            channels,
            format = ?sample_format,
            "opening audio output"
        );

        let clock = SampleClock::new(sample_rate);
        let volume = AtomicF32::new(initial_volume.clamp(0.0, 1.0));
        let status = AtomicBackendStatus::new(BackendStatus::Starting);

        let parts = CallbackParts {
            channels,
            command_rx,
            renderer: ClickRenderer::new(sample_rate),
            smoother: OnePoleSmoother::new(volume.get(), VOLUME_SMOOTHING_MS, sample_rate),
            volume: volume.clone(),
            clock: clock.clone(),
        };

        let stream = match sample_format {
            SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config, parts, status.clone(), notification_tx.clone())
            }
            SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config, parts, status.clone(), notification_tx.clone())
            }
            SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config, parts, status.clone(), notification_tx.clone())
            }
            other => return Err(AudioError::UnsupportedFormat(other)),
        }?;

        stream.play()?;
        status.set(BackendStatus::Running);
        info!(sample_rate, "audio engine started");

        if let Ok(mut tx) = notification_tx.try_lock() {
            let notif = Notification::info(
                NotificationCategory::Audio,
                format!("Audio output: {} ({} Hz)", device_name, sample_rate),
            );
            let _ = tx.try_push(notif);
        }

        Ok(Self {
            _stream: stream,
            device_name,
            sample_rate,
            clock,
            volume,
            status,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Clock advanced by this engine's callback
    pub fn clock(&self) -> SampleClock {
        self.clock.clone()
    }

    /// Generic over the device sample type; mixing stays in f32
    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        parts: CallbackParts,
        status: AtomicBackendStatus,
        notification_tx: Arc<Mutex<NotificationProducer>>,
    ) -> Result<Stream, AudioError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let CallbackParts {
            channels,
            mut command_rx,
            mut renderer,
            mut smoother,
            volume,
            clock,
        } = parts;

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // No allocations, no I/O, no locks past this point

                while let Some(command) = command_rx.try_pop() {
                    renderer.handle_command(command);
                }

                let target_volume = volume.get();
                for frame in data.chunks_mut(channels) {
                    let gain = smoother.process(target_volume);
                    let sample = flush_denormals_to_zero(renderer.next_sample()) * gain;
                    write_mono_to_interleaved_frame(soft_clip(sample), frame);
                }

                clock.advance(data.len() / channels);
            },
            move |err| {
                // Runs outside the real-time callback
                error!(%err, "audio stream error");
                status.set(BackendStatus::Error);

                if let Ok(mut tx) = notification_tx.try_lock() {
                    let notif = Notification::error(
                        NotificationCategory::Audio,
                        format!("Audio stream error: {}", err),
                    );
                    let _ = tx.try_push(notif);
                }
            },
            None,
        )?;

        Ok(stream)
    }
}

/// State moved into the output callback
struct CallbackParts {
    channels: usize,
    command_rx: CommandConsumer,
    renderer: ClickRenderer,
    smoother: OnePoleSmoother,
    volume: AtomicF32,
    clock: SampleClock,
}
