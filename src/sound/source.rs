// Sound source - Click playback
//
// Control side: `SoundSource` receives "play at time T" requests from the
// metronome. `ClickOutput` forwards them to the audio thread as sample
// positions through the command ring buffer.
//
// Audio side: `ClickRenderer` starts each click on the exact frame it was
// scheduled for. No allocation happens once the renderer is built.

use super::asset::{FallbackTones, SoundAsset};
use crate::messaging::channels::CommandProducer;
use crate::messaging::command::AudioCommand;
use ringbuf::traits::Producer;
use std::sync::Arc;
use tracing::warn;

/// Receiver of scheduled clicks
pub trait SoundSource {
    /// Play a click at audio-clock `time` (seconds)
    fn play_click(&mut self, time: f64, accented: bool);

    /// Replace the active sound asset as a whole
    fn install_sounds(&mut self, asset: Arc<SoundAsset>);
}

/// Control-side handle to the audio thread
pub struct ClickOutput {
    command_tx: CommandProducer,
    sample_rate: f64,
}

impl ClickOutput {
    pub fn new(command_tx: CommandProducer, sample_rate: f32) -> Self {
        Self {
            command_tx,
            sample_rate: sample_rate as f64,
        }
    }

    /// Audio-clock seconds to the sample index the renderer counts in
    pub fn time_to_sample(&self, time: f64) -> u64 {
        (time.max(0.0) * self.sample_rate).round() as u64
    }

    fn send(&mut self, command: AudioCommand) {
        if self.command_tx.try_push(command).is_err() {
            warn!("audio command queue full, click dropped");
        }
    }
}

impl SoundSource for ClickOutput {
    fn play_click(&mut self, time: f64, accented: bool) {
        let at_sample = self.time_to_sample(time);
        self.send(AudioCommand::ScheduleClick {
            at_sample,
            accented,
        });
    }

    fn install_sounds(&mut self, asset: Arc<SoundAsset>) {
        self.send(AudioCommand::SetSoundAsset(asset));
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingClick {
    at_sample: u64,
    accented: bool,
}

#[derive(Debug, Clone)]
enum VoiceSource {
    Decoded(Arc<SoundAsset>),
    Synthesized,
}

#[derive(Debug, Clone)]
struct ClickVoice {
    source: VoiceSource,
    accented: bool,
    position: f64,
    step: f64,
    started_at: u64,
}

/// Sample-accurate click mixer running inside the audio callback
pub struct ClickRenderer {
    sample_rate: f32,
    fallback: FallbackTones,
    asset: Option<Arc<SoundAsset>>,
    pending: Vec<PendingClick>,
    voices: Vec<Option<ClickVoice>>,
    position: u64,
    dropped_clicks: u64,
}

impl ClickRenderer {
    /// Clicks waiting for their start frame
    pub const MAX_PENDING: usize = 32;
    /// Clicks allowed to ring at once; the oldest one is cut beyond that
    pub const MAX_VOICES: usize = 8;

    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            fallback: FallbackTones::new(sample_rate),
            asset: None,
            pending: Vec::with_capacity(Self::MAX_PENDING),
            voices: vec![None; Self::MAX_VOICES],
            position: 0,
            dropped_clicks: 0,
        }
    }

    /// Sample index of the next frame to render
    pub fn position(&self) -> u64 {
        self.position
    }

    /// True once decoded buffers replaced the synthesized tones
    pub fn uses_decoded_sounds(&self) -> bool {
        self.asset.is_some()
    }

    /// Clicks lost because the pending queue was full
    pub fn dropped_clicks(&self) -> u64 {
        self.dropped_clicks
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_some()).count()
    }

    pub fn handle_command(&mut self, command: AudioCommand) {
        match command {
            AudioCommand::ScheduleClick {
                at_sample,
                accented,
            } => self.schedule(at_sample, accented),
            AudioCommand::SetSoundAsset(asset) => self.set_asset(asset),
        }
    }

    /// Queue a click; late clicks start on the next rendered frame
    pub fn schedule(&mut self, at_sample: u64, accented: bool) {
        if self.pending.len() == Self::MAX_PENDING {
            self.dropped_clicks += 1;
            return;
        }
        self.pending.push(PendingClick {
            at_sample,
            accented,
        });
    }

    /// Swap the whole asset; voices already ringing keep their own buffer
    pub fn set_asset(&mut self, asset: Arc<SoundAsset>) {
        self.asset = Some(asset);
    }

    /// Render one mono frame
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if !self.pending.is_empty() {
            self.start_due_clicks();
        }

        let Self {
            voices, fallback, ..
        } = self;

        let mut mix = 0.0;
        for slot in voices.iter_mut() {
            let Some(voice) = slot else {
                continue;
            };

            let buffer = match &voice.source {
                VoiceSource::Decoded(asset) => asset.buffer(voice.accented),
                VoiceSource::Synthesized => fallback.buffer(voice.accented),
            };

            match read_interpolated(buffer, voice.position) {
                Some(sample) => {
                    mix += sample;
                    voice.position += voice.step;
                }
                None => *slot = None,
            }
        }

        self.position += 1;
        mix
    }

    /// Render a block of mono frames
    pub fn render(&mut self, output: &mut [f32]) {
        for sample in output.iter_mut() {
            *sample = self.next_sample();
        }
    }

    fn start_due_clicks(&mut self) {
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].at_sample <= self.position {
                let click = self.pending.swap_remove(i);
                self.start_voice(click.accented);
            } else {
                i += 1;
            }
        }
    }

    fn start_voice(&mut self, accented: bool) {
        let (source, step) = match &self.asset {
            Some(asset) => (
                VoiceSource::Decoded(Arc::clone(asset)),
                asset.sample_rate() as f64 / self.sample_rate as f64,
            ),
            None => (VoiceSource::Synthesized, 1.0),
        };

        let voice = ClickVoice {
            source,
            accented,
            position: 0.0,
            step,
            started_at: self.position,
        };

        let slot = match self.voices.iter().position(Option::is_none) {
            Some(free) => free,
            None => self
                .voices
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| v.as_ref().map_or(u64::MAX, |v| v.started_at))
                .map_or(0, |(index, _)| index),
        };
        self.voices[slot] = Some(voice);
    }
}

/// Linear interpolation between neighbouring samples, `None` past the end
#[inline]
fn read_interpolated(buffer: &[f32], position: f64) -> Option<f32> {
    let index = position as usize;
    let current = *buffer.get(index)?;
    let next = buffer.get(index + 1).copied().unwrap_or(0.0);
    let frac = (position - index as f64) as f32;
    Some(current + (next - current) * frac)
}
