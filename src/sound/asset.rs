// Sound assets - Decoded click buffers and the synthesized fallback tones

use std::f32::consts::PI;

/// Decoded tick (normal beat) and tock (accented beat) buffers
/// Mono, immutable once built, shared through `Arc`
#[derive(Debug, Clone, PartialEq)]
pub struct SoundAsset {
    tick: Vec<f32>,
    tock: Vec<f32>,
    sample_rate: u32,
}

impl SoundAsset {
    pub fn new(tick: Vec<f32>, tock: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            tick,
            tock,
            sample_rate,
        }
    }

    /// Buffer for a beat: tock if accented, tick otherwise
    pub fn buffer(&self, accented: bool) -> &[f32] {
        if accented { &self.tock } else { &self.tick }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Synthesized clicks used until (or instead of) decoded buffers
/// Pre-generated at the output rate so the audio thread only copies samples
#[derive(Debug, Clone)]
pub struct FallbackTones {
    accent: Vec<f32>,
    regular: Vec<f32>,
}

impl FallbackTones {
    pub const ACCENT_FREQUENCY: f32 = 440.0;
    pub const REGULAR_FREQUENCY: f32 = 880.0;
    pub const DURATION_SECONDS: f32 = 0.1;
    const START_GAIN: f32 = 0.5;
    const END_GAIN: f32 = 0.001;

    pub fn new(sample_rate: f32) -> Self {
        let num_samples = (Self::DURATION_SECONDS * sample_rate).round() as usize;

        Self {
            accent: Self::generate_tone(sample_rate, num_samples, Self::ACCENT_FREQUENCY),
            regular: Self::generate_tone(sample_rate, num_samples, Self::REGULAR_FREQUENCY),
        }
    }

    /// Sine tone with an exponential decay from 0.5 toward 0.001 over its length
    /// The buffer ends exactly at the stop time
    fn generate_tone(sample_rate: f32, num_samples: usize, frequency: f32) -> Vec<f32> {
        let phase_increment = 2.0 * PI * frequency / sample_rate;
        let decay = (Self::END_GAIN / Self::START_GAIN).ln();

        (0..num_samples)
            .map(|i| {
                let t = i as f32 / num_samples as f32;
                let envelope = Self::START_GAIN * (decay * t).exp();
                (i as f32 * phase_increment).sin() * envelope
            })
            .collect()
    }

    pub fn buffer(&self, accented: bool) -> &[f32] {
        if accented {
            &self.accent
        } else {
            &self.regular
        }
    }
}
