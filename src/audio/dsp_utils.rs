// Output hygiene applied to the click mix in the audio callback

/// Values this small are flushed so the CPU never touches denormals
const DENORMAL_THRESHOLD: f32 = 1e-15;

#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < DENORMAL_THRESHOLD { 0.0 } else { x }
}

/// tanh saturation, keeps overlapping clicks inside [-1, 1]
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x.tanh()
}

/// One-pole low-pass for the volume control
///
/// y[n] = y[n-1] + a * (x[n] - y[n-1])
///
/// A volume change while a click rings would otherwise step the waveform.
pub struct OnePoleSmoother {
    current: f32,
    coefficient: f32,
}

impl OnePoleSmoother {
    /// `time_constant_ms` is roughly the time to cover 63% of a step
    pub fn new(initial_value: f32, time_constant_ms: f32, sample_rate: f32) -> Self {
        let time_constant_samples = (time_constant_ms * 0.001 * sample_rate).max(1.0);

        Self {
            current: initial_value,
            coefficient: 1.0 / time_constant_samples,
        }
    }

    #[inline]
    pub fn process(&mut self, target: f32) -> f32 {
        self.current += self.coefficient * (target - self.current);
        self.current = flush_denormals_to_zero(self.current);
        self.current
    }

    pub fn current(&self) -> f32 {
        self.current
    }
}
