// Output sample formats
//
// Clicks are mixed in f32 and converted to the device format (f32, i16 or
// u16) frame by frame while writing the cpal buffer. No allocation.

use cpal::{FromSample, Sample};

/// Write one mono sample to every channel of an interleaved frame
#[inline]
pub fn write_mono_to_interleaved_frame<T>(internal_sample: f32, output_frame: &mut [T])
where
    T: Sample + FromSample<f32>,
{
    let converted = T::from_sample(internal_sample.clamp(-1.0, 1.0));
    for channel_sample in output_frame.iter_mut() {
        *channel_sample = converted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_to_stereo_f32() {
        let mut frame = [0.0f32; 2];
        write_mono_to_interleaved_frame(0.5, &mut frame);
        assert_eq!(frame, [0.5, 0.5]);
    }

    #[test]
    fn test_mono_to_i16_frame() {
        let mut frame = [0i16; 4];
        write_mono_to_interleaved_frame(-0.5, &mut frame);
        assert!(frame[0] < 0);
        assert!(frame.iter().all(|&s| s == frame[0]));
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let mut frame = [0i16; 1];
        write_mono_to_interleaved_frame(3.0, &mut frame);
        assert_eq!(frame[0], i16::MAX);
    }

    #[test]
    fn test_u16_silence_is_midpoint() {
        let mut frame = [0u16; 2];
        write_mono_to_interleaved_frame(0.0, &mut frame);
        assert_eq!(frame[0], 32768);
    }
}
