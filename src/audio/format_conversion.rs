// Format conversion for the mixing stage and CPAL audio streams
//
// - Sample format: internal f32 to the device's f32/i16/u16 via cpal's `FromSample`
// - Channel mapping: mono fan-out, downmix to mono, channel-by-channel otherwise
// - Rate: linear interpolation for the live microphone feed
//
// All conversions are allocation-free and suitable for real-time audio callbacks.

use cpal::{FromSample, Sample};

/// Write f32 sample to output buffer with automatic format conversion
///
/// This is the main function used in the audio callback.
#[inline]
pub fn write_sample_to_buffer<T>(sample: f32, output: &mut T)
where
    T: Sample + FromSample<f32>,
{
    *output = Sample::from_sample::<f32>(sample);
}

#[inline]
pub fn downmix_to_mono(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    frame.iter().sum::<f32>() / frame.len() as f32
}

/// Add one input frame onto one output frame, mapping channel counts
///
/// Mono is copied to every output channel, anything into mono is averaged,
/// other layouts are matched channel by channel (extra output channels are
/// left untouched).
#[inline]
pub fn add_mapped_frame(input: &[f32], output: &mut [f32]) {
    match (input.len(), output.len()) {
        (0, _) | (_, 0) => {}
        (1, _) => {
            for out in output.iter_mut() {
                *out += input[0];
            }
        }
        (_, 1) => output[0] += downmix_to_mono(input),
        _ => {
            for (out, &sample) in output.iter_mut().zip(input) {
                *out += sample;
            }
        }
    }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Streaming linear-interpolation resampler for a mono feed
///
/// Samples are pulled on demand, so the resampler can sit directly on top of
/// a ring buffer consumer. When the feed runs dry, [`next_sample`] returns
/// `None` and resumes where it left off once data is available again.
///
/// [`next_sample`]: LinearResampler::next_sample
#[derive(Debug, Clone)]
pub struct LinearResampler {
    step: f64,
    phase: f64,
    previous: f32,
    current: f32,
    filled: u8,
}

impl LinearResampler {
    pub fn new(source_rate: u32, target_rate: u32) -> Self {
        Self {
            step: source_rate.max(1) as f64 / target_rate.max(1) as f64,
            phase: 0.0,
            previous: 0.0,
            current: 0.0,
            filled: 0,
        }
    }

    /// Input samples consumed per output sample
    pub fn ratio(&self) -> f64 {
        self.step
    }

    #[inline]
    pub fn next_sample(&mut self, mut pull: impl FnMut() -> Option<f32>) -> Option<f32> {
        // Amorçage : il faut deux points pour interpoler
        while self.filled < 2 {
            let sample = pull()?;
            self.previous = self.current;
            self.current = sample;
            self.filled += 1;
        }

        while self.phase >= 1.0 {
            let sample = pull()?;
            self.previous = self.current;
            self.current = sample;
            self.phase -= 1.0;
        }

        let out = lerp(self.previous, self.current, self.phase as f32);
        self.phase += self.step;
        Some(out)
    }
}
