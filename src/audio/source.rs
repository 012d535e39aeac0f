// Sources audio du mixeur - clip décodé et flux micro temps-réel

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ringbuf::traits::{Consumer, Observer};

use crate::audio::backend::{AudioSource, CaptureConsumer, StreamFormat};
use crate::audio::decoder::{AudioClip, DecodeError};
use crate::audio::format_conversion::{LinearResampler, add_mapped_frame};

/// A decoded clip ready to be played at a fixed output format
///
/// The clip is resampled once at construction, so rendering only maps
/// channels. The shared playing flag drops to false once the last frame has
/// been rendered, or when the source is dropped.
pub struct ClipSource {
    samples: Vec<f32>,
    channels: usize,
    output_channels: usize,
    position: usize,
    playing: Arc<AtomicBool>,
}

impl ClipSource {
    pub fn new(clip: AudioClip, output: StreamFormat) -> Result<Self, DecodeError> {
        let clip = clip.resampled(output.sample_rate)?;
        let playing = Arc::new(AtomicBool::new(!clip.samples.is_empty()));

        Ok(Self {
            channels: clip.format.channels.max(1) as usize,
            output_channels: output.channels.max(1) as usize,
            samples: clip.samples,
            position: 0,
            playing,
        })
    }

    pub fn playing_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.playing)
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.samples.len()
    }

    pub fn remaining_frames(&self) -> usize {
        (self.samples.len() - self.position.min(self.samples.len())) / self.channels
    }

    /// Add the next frames of the clip onto `out` (interleaved, output channels)
    ///
    /// Returns the number of frames that received clip audio.
    pub fn mix_into(&mut self, out: &mut [f32]) -> usize {
        let mut mixed = 0;
        for frame in out.chunks_mut(self.output_channels) {
            let end = self.position + self.channels;
            if end > self.samples.len() {
                break;
            }
            add_mapped_frame(&self.samples[self.position..end], frame);
            self.position = end;
            mixed += 1;
        }

        if self.is_finished() {
            self.playing.store(false, Ordering::Release);
        }
        mixed
    }
}

impl AudioSource for ClipSource {
    fn render(&mut self, out: &mut [f32]) -> usize {
        out.fill(0.0);
        self.mix_into(out)
    }
}

impl Drop for ClipSource {
    fn drop(&mut self) {
        self.playing.store(false, Ordering::Release);
    }
}

/// Live microphone feed read from the capture ring buffer
///
/// Captured frames are downmixed to mono, brought to the output rate by
/// linear interpolation and copied to every output channel. An empty ring
/// buffer yields silence.
pub struct MicInput {
    consumer: CaptureConsumer,
    capture_channels: usize,
    output_channels: usize,
    resampler: LinearResampler,
}

impl MicInput {
    pub fn new(consumer: CaptureConsumer, capture: StreamFormat, output: StreamFormat) -> Self {
        Self {
            consumer,
            capture_channels: capture.channels.max(1) as usize,
            output_channels: output.channels.max(1) as usize,
            resampler: LinearResampler::new(capture.sample_rate, output.sample_rate),
        }
    }

    pub fn buffered_samples(&self) -> usize {
        self.consumer.occupied_len()
    }

    pub fn mix_into(&mut self, out: &mut [f32]) -> usize {
        let consumer = &mut self.consumer;
        let capture_channels = self.capture_channels;

        // Un frame complet ou rien, pour ne jamais désaligner les canaux
        let mut pull_frame = || {
            if consumer.occupied_len() < capture_channels {
                return None;
            }
            let mut sum = 0.0;
            for _ in 0..capture_channels {
                sum += consumer.try_pop().unwrap_or(0.0);
            }
            Some(sum / capture_channels as f32)
        };

        let mut mixed = 0;
        for frame in out.chunks_mut(self.output_channels) {
            let Some(sample) = self.resampler.next_sample(&mut pull_frame) else {
                break;
            };
            for out in frame.iter_mut() {
                *out += sample;
            }
            mixed += 1;
        }
        mixed
    }
}
