// Décodage des fichiers audio (symphonia) et rééchantillonnage hors temps-réel (rubato)

use std::fs::File;
use std::path::Path;

use log::{debug, warn};
use rubato::{FftFixedIn, Resampler};
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::backend::StreamFormat;

/// Input frames per rubato chunk
const RESAMPLE_CHUNK: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported audio file: {0}")]
    Unsupported(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Resampling error: {0}")]
    Resample(String),

    #[error("Audio file contains no samples")]
    Empty,
}

/// A fully decoded clip, interleaved f32
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub format: StreamFormat,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, format: StreamFormat) -> Self {
        Self { samples, format }
    }

    /// Decode the whole file at `path`
    pub fn open(path: &Path) -> Result<Self, DecodeError> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| DecodeError::Unsupported(e.to_string()))?;
        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| DecodeError::Unsupported("no audio track".to_string()))?;
        let track_id = track.id;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

        let mut samples: Vec<f32> = Vec::new();
        let mut spec: Option<SignalSpec> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(e) => return Err(DecodeError::Codec(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping undecodable packet in {}: {}", path.display(), e);
                    continue;
                }
                Err(e) => return Err(DecodeError::Codec(e.to_string())),
            };

            let packet_spec = *decoded.spec();
            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, packet_spec);
            buffer.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buffer.samples());
            spec.get_or_insert(packet_spec);
        }

        let spec = spec.ok_or(DecodeError::Empty)?;
        if samples.is_empty() {
            return Err(DecodeError::Empty);
        }

        let format = StreamFormat::new(spec.rate, spec.channels.count() as u16);
        debug!(
            "Decoded {}: {} Hz, {} channels, {} frames",
            path.display(),
            format.sample_rate,
            format.channels,
            samples.len() / format.channels.max(1) as usize
        );

        Ok(Self { samples, format })
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.format.channels.max(1) as usize
    }

    /// Same clip at `target_rate`, channel count unchanged
    pub fn resampled(&self, target_rate: u32) -> Result<Self, DecodeError> {
        let source_rate = self.format.sample_rate;
        if source_rate == target_rate || self.samples.is_empty() {
            return Ok(self.clone());
        }

        let channels = self.format.channels.max(1) as usize;
        let frames = self.frames();
        let planar: Vec<Vec<f32>> = (0..channels)
            .map(|c| self.samples.iter().skip(c).step_by(channels).copied().collect())
            .collect();

        let mut resampler = FftFixedIn::<f32>::new(
            source_rate as usize,
            target_rate as usize,
            RESAMPLE_CHUNK,
            2,
            channels,
        )
        .map_err(|e| DecodeError::Resample(e.to_string()))?;

        let mut output: Vec<Vec<f32>> = vec![Vec::new(); channels];
        let append = |output: &mut Vec<Vec<f32>>, produced: Vec<Vec<f32>>| {
            for (out, chunk) in output.iter_mut().zip(produced) {
                out.extend_from_slice(&chunk);
            }
        };

        let mut position = 0;
        while position < frames {
            let needed = resampler.input_frames_next();
            let end = (position + needed).min(frames);
            let chunk: Vec<&[f32]> = planar.iter().map(|c| &c[position..end]).collect();

            let produced = if end - position == needed {
                resampler.process(&chunk, None)
            } else {
                resampler.process_partial(Some(chunk.as_slice()), None)
            }
            .map_err(|e| DecodeError::Resample(e.to_string()))?;

            append(&mut output, produced);
            position = end;
        }

        let delay = resampler.output_delay();
        let expected = (frames as u64 * target_rate as u64 / source_rate as u64) as usize;

        // Vider le retard interne du rééchantillonneur
        while output[0].len() < delay + expected {
            let tail = resampler
                .process_partial(None::<&[Vec<f32>]>, None)
                .map_err(|e| DecodeError::Resample(e.to_string()))?;
            if tail[0].is_empty() {
                break;
            }
            append(&mut output, tail);
        }

        let mut samples = Vec::with_capacity(expected * channels);
        for frame in 0..expected {
            for channel in &output {
                samples.push(channel.get(delay + frame).copied().unwrap_or(0.0));
            }
        }

        Ok(Self {
            samples,
            format: StreamFormat::new(target_rate, self.format.channels),
        })
    }
}
