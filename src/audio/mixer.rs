// Mixeur logiciel - au plus un micro et un clip, lu par le callback de sortie

use std::sync::{Arc, Mutex, PoisonError};

use crate::audio::backend::{AudioSource, StreamFormat};
use crate::audio::source::{ClipSource, MicInput};

pub type SharedMixer = Arc<Mutex<Mixer>>;

/// Below this level samples pass through untouched
const SOFT_CLIP_KNEE: f32 = 0.8;

/// Flush denormals to zero (anti-dénormaux)
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < 1e-15 { 0.0 } else { x }
}

/// Saturation douce au-dessus du genou, linéaire en dessous
///
/// Output stays within (-1, 1) whatever the input, and is continuous at the
/// knee.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    let magnitude = x.abs();
    if magnitude <= SOFT_CLIP_KNEE {
        return x;
    }
    let headroom = 1.0 - SOFT_CLIP_KNEE;
    let shaped = SOFT_CLIP_KNEE + headroom * ((magnitude - SOFT_CLIP_KNEE) / headroom).tanh();
    shaped.copysign(x)
}

/// Mix of the live microphone and the current clip
///
/// Holds at most one microphone input and one clip input; installing a clip
/// replaces the previous one. A finished clip stays in its slot (rendering
/// nothing) until the next `set_clip` or `clear_clip`, so the real-time
/// thread never frees its buffer.
pub struct Mixer {
    format: StreamFormat,
    microphone: Option<MicInput>,
    clip: Option<ClipSource>,
}

impl Mixer {
    pub fn new(format: StreamFormat) -> Self {
        Self {
            format,
            microphone: None,
            clip: None,
        }
    }

    pub fn shared(format: StreamFormat) -> SharedMixer {
        Arc::new(Mutex::new(Self::new(format)))
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn set_microphone(&mut self, microphone: MicInput) {
        self.microphone = Some(microphone);
    }

    /// Replace the current clip, returning the previous one
    pub fn set_clip(&mut self, clip: ClipSource) -> Option<ClipSource> {
        self.clip.replace(clip)
    }

    pub fn clear_clip(&mut self) -> Option<ClipSource> {
        self.clip.take()
    }

    pub fn has_microphone(&self) -> bool {
        self.microphone.is_some()
    }

    pub fn has_clip(&self) -> bool {
        self.clip.as_ref().is_some_and(|clip| !clip.is_finished())
    }

    /// Number of live inputs: microphone plus unfinished clip
    pub fn input_count(&self) -> usize {
        usize::from(self.has_microphone()) + usize::from(self.has_clip())
    }
}

impl AudioSource for Mixer {
    fn render(&mut self, out: &mut [f32]) -> usize {
        out.fill(0.0);

        let mut frames = 0;
        if let Some(microphone) = self.microphone.as_mut() {
            frames = frames.max(microphone.mix_into(out));
        }
        if let Some(clip) = self.clip.as_mut() {
            frames = frames.max(clip.mix_into(out));
        }

        for sample in out.iter_mut() {
            *sample = soft_clip(flush_denormals_to_zero(*sample));
        }
        frames
    }
}

/// Output-callback view of a [`SharedMixer`]
///
/// Uses `try_lock` only: when the engine holds the mixer the callback writes
/// silence instead of waiting.
pub struct MixerSource {
    mixer: SharedMixer,
}

impl MixerSource {
    pub fn new(mixer: SharedMixer) -> Self {
        Self { mixer }
    }
}

impl AudioSource for MixerSource {
    fn render(&mut self, out: &mut [f32]) -> usize {
        match self.mixer.try_lock() {
            Ok(mut mixer) => mixer.render(out),
            Err(std::sync::TryLockError::Poisoned(poisoned)) => poisoned.into_inner().render(out),
            Err(std::sync::TryLockError::WouldBlock) => {
                out.fill(0.0);
                0
            }
        }
    }
}

/// Lock a shared mixer from a non real-time thread
pub fn lock_mixer(mixer: &SharedMixer) -> std::sync::MutexGuard<'_, Mixer> {
    mixer.lock().unwrap_or_else(PoisonError::into_inner)
}
