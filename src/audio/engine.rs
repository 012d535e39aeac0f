// Moteur audio - lecture des clips, session micro et sélection des périphériques
//
// Tout l'état vit derrière un seul verrou : `play`, `stop` et les changements
// de périphérique sont sérialisés. Un second `play` attend que le premier ait
// terminé sa boucle de tentatives.
//
// # Sessions
//
// - Sans micro : chaque clip obtient son propre flux de sortie.
// - Avec micro : le flux de capture alimente un ring buffer lu par un mixeur
//   partagé, joué en continu sur un flux de sortie dédié (monitoring). Les
//   clips sont alors injectés dans ce mixeur au lieu d'ouvrir un flux.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use ringbuf::HeapRb;
use ringbuf::traits::Split;

use crate::audio::backend::{
    AudioBackend, DeviceError, InputStream, OutputStream, StreamFormat, release_best_effort,
};
use crate::audio::decoder::{AudioClip, DecodeError};
use crate::audio::device::AudioDeviceInfo;
use crate::audio::mixer::{Mixer, MixerSource, SharedMixer, lock_mixer};
use crate::audio::retry::RetryPolicy;
use crate::audio::source::{ClipSource, MicInput};
use crate::paths::PathResolver;

/// Format requested from the microphone; the device default is used otherwise
pub const MICROPHONE_FORMAT: StreamFormat = StreamFormat::new(48000, 1);

/// Capture ring buffer length in milliseconds
const CAPTURE_BUFFER_MS: usize = 200;

/// Sized for up to two channels at the requested rate
const CAPTURE_BUFFER_SAMPLES: usize =
    MICROPHONE_FORMAT.sample_rate as usize * 2 * CAPTURE_BUFFER_MS / 1000;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Audio device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Cannot read audio file: {0}")]
    Decode(#[from] DecodeError),
}

impl EngineError {
    /// Device contention worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Device(e) if e.is_transient())
    }
}

struct MicrophoneSession {
    device: usize,
    capture: Box<dyn InputStream>,
    mixer: SharedMixer,
    monitor: Box<dyn OutputStream>,
}

enum PlaybackSession {
    /// Clip on its own output stream
    Dedicated {
        stream: Box<dyn OutputStream>,
        playing: Arc<AtomicBool>,
    },
    /// Clip routed into the microphone mixer
    Mixed { playing: Arc<AtomicBool> },
}

impl PlaybackSession {
    fn is_playing(&self) -> bool {
        match self {
            Self::Dedicated { playing, .. } | Self::Mixed { playing } => {
                playing.load(Ordering::Acquire)
            }
        }
    }
}

#[derive(Default)]
struct EngineState {
    output_device: Option<usize>,
    microphone: Option<MicrophoneSession>,
    playback: Option<PlaybackSession>,
}

/// Soundboard playback engine
///
/// Owns every device handle it opens. Dropping the engine releases them.
pub struct SoundEngine {
    backend: Arc<dyn AudioBackend>,
    resolver: PathResolver,
    retry: RetryPolicy,
    state: Mutex<EngineState>,
}

impl SoundEngine {
    pub fn new(backend: Arc<dyn AudioBackend>, resolver: PathResolver) -> Self {
        Self {
            backend,
            resolver,
            retry: RetryPolicy::default(),
            state: Mutex::new(EngineState::default()),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn output_devices(&self) -> Vec<AudioDeviceInfo> {
        self.backend.output_devices()
    }

    pub fn input_devices(&self) -> Vec<AudioDeviceInfo> {
        self.backend.input_devices()
    }

    /// Selected output device, `None` = system default
    pub fn output_device(&self) -> Option<usize> {
        self.lock().output_device
    }

    /// Device of the running microphone session, if any
    pub fn microphone_device(&self) -> Option<usize> {
        self.lock().microphone.as_ref().map(|m| m.device)
    }

    /// Select the output device for the next playback
    ///
    /// A running microphone session is reopened on the new device.
    pub fn set_output_device(&self, device: Option<usize>) {
        let mut state = self.lock();
        state.output_device = device;
        info!("Output device set to {:?}", device);

        if let Some(microphone) = state.microphone.as_ref().map(|m| m.device) {
            self.teardown_microphone(&mut state);
            self.start_microphone(&mut state, microphone);
        }
    }

    /// Replace the microphone session; `None` disables the microphone
    ///
    /// Opening failures leave the engine without microphone.
    pub fn set_microphone_device(&self, device: Option<usize>) {
        let mut state = self.lock();
        self.teardown_microphone(&mut state);

        if let Some(device) = device {
            self.start_microphone(&mut state, device);
        }
    }

    fn start_microphone(&self, state: &mut EngineState, device: usize) {
        match self.open_microphone(state.output_device, device) {
            Ok(session) => {
                info!("Microphone {} mixed into the output", device);
                state.microphone = Some(session);
            }
            Err(e) => warn!("Microphone {} unavailable, continuing without it: {}", device, e),
        }
    }

    fn open_microphone(
        &self,
        output_device: Option<usize>,
        device: usize,
    ) -> Result<MicrophoneSession, DeviceError> {
        let (producer, consumer) = HeapRb::<f32>::new(CAPTURE_BUFFER_SAMPLES).split();

        let capture = self.backend.open_input(device, MICROPHONE_FORMAT, producer)?;

        let mut monitor = match self.backend.open_output(output_device) {
            Ok(monitor) => monitor,
            Err(e) => {
                release_best_effort(capture);
                return Err(e);
            }
        };

        let mixer = Mixer::shared(monitor.format());
        lock_mixer(&mixer).set_microphone(MicInput::new(consumer, capture.format(), monitor.format()));

        if let Err(e) = monitor.start(Box::new(MixerSource::new(Arc::clone(&mixer)))) {
            release_best_effort(monitor);
            release_best_effort(capture);
            return Err(e);
        }

        Ok(MicrophoneSession {
            device,
            capture,
            mixer,
            monitor,
        })
    }

    fn teardown_microphone(&self, state: &mut EngineState) {
        let Some(session) = state.microphone.take() else {
            return;
        };

        // Le clip vivait dans le mixeur du micro
        if matches!(state.playback, Some(PlaybackSession::Mixed { .. })) {
            state.playback = None;
        }

        release_best_effort(session.monitor);
        release_best_effort(session.capture);
        debug!("Microphone {} released", session.device);
    }

    /// Play the file at `path`, replacing the current clip
    ///
    /// A path that does not resolve to an existing file is silently ignored.
    /// Busy devices are retried with the configured backoff; any other
    /// failure, or running out of attempts, is returned.
    pub fn play(&self, path: &str) -> Result<(), EngineError> {
        let resolved = self.resolver.resolve(path);
        if path.is_empty() || !resolved.is_file() {
            info!("Ignoring play request, file not found: {}", resolved.display());
            return Ok(());
        }

        let mut state = self.lock();
        let mut attempt = 0;
        loop {
            self.stop_locked(&mut state);

            let delay = self.retry.delay_before(attempt);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }

            match self.start_attempt(&mut state, &resolved) {
                Ok(()) => {
                    debug!("Playing {} (attempt {})", resolved.display(), attempt + 1);
                    return Ok(());
                }
                Err(e) if e.is_transient() && self.retry.should_retry(attempt) => {
                    warn!(
                        "Output busy on attempt {}/{}: {}",
                        attempt + 1,
                        self.retry.max_attempts(),
                        e
                    );
                    attempt += 1;
                }
                Err(e) => {
                    warn!("Cannot play {}: {}", resolved.display(), e);
                    return Err(e);
                }
            }
        }
    }

    fn start_attempt(&self, state: &mut EngineState, path: &Path) -> Result<(), EngineError> {
        let clip = AudioClip::open(path)?;

        if let Some(microphone) = state.microphone.as_ref() {
            let format = lock_mixer(&microphone.mixer).format();
            let source = ClipSource::new(clip, format)?;
            let playing = source.playing_flag();

            // Previous clip is freed here, outside the mixer lock
            let previous = lock_mixer(&microphone.mixer).set_clip(source);
            drop(previous);

            state.playback = Some(PlaybackSession::Mixed { playing });
            return Ok(());
        }

        let mut stream = self.backend.open_output(state.output_device)?;
        let source = match ClipSource::new(clip, stream.format()) {
            Ok(source) => source,
            Err(e) => {
                release_best_effort(stream);
                return Err(e.into());
            }
        };
        let playing = source.playing_flag();

        if let Err(e) = stream.start(Box::new(source)) {
            release_best_effort(stream);
            return Err(e.into());
        }

        state.playback = Some(PlaybackSession::Dedicated { stream, playing });
        Ok(())
    }

    /// Stop the current clip; the microphone keeps running
    pub fn stop(&self) {
        let mut state = self.lock();
        self.stop_locked(&mut state);
    }

    fn stop_locked(&self, state: &mut EngineState) {
        if let Some(PlaybackSession::Dedicated { stream, .. }) = state.playback.take() {
            release_best_effort(stream);
        }

        if let Some(microphone) = state.microphone.as_ref() {
            let previous = lock_mixer(&microphone.mixer).clear_clip();
            drop(previous);
        }
    }

    /// Whether the current clip still has audio left to play
    pub fn is_playing(&self) -> bool {
        self.lock()
            .playback
            .as_ref()
            .is_some_and(PlaybackSession::is_playing)
    }

    /// Live inputs of the microphone mixer, `None` without microphone session
    pub fn mixer_input_count(&self) -> Option<usize> {
        self.lock()
            .microphone
            .as_ref()
            .map(|m| lock_mixer(&m.mixer).input_count())
    }

    /// Release every stream; the engine stays usable afterwards
    pub fn dispose(&self) {
        let mut state = self.lock();
        self.stop_locked(&mut state);
        self.teardown_microphone(&mut state);
    }
}

impl Drop for SoundEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}
