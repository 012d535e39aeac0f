// Abstraction du backend audio - périphériques, flux et classification des erreurs

use crate::audio::device::AudioDeviceInfo;
use log::warn;

/// Interleaved stream format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamFormat {
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }
}

/// How a device failure should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    /// The device is held by someone else; worth retrying shortly
    Busy,
    Fatal,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct DeviceError {
    pub kind: DeviceErrorKind,
    pub message: String,
}

impl DeviceError {
    pub fn busy(message: impl Into<String>) -> Self {
        Self {
            kind: DeviceErrorKind::Busy,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: DeviceErrorKind::Fatal,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == DeviceErrorKind::Busy
    }
}

/// Pull-based producer of interleaved f32 audio
///
/// Runs on the real-time thread: no allocation, no blocking.
pub trait AudioSource: Send {
    /// Overwrite all of `out` and return how many frames carried real audio
    fn render(&mut self, out: &mut [f32]) -> usize;
}

pub trait StreamHandle: Send {
    fn stop(&mut self) -> Result<(), DeviceError>;
}

/// Opened but not yet started output stream
pub trait OutputStream: StreamHandle {
    fn format(&self) -> StreamFormat;
    fn start(&mut self, source: Box<dyn AudioSource>) -> Result<(), DeviceError>;
}

/// Running capture stream feeding a ring buffer
pub trait InputStream: StreamHandle {
    fn format(&self) -> StreamFormat;
}

pub type CaptureProducer = ringbuf::HeapProd<f32>;
pub type CaptureConsumer = ringbuf::HeapCons<f32>;

/// Hardware seam of the engine
///
/// Device indices refer to the order of [`AudioBackend::output_devices`] and
/// [`AudioBackend::input_devices`]. Implementations classify failures as
/// [`DeviceErrorKind::Busy`] or [`DeviceErrorKind::Fatal`].
pub trait AudioBackend: Send + Sync {
    fn output_devices(&self) -> Vec<AudioDeviceInfo>;
    fn input_devices(&self) -> Vec<AudioDeviceInfo>;

    /// Open an output stream on `device`, or on the system default when `None`
    fn open_output(&self, device: Option<usize>) -> Result<Box<dyn OutputStream>, DeviceError>;

    /// Open and start a capture stream pushing interleaved samples into `producer`
    ///
    /// `requested` is a preference; the returned stream reports the format
    /// actually used.
    fn open_input(
        &self,
        device: usize,
        requested: StreamFormat,
        producer: CaptureProducer,
    ) -> Result<Box<dyn InputStream>, DeviceError>;
}

/// Stop `stream`, logging instead of propagating a teardown failure
pub fn release_best_effort<S: StreamHandle + ?Sized>(mut stream: Box<S>) {
    if let Err(e) = stream.stop() {
        warn!("Ignoring error while releasing audio stream: {}", e);
    }
}
