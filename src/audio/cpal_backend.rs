// Backend CPAL - chaque flux vit sur son propre thread, piloté par canaux
//
// Les `cpal::Stream` ne sont pas Send sur toutes les plateformes (CoreAudio).
// Le flux est donc construit, démarré et détruit sur un thread dédié ; le
// moteur ne manipule que des handles Send qui envoient des messages de
// contrôle.
//
// # Format Support
//
// Comme pour le moteur du synthé, le format préféré du device est détecté
// via `sample_format()` et le flux est construit pour F32, I16 ou U16. Tout
// le mixage se fait en f32, la conversion a lieu à l'écriture dans le buffer.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{
    BackendSpecificError, BuildStreamError, DefaultStreamConfigError, Device, FromSample,
    PauseStreamError, PlayStreamError, Sample, SampleFormat, SizedSample, Stream, StreamConfig,
    SupportedStreamConfig,
};
use log::{debug, error, info};
use ringbuf::traits::Producer;
use std::sync::mpsc::{Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::audio::backend::{
    AudioBackend, AudioSource, CaptureProducer, DeviceError, InputStream, OutputStream,
    StreamFormat, StreamHandle,
};
use crate::audio::device::{AudioDeviceInfo, AudioDeviceManager};
use crate::audio::format_conversion::write_sample_to_buffer;

/// Frames rendered per pass in the output callback
const SCRATCH_FRAMES: usize = 1024;

type SourceSlot = Arc<Mutex<Option<Box<dyn AudioSource>>>>;

/// Production backend on the default cpal host
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl AudioBackend for CpalBackend {
    fn output_devices(&self) -> Vec<AudioDeviceInfo> {
        AudioDeviceManager::new().list_output_devices()
    }

    fn input_devices(&self) -> Vec<AudioDeviceInfo> {
        AudioDeviceManager::new().list_input_devices()
    }

    fn open_output(&self, device: Option<usize>) -> Result<Box<dyn OutputStream>, DeviceError> {
        Ok(Box::new(CpalOutputStream::open(device)?))
    }

    fn open_input(
        &self,
        device: usize,
        requested: StreamFormat,
        producer: CaptureProducer,
    ) -> Result<Box<dyn InputStream>, DeviceError> {
        Ok(Box::new(CpalInputStream::open(device, requested, producer)?))
    }
}

enum OutputControl {
    Play(Sender<Result<(), DeviceError>>),
    Stop(Sender<Result<(), DeviceError>>),
}

pub struct CpalOutputStream {
    format: StreamFormat,
    slot: SourceSlot,
    control: Sender<OutputControl>,
    worker: Option<JoinHandle<()>>,
}

impl CpalOutputStream {
    fn open(index: Option<usize>) -> Result<Self, DeviceError> {
        let slot: SourceSlot = Arc::new(Mutex::new(None));
        let worker_slot = Arc::clone(&slot);
        let (ready_tx, ready_rx) = channel();
        let (control, control_rx) = channel::<OutputControl>();

        let worker = thread::Builder::new()
            .name("soundboard-output".to_string())
            .spawn(move || {
                let stream = match build_output(index, worker_slot) {
                    Ok((stream, format)) => {
                        let _ = ready_tx.send(Ok(format));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while let Ok(message) = control_rx.recv() {
                    match message {
                        OutputControl::Play(reply) => {
                            let _ = reply.send(stream.play().map_err(DeviceError::from));
                        }
                        OutputControl::Stop(reply) => {
                            let _ = reply.send(stream.pause().map_err(DeviceError::from));
                            break;
                        }
                    }
                }
                // Le flux est libéré ici, sur le thread qui l'a créé
                drop(stream);
            })
            .map_err(|e| DeviceError::fatal(format!("Cannot spawn output thread: {}", e)))?;

        let format = match ready_rx.recv() {
            Ok(Ok(format)) => format,
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(DeviceError::fatal("Output thread exited unexpectedly"));
            }
        };

        Ok(Self {
            format,
            slot,
            control,
            worker: Some(worker),
        })
    }

    fn request(&self, make: impl FnOnce(Sender<Result<(), DeviceError>>) -> OutputControl) -> Result<(), DeviceError> {
        let (reply_tx, reply_rx) = channel();
        self.control
            .send(make(reply_tx))
            .map_err(|_| DeviceError::fatal("Output stream is closed"))?;
        reply_rx
            .recv()
            .map_err(|_| DeviceError::fatal("Output stream is closed"))?
    }
}

impl StreamHandle for CpalOutputStream {
    fn stop(&mut self) -> Result<(), DeviceError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        let result = self.request(OutputControl::Stop);
        let _ = worker.join();
        result
    }
}

impl OutputStream for CpalOutputStream {
    fn format(&self) -> StreamFormat {
        self.format
    }

    fn start(&mut self, source: Box<dyn AudioSource>) -> Result<(), DeviceError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(source);
        self.request(OutputControl::Play)
    }
}

impl Drop for CpalOutputStream {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
    }
}

fn build_output(index: Option<usize>, slot: SourceSlot) -> Result<(Stream, StreamFormat), DeviceError> {
    let device = AudioDeviceManager::new()
        .output_device(index)
        .ok_or_else(|| DeviceError::fatal(missing_device_message("output", index)))?;

    let supported_config = device.default_output_config()?;
    let sample_format = supported_config.sample_format();
    let config: StreamConfig = supported_config.into();
    let format = StreamFormat::new(config.sample_rate.0, config.channels);

    info!(
        "Opening output '{}': {} Hz, {} channels, {:?}",
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        format.sample_rate,
        format.channels,
        sample_format
    );

    let stream = match sample_format {
        SampleFormat::F32 => build_typed_output::<f32>(&device, &config, slot),
        SampleFormat::I16 => build_typed_output::<i16>(&device, &config, slot),
        SampleFormat::U16 => build_typed_output::<u16>(&device, &config, slot),
        other => Err(unsupported_format(other)),
    }?;

    Ok((stream, format))
}

/// Build an output stream pulling from `slot` with format conversion
///
/// Silence is written until a source is installed, and whenever the slot is
/// contended.
fn build_typed_output<T>(device: &Device, config: &StreamConfig, slot: SourceSlot) -> Result<Stream, DeviceError>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    let channels = config.channels.max(1) as usize;
    let mut scratch = vec![0.0f32; SCRATCH_FRAMES * channels];

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            // ========== SACRED ZONE ==========
            // No allocations, No I/O, No blocking locks
            let Ok(mut guard) = slot.try_lock() else {
                data.fill(T::EQUILIBRIUM);
                return;
            };
            let Some(source) = guard.as_mut() else {
                data.fill(T::EQUILIBRIUM);
                return;
            };

            for chunk in data.chunks_mut(scratch.len()) {
                let rendered = &mut scratch[..chunk.len()];
                source.render(rendered);
                for (out, &sample) in chunk.iter_mut().zip(rendered.iter()) {
                    write_sample_to_buffer(sample, out);
                }
            }
            // ========== SACRED ZONE END ==========
        },
        |err| {
            error!("Audio output stream error: {}", err);
        },
        None,
    )?;

    Ok(stream)
}

pub struct CpalInputStream {
    format: StreamFormat,
    control: Sender<Sender<Result<(), DeviceError>>>,
    worker: Option<JoinHandle<()>>,
}

impl CpalInputStream {
    fn open(index: usize, requested: StreamFormat, producer: CaptureProducer) -> Result<Self, DeviceError> {
        let (ready_tx, ready_rx) = channel();
        let (control, control_rx) = channel::<Sender<Result<(), DeviceError>>>();

        let worker = thread::Builder::new()
            .name("soundboard-capture".to_string())
            .spawn(move || {
                let stream = match build_input(index, requested, producer) {
                    Ok((stream, format)) => {
                        let _ = ready_tx.send(Ok(format));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Une seule commande : l'arrêt
                if let Ok(reply) = control_rx.recv() {
                    let _ = reply.send(stream.pause().map_err(DeviceError::from));
                }
                drop(stream);
            })
            .map_err(|e| DeviceError::fatal(format!("Cannot spawn capture thread: {}", e)))?;

        let format = match ready_rx.recv() {
            Ok(Ok(format)) => format,
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(DeviceError::fatal("Capture thread exited unexpectedly"));
            }
        };

        Ok(Self {
            format,
            control,
            worker: Some(worker),
        })
    }
}

impl StreamHandle for CpalInputStream {
    fn stop(&mut self) -> Result<(), DeviceError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        let (reply_tx, reply_rx) = channel();
        let result = match self.control.send(reply_tx) {
            Ok(()) => reply_rx
                .recv()
                .unwrap_or_else(|_| Err(DeviceError::fatal("Capture stream is closed"))),
            Err(_) => Err(DeviceError::fatal("Capture stream is closed")),
        };
        let _ = worker.join();
        result
    }
}

impl InputStream for CpalInputStream {
    fn format(&self) -> StreamFormat {
        self.format
    }
}

impl Drop for CpalInputStream {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
    }
}

fn build_input(
    index: usize,
    requested: StreamFormat,
    producer: CaptureProducer,
) -> Result<(Stream, StreamFormat), DeviceError> {
    let device = AudioDeviceManager::new()
        .input_device(index)
        .ok_or_else(|| DeviceError::fatal(missing_device_message("input", Some(index))))?;

    let supported_config = choose_input_config(&device, requested)?;
    let sample_format = supported_config.sample_format();
    let config: StreamConfig = supported_config.into();
    let format = StreamFormat::new(config.sample_rate.0, config.channels);

    info!(
        "Opening microphone '{}': {} Hz, {} channels, {:?}",
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        format.sample_rate,
        format.channels,
        sample_format
    );

    let stream = match sample_format {
        SampleFormat::F32 => build_typed_input::<f32>(&device, &config, producer),
        SampleFormat::I16 => build_typed_input::<i16>(&device, &config, producer),
        SampleFormat::U16 => build_typed_input::<u16>(&device, &config, producer),
        other => Err(unsupported_format(other)),
    }?;

    stream.play()?;
    Ok((stream, format))
}

/// The requested format when the device supports it, its default otherwise
fn choose_input_config(device: &Device, requested: StreamFormat) -> Result<SupportedStreamConfig, DeviceError> {
    let matching = device.supported_input_configs().ok().and_then(|mut configs| {
        configs.find(|range| {
            range.channels() == requested.channels
                && range.min_sample_rate().0 <= requested.sample_rate
                && range.max_sample_rate().0 >= requested.sample_rate
                && matches!(
                    range.sample_format(),
                    SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
                )
        })
    });

    match matching {
        Some(range) => Ok(range.with_sample_rate(cpal::SampleRate(requested.sample_rate))),
        None => {
            debug!(
                "Microphone does not support {} Hz / {} ch, using its default config",
                requested.sample_rate, requested.channels
            );
            Ok(device.default_input_config()?)
        }
    }
}

/// Build a capture stream pushing f32 samples into the ring buffer
///
/// Samples that do not fit are dropped; the callback never waits.
fn build_typed_input<T>(device: &Device, config: &StreamConfig, mut producer: CaptureProducer) -> Result<Stream, DeviceError>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            for &sample in data {
                if producer.try_push(sample.to_sample::<f32>()).is_err() {
                    break;
                }
            }
        },
        |err| {
            error!("Audio input stream error: {}", err);
        },
        None,
    )?;

    Ok(stream)
}

fn missing_device_message(direction: &str, index: Option<usize>) -> String {
    match index {
        Some(index) => format!("No {} device at index {}", direction, index),
        None => format!("No default {} device", direction),
    }
}

fn unsupported_format(format: SampleFormat) -> DeviceError {
    DeviceError::fatal(format!(
        "Unsupported sample format: {:?}. Supported formats: F32, I16, U16",
        format
    ))
}

fn is_busy_message(err: &BackendSpecificError) -> bool {
    let description = err.description.to_lowercase();
    ["busy", "in use", "exclusive"]
        .iter()
        .any(|needle| description.contains(needle))
}

impl From<BuildStreamError> for DeviceError {
    fn from(e: BuildStreamError) -> Self {
        match &e {
            BuildStreamError::DeviceNotAvailable => DeviceError::busy(e.to_string()),
            BuildStreamError::BackendSpecific { err } if is_busy_message(err) => {
                DeviceError::busy(e.to_string())
            }
            _ => DeviceError::fatal(e.to_string()),
        }
    }
}

impl From<PlayStreamError> for DeviceError {
    fn from(e: PlayStreamError) -> Self {
        match &e {
            PlayStreamError::DeviceNotAvailable => DeviceError::busy(e.to_string()),
            PlayStreamError::BackendSpecific { err } if is_busy_message(err) => {
                DeviceError::busy(e.to_string())
            }
            _ => DeviceError::fatal(e.to_string()),
        }
    }
}

impl From<PauseStreamError> for DeviceError {
    fn from(e: PauseStreamError) -> Self {
        DeviceError::fatal(e.to_string())
    }
}

impl From<DefaultStreamConfigError> for DeviceError {
    fn from(e: DefaultStreamConfigError) -> Self {
        match &e {
            DefaultStreamConfigError::DeviceNotAvailable => DeviceError::busy(e.to_string()),
            DefaultStreamConfigError::BackendSpecific { err } if is_busy_message(err) => {
                DeviceError::busy(e.to_string())
            }
            _ => DeviceError::fatal(e.to_string()),
        }
    }
}
