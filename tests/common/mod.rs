// Shared fixtures for integration tests: scripted audio backend and WAV files
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use soundboard::audio::backend::{
    AudioBackend, AudioSource, CaptureProducer, DeviceError, InputStream, OutputStream,
    StreamFormat, StreamHandle,
};
use soundboard::audio::device::AudioDeviceInfo;

pub const FAKE_OUTPUT_FORMAT: StreamFormat = StreamFormat::new(48000, 2);

#[derive(Default)]
struct FakeState {
    output_script: VecDeque<DeviceError>,
    always_busy: bool,
    input_error: Option<DeviceError>,
    output_opens: Vec<Instant>,
    input_opens: usize,
    live_outputs: usize,
    live_inputs: usize,
    started_outputs: usize,
}

/// Audio backend answering from a script instead of hardware
///
/// Clones share the same state, so a test keeps one handle to inspect what
/// the engine did with the other.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Fail the next output opens with these errors, then succeed
    pub fn script_outputs(&self, errors: impl IntoIterator<Item = DeviceError>) {
        self.lock().output_script.extend(errors);
    }

    pub fn set_always_busy(&self, busy: bool) {
        self.lock().always_busy = busy;
    }

    pub fn fail_inputs(&self, error: DeviceError) {
        self.lock().input_error = Some(error);
    }

    pub fn output_opens(&self) -> usize {
        self.lock().output_opens.len()
    }

    pub fn output_open_times(&self) -> Vec<Instant> {
        self.lock().output_opens.clone()
    }

    pub fn input_opens(&self) -> usize {
        self.lock().input_opens
    }

    /// Output streams opened and not yet released
    pub fn live_outputs(&self) -> usize {
        self.lock().live_outputs
    }

    pub fn live_inputs(&self) -> usize {
        self.lock().live_inputs
    }

    pub fn started_outputs(&self) -> usize {
        self.lock().started_outputs
    }
}

impl AudioBackend for FakeBackend {
    fn output_devices(&self) -> Vec<AudioDeviceInfo> {
        vec![
            AudioDeviceInfo {
                index: 0,
                name: "Speakers".to_string(),
                is_default: true,
            },
            AudioDeviceInfo {
                index: 1,
                name: "Virtual Cable".to_string(),
                is_default: false,
            },
        ]
    }

    fn input_devices(&self) -> Vec<AudioDeviceInfo> {
        vec![AudioDeviceInfo {
            index: 0,
            name: "Microphone".to_string(),
            is_default: true,
        }]
    }

    fn open_output(&self, _device: Option<usize>) -> Result<Box<dyn OutputStream>, DeviceError> {
        let mut state = self.lock();
        state.output_opens.push(Instant::now());

        if state.always_busy {
            return Err(DeviceError::busy("device in use"));
        }
        if let Some(error) = state.output_script.pop_front() {
            return Err(error);
        }

        state.live_outputs += 1;
        Ok(Box::new(FakeOutputStream {
            state: Arc::clone(&self.state),
            source: None,
            released: false,
        }))
    }

    fn open_input(
        &self,
        _device: usize,
        requested: StreamFormat,
        producer: CaptureProducer,
    ) -> Result<Box<dyn InputStream>, DeviceError> {
        let mut state = self.lock();
        state.input_opens += 1;

        if let Some(error) = state.input_error.clone() {
            return Err(error);
        }

        state.live_inputs += 1;
        Ok(Box::new(FakeInputStream {
            state: Arc::clone(&self.state),
            format: requested,
            _producer: producer,
            released: false,
        }))
    }
}

struct FakeOutputStream {
    state: Arc<Mutex<FakeState>>,
    source: Option<Box<dyn AudioSource>>,
    released: bool,
}

impl FakeOutputStream {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.source = None;
            self.state.lock().unwrap().live_outputs -= 1;
        }
    }
}

impl StreamHandle for FakeOutputStream {
    fn stop(&mut self) -> Result<(), DeviceError> {
        self.release();
        Ok(())
    }
}

impl OutputStream for FakeOutputStream {
    fn format(&self) -> StreamFormat {
        FAKE_OUTPUT_FORMAT
    }

    fn start(&mut self, source: Box<dyn AudioSource>) -> Result<(), DeviceError> {
        self.source = Some(source);
        self.state.lock().unwrap().started_outputs += 1;
        Ok(())
    }
}

impl Drop for FakeOutputStream {
    fn drop(&mut self) {
        self.release();
    }
}

struct FakeInputStream {
    state: Arc<Mutex<FakeState>>,
    format: StreamFormat,
    _producer: CaptureProducer,
    released: bool,
}

impl FakeInputStream {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.state.lock().unwrap().live_inputs -= 1;
        }
    }
}

impl StreamHandle for FakeInputStream {
    fn stop(&mut self) -> Result<(), DeviceError> {
        self.release();
        Ok(())
    }
}

impl InputStream for FakeInputStream {
    fn format(&self) -> StreamFormat {
        self.format
    }
}

impl Drop for FakeInputStream {
    fn drop(&mut self) {
        self.release();
    }
}

/// Write a short mono sine tone and return its path
pub fn write_tone(dir: &Path, name: &str, sample_rate: u32, frames: usize) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let sample = (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5;
        writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
    path
}
