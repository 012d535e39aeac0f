mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeBackend, write_tone};
use soundboard::audio::backend::DeviceError;
use soundboard::{PathResolver, RetryPolicy, SoundEngine};
use tempfile::{TempDir, tempdir};

const STEP: Duration = Duration::from_millis(20);

fn engine_with(backend: &FakeBackend, dir: &TempDir) -> SoundEngine {
    SoundEngine::new(Arc::new(backend.clone()), PathResolver::new(dir.path()))
        .with_retry_policy(RetryPolicy::new(3, STEP))
}

#[test]
fn test_busy_device_is_retried_until_it_opens() {
    let dir = tempdir().unwrap();
    write_tone(dir.path(), "horn.wav", 48000, 4800);
    let backend = FakeBackend::new();
    backend.script_outputs([DeviceError::busy("in use"), DeviceError::busy("in use")]);
    let engine = engine_with(&backend, &dir);

    engine.play("horn.wav").unwrap();

    assert_eq!(backend.output_opens(), 3);
    assert_eq!(backend.live_outputs(), 1);
    assert!(engine.is_playing());

    // Linear backoff: each wait is longer than the previous one
    let times = backend.output_open_times();
    assert!(times[1] - times[0] >= STEP);
    assert!(times[2] - times[1] >= STEP * 2);
}

#[test]
fn test_always_busy_gives_up_after_three_attempts() {
    let dir = tempdir().unwrap();
    write_tone(dir.path(), "horn.wav", 48000, 4800);
    let backend = FakeBackend::new();
    backend.set_always_busy(true);
    let engine = engine_with(&backend, &dir);

    let err = engine.play("horn.wav").unwrap_err();

    assert!(err.is_transient());
    assert_eq!(backend.output_opens(), 3);
    assert_eq!(backend.live_outputs(), 0);
    assert!(!engine.is_playing());
}

#[test]
fn test_fatal_error_is_not_retried() {
    let dir = tempdir().unwrap();
    write_tone(dir.path(), "horn.wav", 48000, 4800);
    let backend = FakeBackend::new();
    backend.script_outputs([DeviceError::fatal("device unplugged")]);
    let engine = engine_with(&backend, &dir);

    assert!(engine.play("horn.wav").is_err());
    assert_eq!(backend.output_opens(), 1);
    assert_eq!(backend.live_outputs(), 0);
}

#[test]
fn test_missing_file_is_ignored() {
    let dir = tempdir().unwrap();
    let backend = FakeBackend::new();
    let engine = engine_with(&backend, &dir);

    engine.play("does_not_exist.wav").unwrap();
    engine.play("").unwrap();

    assert_eq!(backend.output_opens(), 0);
    assert!(!engine.is_playing());
}

#[test]
fn test_new_clip_replaces_previous_stream() {
    let dir = tempdir().unwrap();
    write_tone(dir.path(), "a.wav", 48000, 4800);
    write_tone(dir.path(), "b.wav", 44100, 4410);
    let backend = FakeBackend::new();
    let engine = engine_with(&backend, &dir);

    engine.play("a.wav").unwrap();
    engine.play("b.wav").unwrap();

    assert_eq!(backend.output_opens(), 2);
    assert_eq!(backend.live_outputs(), 1);

    engine.stop();
    assert_eq!(backend.live_outputs(), 0);
    assert!(!engine.is_playing());
}

#[test]
fn test_microphone_mixer_holds_at_most_one_clip() {
    let dir = tempdir().unwrap();
    write_tone(dir.path(), "a.wav", 48000, 4800);
    write_tone(dir.path(), "b.wav", 48000, 4800);
    let backend = FakeBackend::new();
    let engine = engine_with(&backend, &dir);

    engine.set_microphone_device(Some(0));
    assert_eq!(engine.microphone_device(), Some(0));
    assert_eq!(engine.mixer_input_count(), Some(1));

    engine.play("a.wav").unwrap();
    engine.play("b.wav").unwrap();

    assert_eq!(engine.mixer_input_count(), Some(2));
    // Clips go through the monitor stream, no extra output is opened
    assert_eq!(backend.output_opens(), 1);
    assert_eq!(backend.live_outputs(), 1);

    engine.stop();
    assert_eq!(engine.mixer_input_count(), Some(1));
}

#[test]
fn test_microphone_failure_leaves_engine_without_microphone() {
    let dir = tempdir().unwrap();
    write_tone(dir.path(), "horn.wav", 48000, 4800);
    let backend = FakeBackend::new();
    backend.fail_inputs(DeviceError::fatal("no capture device"));
    let engine = engine_with(&backend, &dir);

    engine.set_microphone_device(Some(0));

    assert_eq!(engine.microphone_device(), None);
    assert_eq!(engine.mixer_input_count(), None);
    assert_eq!(backend.live_inputs(), 0);

    // Playback falls back to a dedicated stream
    engine.play("horn.wav").unwrap();
    assert_eq!(backend.live_outputs(), 1);
}

#[test]
fn test_monitor_failure_releases_capture() {
    let dir = tempdir().unwrap();
    let backend = FakeBackend::new();
    backend.script_outputs([DeviceError::fatal("output gone")]);
    let engine = engine_with(&backend, &dir);

    engine.set_microphone_device(Some(0));

    assert_eq!(engine.microphone_device(), None);
    assert_eq!(backend.input_opens(), 1);
    assert_eq!(backend.live_inputs(), 0);
    assert_eq!(backend.live_outputs(), 0);
}

#[test]
fn test_output_change_reopens_microphone() {
    let dir = tempdir().unwrap();
    let backend = FakeBackend::new();
    let engine = engine_with(&backend, &dir);

    engine.set_microphone_device(Some(0));
    engine.set_output_device(Some(1));

    assert_eq!(engine.output_device(), Some(1));
    assert_eq!(engine.microphone_device(), Some(0));
    assert_eq!(backend.input_opens(), 2);
    assert_eq!(backend.live_inputs(), 1);
    assert_eq!(backend.live_outputs(), 1);
}

#[test]
fn test_dispose_releases_every_stream() {
    let dir = tempdir().unwrap();
    write_tone(dir.path(), "horn.wav", 48000, 4800);
    let backend = FakeBackend::new();
    let engine = engine_with(&backend, &dir);

    engine.set_microphone_device(Some(0));
    engine.play("horn.wav").unwrap();
    engine.dispose();

    assert_eq!(backend.live_inputs(), 0);
    assert_eq!(backend.live_outputs(), 0);
    assert_eq!(engine.microphone_device(), None);
    assert!(!engine.is_playing());
}
