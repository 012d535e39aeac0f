use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ringbuf::HeapRb;
use ringbuf::traits::{Producer, Split};
use soundboard::StreamFormat;
use soundboard::audio::backend::AudioSource;
use soundboard::audio::decoder::AudioClip;
use soundboard::audio::format_conversion::LinearResampler;
use soundboard::audio::mixer::{Mixer, soft_clip};
use soundboard::audio::source::{ClipSource, MicInput};

const OUTPUT: StreamFormat = StreamFormat::new(48000, 2);

fn long_clip() -> ClipSource {
    let samples: Vec<f32> = (0..48000 * 10)
        .map(|i| (i as f32 * 0.01).sin() * 0.5)
        .collect();
    ClipSource::new(AudioClip::new(samples, StreamFormat::new(48000, 1)), OUTPUT).unwrap()
}

/// Benchmark the full mixing stage: microphone + clip + soft clip
fn bench_mixer_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixer");

    for buffer_frames in [128usize, 512, 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(buffer_frames),
            &buffer_frames,
            |b, &frames| {
                let (mut producer, consumer) = HeapRb::<f32>::new(frames * 64).split();
                let mut mixer = Mixer::new(OUTPUT);
                mixer.set_microphone(MicInput::new(consumer, StreamFormat::new(44100, 1), OUTPUT));
                mixer.set_clip(long_clip());
                let mut out = vec![0.0f32; frames * OUTPUT.channels as usize];

                b.iter(|| {
                    // Keep the capture side fed like a running microphone
                    for i in 0..frames {
                        let _ = producer.try_push((i as f32 * 0.02).sin() * 0.3);
                    }
                    black_box(mixer.render(&mut out));
                    if !mixer.has_clip() {
                        mixer.set_clip(long_clip());
                    }
                });
            },
        );
    }

    group.finish();
}

/// Benchmark the live-feed resampler alone
fn bench_linear_resampler(c: &mut Criterion) {
    c.bench_function("linear_resampler_44k_to_48k_512", |b| {
        let mut resampler = LinearResampler::new(44100, 48000);
        let mut phase = 0.0f32;

        b.iter(|| {
            for _ in 0..512 {
                let sample = resampler.next_sample(|| {
                    phase += 0.01;
                    Some(phase.sin())
                });
                black_box(sample);
            }
        });
    });
}

fn bench_soft_clip(c: &mut Criterion) {
    let input: Vec<f32> = (0..1024).map(|i| (i as f32 / 512.0) - 1.0).map(|x| x * 1.5).collect();

    c.bench_function("soft_clip_1024", |b| {
        b.iter(|| {
            for &x in &input {
                black_box(soft_clip(black_box(x)));
            }
        });
    });
}

criterion_group!(benches, bench_mixer_render, bench_linear_resampler, bench_soft_clip);
criterion_main!(benches);
