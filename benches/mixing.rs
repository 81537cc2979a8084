use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use std::sync::Arc;
use warble::{constants::*, mixer, Config, InputMode, NullBackend, Voice, VoiceSettings};

pub fn mix_one_frame(c: &mut Criterion) {
    let source = utils::make_sine(MONO_FRAME_SIZE, true);
    let mut group = c.benchmark_group("Kernel");

    for chans in [1usize, 2, 6] {
        group.bench_with_input(
            BenchmarkId::new("Stereo Source", chans),
            &chans,
            |b, chans| {
                let mut acc = vec![0i32; MONO_FRAME_SIZE * chans];
                let mut out = vec![0i16; MONO_FRAME_SIZE * chans];
                b.iter(|| {
                    acc.iter_mut().for_each(|s| *s = 0);
                    black_box(mixer::mix_stereo_into(
                        black_box(&source),
                        &mut acc,
                        *chans,
                        black_box([1.0, 0.5]),
                        black_box(0.8),
                    ));
                    mixer::finish_into(&acc, &mut out, black_box(1.0));
                })
            },
        );
    }

    group.finish();
}

fn make_packets(n: usize) -> Vec<Vec<u8>> {
    let sender = Voice::new(
        Arc::new(NullBackend),
        Config::default().max_pending_bytes(usize::MAX),
        VoiceSettings {
            input_mode: InputMode::VoiceActivity,
            ..Default::default()
        },
    );
    sender.init().unwrap();

    let mut out = vec![];
    for _ in 0..n {
        sender.read_audio_data(&utils::to_le_bytes(&utils::make_sine(MONO_FRAME_SIZE, false)));
        sender.update(None);
        let mut packet = vec![];
        sender.send(&mut packet, 4096);
        out.push(packet);
    }

    out
}

pub fn mix_speakers(c: &mut Criterion) {
    let packets = make_packets(4);
    let mut group = c.benchmark_group("Engine");

    for n_speakers in [1u16, 4, 16] {
        group.bench_with_input(
            BenchmarkId::new("Active Speakers", n_speakers),
            &n_speakers,
            |b, n_speakers| {
                b.iter_batched_ref(
                    || {
                        let voice =
                            Voice::new(Arc::new(NullBackend), Config::default(), Default::default());
                        voice.init().unwrap();
                        for id in 0..*n_speakers {
                            let speaker = voice.speaker(id.into()).unwrap();
                            for p in &packets {
                                voice.receive(&speaker, p).unwrap();
                            }
                        }
                        (voice, vec![0i16; STEREO_FRAME_SIZE])
                    },
                    |(voice, buf)| {
                        voice.mix(black_box(buf), MONO_FRAME_SIZE, 2);
                    },
                    BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

criterion_group!(benches, mix_one_frame, mix_speakers);
criterion_main!(benches);
