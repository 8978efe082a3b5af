use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use meditone::audio::{AudioBuffer, decode_wav, encode_wav};
use meditone::defaults::SAMPLE_RATE;
use meditone::pipeline::assemble_buffers;
use meditone::script::parse_script;
use std::hint::black_box;

/// Script with one cue every `spacing` seconds.
fn build_script(segments: usize, spacing: u32) -> String {
    (0..segments)
        .map(|i| {
            let offset = i as u32 * spacing;
            format!("[{:02}:{:02}] Breathe slowly, cue {i}.\n", offset / 60, offset % 60)
        })
        .collect()
}

/// Speech buffer of `secs` seconds with a non-zero ramp.
fn speech(secs: f64) -> AudioBuffer {
    let len = (secs * SAMPLE_RATE as f64) as usize;
    AudioBuffer::from_samples((0..len).map(|i| (i % 2000) as i16 - 1000).collect())
}

fn bench_parse(c: &mut Criterion) {
    let script = build_script(200, 15);
    c.bench_function("parse_script_200_cues", |b| {
        b.iter(|| parse_script(black_box(&script)))
    });
}

fn bench_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble_buffers");

    for &count in &[5usize, 20, 60] {
        let script = build_script(count, 20);
        let Ok(segments) = parse_script(&script) else {
            continue;
        };
        let buffers: Vec<AudioBuffer> = (0..count).map(|i| speech(4.0 + i as f64 % 3.0)).collect();
        let total_samples: usize = buffers.iter().map(AudioBuffer::len).sum();
        group.throughput(Throughput::Elements(total_samples as u64));

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| assemble_buffers(black_box(&segments), buffers.clone()))
        });
    }

    group.finish();
}

fn bench_wav_codec(c: &mut Criterion) {
    let buffer = speech(60.0);
    let Ok(encoded) = encode_wav(&buffer) else {
        return;
    };

    let mut group = c.benchmark_group("wav_codec_60s");
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("encode", |b| b.iter(|| encode_wav(black_box(&buffer))));
    group.bench_function("decode", |b| {
        b.iter(|| decode_wav(black_box(encoded.as_slice()), "bench"))
    });
    group.finish();
}

criterion_group!(benches, bench_parse, bench_assemble, bench_wav_codec);
criterion_main!(benches);
