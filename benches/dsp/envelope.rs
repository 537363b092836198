//! Benchmarks for the ADSR envelope generator.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use crushkeys::dsp::{AdsrShape, Envelope};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn render(env: &mut Envelope, buffer: &mut [f32]) {
    for sample in buffer.iter_mut() {
        *sample = env.next_sample();
    }
}

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Attack phase (ramping up)
        let mut env = Envelope::with_shape(SAMPLE_RATE, AdsrShape::new(10.0, 0.1, 0.7, 0.3));
        env.note_on();
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| render(&mut env, black_box(&mut buffer)))
        });

        // Sustain phase (holding steady)
        let mut env = Envelope::with_shape(SAMPLE_RATE, AdsrShape::new(0.001, 0.001, 0.7, 0.3));
        env.note_on();
        for _ in 0..200 {
            env.next_sample();
        }
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| render(&mut env, black_box(&mut buffer)))
        });

        // Gate fed every sample, the way the renderer drives it
        let mut env = Envelope::with_shape(SAMPLE_RATE, AdsrShape::new(0.01, 0.1, 0.7, 0.3));
        group.bench_with_input(BenchmarkId::new("gated", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    env.set_gate(black_box(true));
                    *sample = env.next_sample();
                }
            })
        });
    }

    group.finish();
}
