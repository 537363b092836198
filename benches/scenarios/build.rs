//! Benchmarks for graph construction.

use std::hint::black_box;

use criterion::{BatchSize, BenchmarkId, Criterion};
use crushkeys::{build_graph, engine::{GraphCompiler, GraphRenderer}, PitchTable, VoiceParams};

use super::{chord, CHORD_SIZES};
use crate::SAMPLE_RATE;

pub fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/build");
    let table = PitchTable::qwerty();
    let params = VoiceParams::default();

    for &keys in CHORD_SIZES {
        let tracker = chord(&table, keys);

        group.bench_with_input(BenchmarkId::new("build_graph", keys), &keys, |b, _| {
            b.iter(|| build_graph(black_box(&table), black_box(tracker.state()), black_box(&params)))
        });

        // Recompile against the previous program, as on every parameter change
        let graph = build_graph(&table, tracker.state(), &params);
        let mut compiler = GraphCompiler::new(SAMPLE_RATE);
        compiler.compile(&graph);
        group.bench_with_input(BenchmarkId::new("compile", keys), &keys, |b, _| {
            b.iter(|| compiler.compile(black_box(&graph)))
        });

        // Install cost on the audio side
        let mut renderer = GraphRenderer::new(SAMPLE_RATE);
        group.bench_with_input(BenchmarkId::new("install", keys), &keys, |b, _| {
            b.iter_batched(
                || compiler.compile(&graph),
                |program| renderer.install(black_box(program)),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}
