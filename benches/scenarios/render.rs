//! Benchmarks for rendering held chords through the graph interpreter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use crushkeys::{build_graph, engine::{GraphCompiler, GraphRenderer}, PitchTable, VoiceParams};

use super::{chord, CHORD_SIZES};
use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/render");
    let table = PitchTable::qwerty();
    let mut params = VoiceParams::default();
    params.set_bit_depth(6);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for &keys in CHORD_SIZES {
            let graph = build_graph(&table, chord(&table, keys).state(), &params);
            let mut renderer = GraphRenderer::new(SAMPLE_RATE);
            renderer.install(GraphCompiler::new(SAMPLE_RATE).compile(&graph));

            group.bench_with_input(
                BenchmarkId::new(format!("{keys}_keys"), size),
                &size,
                |b, _| b.iter(|| renderer.render(black_box(&mut buffer))),
            );
        }
    }

    group.finish();
}
