use crate::{
    dispatch::RenderEngine,
    engine::renderer::{GraphCompiler, GraphRenderer},
    graph::AggregateGraph,
    synth::SynthEvent,
    MAX_BLOCK_SIZE,
};

/// Synchronous engine: graphs are compiled and installed immediately,
/// samples are pulled on demand. Used by tests and for rendering to a buffer.
pub struct OfflineEngine {
    compiler: GraphCompiler,
    renderer: GraphRenderer,
    loads: usize,
}

impl OfflineEngine {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            compiler: GraphCompiler::new(sample_rate),
            renderer: GraphRenderer::new(sample_rate),
            loads: 0,
        }
    }

    /// Render `frames` samples of mono output.
    pub fn render_frames(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        for block in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.renderer.render(block);
        }
        out
    }

    /// Engine reports (voice silence) since the last call.
    pub fn take_events(&mut self) -> Vec<SynthEvent> {
        self.renderer.drain_events().collect()
    }

    /// How many graphs have been loaded.
    pub fn loads(&self) -> usize {
        self.loads
    }

    pub fn renderer(&self) -> &GraphRenderer {
        &self.renderer
    }
}

impl RenderEngine for OfflineEngine {
    fn render(&mut self, graph: AggregateGraph) {
        let program = self.compiler.compile(&graph);
        drop(self.renderer.install(program));
        self.loads += 1;
    }
}
