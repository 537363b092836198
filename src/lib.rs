#[cfg(feature = "serde")]
pub mod config;
pub mod dispatch; // Engine gate, graph hand-off
pub mod dsp;
pub mod engine; // Graph interpreter and engines
pub mod graph; // Declarative voice graphs
pub mod keys; // Pitch table and key lifecycle
pub mod params;
pub mod synth; // Event reducer

pub use dispatch::{Dispatcher, PendingPolicy, RenderEngine};
pub use graph::{build_graph, AggregateGraph, Node, NodeKey, NodeKind, VoiceGraph};
pub use keys::{KeyId, KeyPhase, KeyState, KeyTracker, PitchTable};
pub use params::{Param, ParamChange, VoiceParams};
pub use synth::{Synth, SynthEvent};

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
