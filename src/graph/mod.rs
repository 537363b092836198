//! Signal-graph descriptions and the voice graph builder.
//!
//! A graph here is a value, not a processor: a tree of primitive nodes
//! (constants, oscillators, arithmetic, a lowpass, an envelope) that some
//! rendering engine turns into samples. The builder derives a fresh
//! aggregate graph from the current key and parameter snapshots every time
//! either changes; stable node keys let the engine carry its running state
//! across those rebuilds.

/// Per-key comparison of two aggregate graphs.
pub mod diff;
/// Description nodes and node keys.
pub mod node;
/// Per-key voice sub-graphs and the aggregate builder.
pub mod voice;

pub use diff::GraphDiff;
pub use node::{Node, NodeKey, NodeKind};
pub use voice::{blend_weights, build_graph, build_voice, quant_step, quantize, AggregateGraph, VoiceGraph};
