//! Low-level DSP primitives used by the reference graph renderer.
//!
//! These are per-sample state machines with no allocation. The graph
//! description never refers to them directly; the renderer creates one per
//! stateful node and keeps it alive for as long as the node's key survives
//! graph rebuilds.

/// Gate-driven attack/decay/sustain/release envelope.
pub mod envelope;
/// State-variable lowpass filter.
pub mod filter;
/// Phase-accumulator oscillators.
pub mod oscillator;

pub use envelope::{AdsrShape, Envelope, EnvelopeStage};
pub use filter::SvFilter;
pub use oscillator::{Phase, Waveform};
