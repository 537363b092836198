// Purpose: event handling and graph recomputation
// This layer sits above the graph builder and owns the mutable state

pub mod controller;
pub mod message;

pub use controller::Synth;
pub use message::{MessageReceiver, SynthEvent};
