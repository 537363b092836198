// Purpose: turn graph descriptions into sound
// The compiler and renderer are the interpreter; the engines decide where
// graphs arrive from and where samples go.

pub mod offline;
#[cfg(feature = "rtrb")]
pub mod realtime;
pub mod renderer;

pub use offline::OfflineEngine;
#[cfg(feature = "rtrb")]
pub use realtime::{channel, GraphPlayer, GraphSender};
pub use renderer::{GraphCompiler, GraphRenderer, Program};
