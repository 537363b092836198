//! Scenario benchmarks.
//!
//! The control side rebuilds and compiles the whole graph on every key or
//! knob event; the audio side installs and renders it. Both should stay cheap with every
//! key on the keyboard down.

mod build;
mod render;

pub use build::bench_build;
pub use render::bench_render;

use crushkeys::{KeyId, KeyTracker, PitchTable};

/// Tracker with the first `count` layout keys held.
pub fn chord(table: &PitchTable, count: usize) -> KeyTracker {
    let mut tracker = KeyTracker::new();
    for (key, _) in table.iter().take(count) {
        tracker.key_down(KeyId::clone(key));
    }
    tracker
}

pub const CHORD_SIZES: &[usize] = &[1, 4, 10, 36];
