//! Key identifiers, the key-to-pitch table, and per-key press/release state.
//!
//! Keys are named with the `KeyboardEvent.code` convention (`"KeyA"`,
//! `"Digit1"`, ...) so that the meaning of a key is tied to its physical
//! position rather than the character a layout prints on it.

/// Static key → frequency mapping.
pub mod pitch;
/// Per-key lifecycle (held, releasing) and immutable snapshots of it.
pub mod tracker;

use std::{borrow::Borrow, fmt, sync::Arc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use pitch::{PitchTable, QWERTY_LAYOUT};
pub use tracker::{KeyPhase, KeyState, KeyTracker};

/// Opaque token identifying a physical key.
///
/// Cloning is cheap (shared string), which matters because every rebuilt
/// graph carries the key of each of its voices.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyId(Arc<str>);

impl KeyId {
    pub fn new(code: impl Into<Arc<str>>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for KeyId {
    fn from(code: &str) -> Self {
        Self(Arc::from(code))
    }
}

impl From<String> for KeyId {
    fn from(code: String) -> Self {
        Self(Arc::from(code))
    }
}

impl Borrow<str> for KeyId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
