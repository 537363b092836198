use std::collections::HashMap;

use super::KeyId;

/*
Key-to-Pitch Table
==================

The computer keyboard is treated as one long chromatic strip. Walking the
letter rows from the bottom up (left to right inside each row), then the digit
row, every key is one semitone above the key before it:

   row        keys                         pitches
   -------    --------------------------   -----------
   bottom     Z X C V B N M                A2  .. D#3
   home       A S D F G H J K L            E3  .. C4
   top        Q W E R T Y U I O P          C#4 .. A#4
   digits     1 2 3 4 5 6 7 8 9 0          B4  .. G#5

The strip starts at A2 = 110 Hz, so key `i` sounds at

    f(i) = 110 * 2^(i / 12)

which puts `KeyA` on E3 (164.814 Hz). Adjacent physical keys are adjacent
semitones, and the table only ever grows in pitch along the layout. Anything
that is not on the strip (function keys, punctuation, modifiers) has no pitch
and never produces a voice.
*/

/// Physical layout walked by the pitch table, lowest note first.
pub const QWERTY_LAYOUT: [&str; 36] = [
    "KeyZ", "KeyX", "KeyC", "KeyV", "KeyB", "KeyN", "KeyM", //
    "KeyA", "KeyS", "KeyD", "KeyF", "KeyG", "KeyH", "KeyJ", "KeyK", "KeyL", //
    "KeyQ", "KeyW", "KeyE", "KeyR", "KeyT", "KeyY", "KeyU", "KeyI", "KeyO", "KeyP", //
    "Digit1", "Digit2", "Digit3", "Digit4", "Digit5", "Digit6", "Digit7", "Digit8", "Digit9",
    "Digit0",
];

/// Pitch of the first key on the layout (A2).
pub const BASE_FREQUENCY: f32 = 110.0;

#[inline]
fn semitones_above(base: f32, semitones: usize) -> f32 {
    base * 2.0_f32.powf(semitones as f32 / 12.0)
}

/// Immutable mapping from key identifier to fundamental frequency (Hz).
#[derive(Debug, Clone)]
pub struct PitchTable {
    order: Vec<KeyId>,
    frequencies: HashMap<KeyId, f32>,
}

impl PitchTable {
    /// Build a chromatic table over `layout`, starting at `base` Hz.
    pub fn chromatic(layout: &[&'static str], base: f32) -> Self {
        let order: Vec<KeyId> = layout.iter().map(|&code| KeyId::from(code)).collect();
        let frequencies = order
            .iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), semitones_above(base, i)))
            .collect();

        Self { order, frequencies }
    }

    /// The standard table: QWERTY letter rows plus digits, from A2.
    pub fn qwerty() -> Self {
        Self::chromatic(&QWERTY_LAYOUT, BASE_FREQUENCY)
    }

    pub fn frequency_of(&self, key: &KeyId) -> Option<f32> {
        self.frequencies.get(key).copied()
    }

    pub fn contains(&self, key: &KeyId) -> bool {
        self.frequencies.contains_key(key)
    }

    /// Entries in layout order (lowest pitch first).
    pub fn iter(&self) -> impl Iterator<Item = (&KeyId, f32)> + '_ {
        self.order.iter().map(|key| (key, self.frequencies[key]))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for PitchTable {
    fn default() -> Self {
        Self::qwerty()
    }
}
