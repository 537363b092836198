//! Global voice parameters shared by every key.
//!
//! Values are stored in control-surface units, the numbers a slider would
//! show: envelope times and sustain run 0–100, the blend and volume run 0–1,
//! bit depth is a whole number of bits and the cutoff is in Hz.
//!
//! Bit depth tops out at [`MAX_BIT_DEPTH`]. An f32 carries a 24-bit
//! mantissa, so finer grids than that leave a full-scale signal untouched. The graph
//! builder reads the normalised accessors (`attack_secs`, `sustain_level`,
//! ...) instead of the raw fields.
//!
//! Nothing here can fail. Out-of-range input is clamped into range and
//! non-finite input is ignored, which is what a live control surface wants:
//! a wild knob turn must never take the instrument down.

use std::{fmt, ops::RangeInclusive};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Largest accepted bit depth; higher requests clamp to it.
pub const MAX_BIT_DEPTH: u32 = 24;

/// Control units per second for attack, decay and release (0–100 → 0–10 s).
pub const TIME_SCALE: f32 = 10.0;
/// Control units per full sustain level (0–100 → 0–1).
pub const SUSTAIN_SCALE: f32 = 100.0;

/// Identifies one voice parameter.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    Attack,
    Decay,
    Sustain,
    Release,
    Blend,
    BitDepth,
    Cutoff,
    Volume,
}

impl Param {
    pub const ALL: [Param; 8] = [
        Param::Attack,
        Param::Decay,
        Param::Sustain,
        Param::Release,
        Param::Blend,
        Param::BitDepth,
        Param::Cutoff,
        Param::Volume,
    ];

    /// Valid control range.
    pub fn range(self) -> RangeInclusive<f32> {
        match self {
            Param::Attack | Param::Decay | Param::Sustain | Param::Release => 0.0..=100.0,
            Param::Blend | Param::Volume => 0.0..=1.0,
            Param::BitDepth => 1.0..=MAX_BIT_DEPTH as f32,
            Param::Cutoff => 20.0..=20_000.0,
        }
    }

    /// Natural increment for a single nudge of the control.
    pub fn step(self) -> f32 {
        match self {
            Param::Attack | Param::Decay | Param::Release => 1.0,
            Param::Sustain => 5.0,
            Param::Blend | Param::Volume => 0.05,
            Param::BitDepth => 1.0,
            Param::Cutoff => 100.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Param::Attack => "attack",
            Param::Decay => "decay",
            Param::Sustain => "sustain",
            Param::Release => "release",
            Param::Blend => "blend",
            Param::BitDepth => "bit depth",
            Param::Cutoff => "cutoff",
            Param::Volume => "volume",
        }
    }

    fn clamp(self, value: f32) -> f32 {
        let range = self.range();
        let value = value.clamp(*range.start(), *range.end());
        if self == Param::BitDepth {
            value.round()
        } else {
            value
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single control change, as sent by the input shell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamChange {
    pub param: Param,
    pub value: f32,
}

impl ParamChange {
    pub fn new(param: Param, value: f32) -> Self {
        Self { param, value }
    }
}

/// Current synthesis parameters, read-only to the graph builder.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    attack: f32,
    decay: f32,
    sustain: f32,
    release: f32,
    blend: f32,
    bit_depth: u32,
    cutoff: f32,
    volume: f32,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            attack: 1.0,    // 100ms
            decay: 5.0,     // 500ms
            sustain: 70.0,  // 70%
            release: 10.0,  // 1s
            blend: 0.5,
            bit_depth: 16,
            cutoff: 8_000.0,
            volume: 0.3,
        }
    }
}

impl VoiceParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw control value of `param`.
    pub fn get(&self, param: Param) -> f32 {
        match param {
            Param::Attack => self.attack,
            Param::Decay => self.decay,
            Param::Sustain => self.sustain,
            Param::Release => self.release,
            Param::Blend => self.blend,
            Param::BitDepth => self.bit_depth as f32,
            Param::Cutoff => self.cutoff,
            Param::Volume => self.volume,
        }
    }

    /// Set `param` from a control value, clamped into its range.
    pub fn set(&mut self, param: Param, value: f32) {
        if !value.is_finite() {
            warn!(%param, value, "ignoring non-finite parameter value");
            return;
        }

        let value = param.clamp(value);
        match param {
            Param::Attack => self.attack = value,
            Param::Decay => self.decay = value,
            Param::Sustain => self.sustain = value,
            Param::Release => self.release = value,
            Param::Blend => self.blend = value,
            Param::BitDepth => self.bit_depth = value as u32,
            Param::Cutoff => self.cutoff = value,
            Param::Volume => self.volume = value,
        }
    }

    pub fn apply(&mut self, change: ParamChange) {
        self.set(change.param, change.value);
    }

    /// Re-clamp every field, for values that bypassed the setters
    /// (deserialised config).
    pub fn clamped(self) -> Self {
        let mut out = Self::default();
        for param in Param::ALL {
            out.set(param, self.get(param));
        }
        out
    }

    pub fn set_attack(&mut self, value: f32) {
        self.set(Param::Attack, value);
    }

    pub fn set_decay(&mut self, value: f32) {
        self.set(Param::Decay, value);
    }

    pub fn set_sustain(&mut self, value: f32) {
        self.set(Param::Sustain, value);
    }

    pub fn set_release(&mut self, value: f32) {
        self.set(Param::Release, value);
    }

    pub fn set_blend(&mut self, value: f32) {
        self.set(Param::Blend, value);
    }

    pub fn set_bit_depth(&mut self, bits: u32) {
        self.set(Param::BitDepth, bits as f32);
    }

    pub fn set_cutoff(&mut self, hz: f32) {
        self.set(Param::Cutoff, hz);
    }

    pub fn set_volume(&mut self, value: f32) {
        self.set(Param::Volume, value);
    }

    pub fn attack_secs(&self) -> f32 {
        self.attack / TIME_SCALE
    }

    pub fn decay_secs(&self) -> f32 {
        self.decay / TIME_SCALE
    }

    pub fn sustain_level(&self) -> f32 {
        self.sustain / SUSTAIN_SCALE
    }

    pub fn release_secs(&self) -> f32 {
        self.release / TIME_SCALE
    }

    /// Oscillator blend: 0 = pure sine, 1 = pure sawtooth.
    pub fn blend(&self) -> f32 {
        self.blend
    }

    pub fn bit_depth(&self) -> u32 {
        self.bit_depth
    }

    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}
