use std::sync::Arc;

use crate::{
    graph::node::{Node, NodeKey},
    keys::{KeyId, KeyPhase, KeyState, PitchTable},
    params::VoiceParams,
};

/*
Voice Graph Builder
===================

Every tracked key becomes one voice. A voice is described, not rendered:
the builder emits a tree of primitive nodes and leaves the sample math to
the rendering engine.

    gate ─────────────────────────────────────────┐
                                                  ▼
    sine(f) × (1 - b) ─┐                        adsr ──┐
                       ├─ + ─ ⌊x·2ⁿ⌋/2ⁿ ─ lowpass ──── × ─── × volume
    saw(f)  ×    b    ─┘

Oscillator mix
--------------
A linear crossfade between a sine and a sawtooth at the key's pitch:

    sine weight = 1 - b        saw weight = b

The weights always sum to exactly 1. Perceived loudness dips in the middle
of the blend range (a 50/50 mix of uncorrelated waves is quieter than
either alone); that is the accepted cost of the simple law.

Quantisation (bit-crush)
------------------------
With n bits the step is 2ⁿ and the signal x becomes

    floor(x · 2ⁿ) / 2ⁿ

i.e. the amplitude is truncated onto a grid of 2ⁿ levels per unit. For
signals in roughly [-1, 1] this behaves like an n-bit converter; fewer bits
means coarser steps and harsher harmonic distortion. Because 2ⁿ is a power
of two, both the multiply and the divide are exact in floating point, so
the only rounding is the floor itself.

Identity
--------
The stateful nodes of a voice (gate, envelope, both oscillators, filter)
carry keys derived from the key identifier, e.g. `KeyA/env`. The graph is
rebuilt from scratch on every event, and those keys are how the engine
knows that the rebuilt `KeyA/env` is the envelope it is already running
rather than a fresh one. Moving a slider must not restart a held note's
attack.
*/

/// Q of the per-voice lowpass.
pub const FILTER_Q: f32 = 1.0;

/// Sine and sawtooth weights for blend fraction `b` (clamped to [0, 1]).
#[inline]
pub fn blend_weights(blend: f32) -> (f32, f32) {
    let blend = blend.clamp(0.0, 1.0);
    (1.0 - blend, blend)
}

/// Widest step `quant_step` returns; 2¹²⁷ is the largest finite power of two.
const MAX_STEP_BITS: u32 = 127;

/// Number of quantisation levels per unit amplitude for `bits` bits.
///
/// Saturates at 2¹²⁷, far past the point where the grid is finer than f32.
#[inline]
pub fn quant_step(bits: u32) -> f32 {
    2.0_f32.powi(bits.clamp(1, MAX_STEP_BITS) as i32)
}

/// `floor(x · 2ⁿ) / 2ⁿ`, the same expression the voice graph describes.
///
/// When `x · 2ⁿ` leaves the f32 range the grid is finer than `x` can
/// resolve, so `x` comes back unchanged.
#[inline]
pub fn quantize(x: f32, bits: u32) -> f32 {
    let step = quant_step(bits);
    let scaled = x * step;
    if !scaled.is_finite() {
        return x;
    }
    scaled.floor() / step
}

/// One key's voice: the description plus the values it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceGraph {
    pub key: KeyId,
    pub frequency: f32,
    /// Gate level (true while the key is held).
    pub gate: bool,
    /// Release generation while releasing, echoed back by the engine.
    pub generation: Option<u64>,
    pub sine_weight: f32,
    pub saw_weight: f32,
    pub step: f32,
    pub gain: f32,
    pub output: Node,
}

impl VoiceGraph {
    pub fn gate_key(&self) -> NodeKey {
        NodeKey::voice(&self.key, "gate")
    }

    pub fn envelope_key(&self) -> NodeKey {
        NodeKey::voice(&self.key, "env")
    }
}

/// Sum of every tracked voice. Rebuilt whole on every change.
///
/// Voices sit behind an `Arc`, so clones share one description.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateGraph {
    voices: Arc<[VoiceGraph]>,
}

impl Default for AggregateGraph {
    fn default() -> Self {
        Self {
            voices: Vec::new().into(),
        }
    }
}

impl AggregateGraph {
    /// The empty sum: no voices, silence.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Whether both handles share the same voice list.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.voices, &other.voices)
    }

    pub fn voices(&self) -> &[VoiceGraph] {
        &self.voices
    }

    pub fn voice(&self, key: &KeyId) -> Option<&VoiceGraph> {
        self.voices.iter().find(|voice| &voice.key == key)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_silent(&self) -> bool {
        self.voices.is_empty()
    }

    /// The whole mix as a single node: `Add` over every voice output.
    pub fn output(&self) -> Node {
        Node::add(self.voices.iter().map(|voice| voice.output.clone()))
    }
}

/// Describe the voice for `key` at `frequency`.
pub fn build_voice(key: &KeyId, frequency: f32, phase: KeyPhase, params: &VoiceParams) -> VoiceGraph {
    let gate = phase.is_held();
    let generation = match phase {
        KeyPhase::Held => None,
        KeyPhase::Releasing { generation } => Some(generation),
    };
    let (sine_weight, saw_weight) = blend_weights(params.blend());
    let step = quant_step(params.bit_depth());
    let gain = params.volume();

    let gate_node = Node::constant(if gate { 1.0 } else { 0.0 }).keyed(NodeKey::voice(key, "gate"));
    let envelope = Node::adsr(
        Node::constant(params.attack_secs()),
        Node::constant(params.decay_secs()),
        Node::constant(params.sustain_level()),
        Node::constant(params.release_secs()),
        gate_node,
    )
    .keyed(NodeKey::voice(key, "env"));

    let oscillators = Node::add([
        Node::mul([
            Node::constant(sine_weight),
            Node::sine(Node::constant(frequency)).keyed(NodeKey::voice(key, "sine")),
        ]),
        Node::mul([
            Node::constant(saw_weight),
            Node::saw(Node::constant(frequency)).keyed(NodeKey::voice(key, "saw")),
        ]),
    ]);

    let crushed = Node::div(
        Node::floor(Node::mul([oscillators, Node::constant(step)])),
        Node::constant(step),
    );

    let filtered = Node::lowpass(
        Node::constant(params.cutoff_hz()),
        Node::constant(FILTER_Q),
        crushed,
    )
    .keyed(NodeKey::voice(key, "lpf"));

    let output = Node::mul([filtered, envelope, Node::constant(gain)]);

    VoiceGraph {
        key: key.clone(),
        frequency,
        gate,
        generation,
        sine_weight,
        saw_weight,
        step,
        gain,
        output,
    }
}

/// Derive the aggregate graph from a key snapshot and a parameter snapshot.
///
/// Pure: equal inputs give equal graphs with equal node keys. Keys without
/// a pitch are skipped.
pub fn build_graph(table: &PitchTable, keys: &KeyState, params: &VoiceParams) -> AggregateGraph {
    let voices = keys
        .iter()
        .filter_map(|(key, phase)| {
            let frequency = table.frequency_of(key)?;
            Some(build_voice(key, frequency, phase, params))
        })
        .collect::<Vec<_>>();

    AggregateGraph { voices: voices.into() }
}
