use std::collections::{HashMap, VecDeque};

use tracing::{trace, warn};

use crate::{
    dsp::{AdsrShape, Envelope, Phase, SvFilter, Waveform},
    graph::{AggregateGraph, Node, NodeKey, NodeKind},
    keys::KeyId,
    synth::SynthEvent,
};

/*
Graph Interpreter
=================

Turns graph descriptions into samples in two halves that can live on
different threads.

Compiling (control side)
------------------------
`GraphCompiler` turns an aggregate graph into a `Program`: an evaluation
tree where every stateful node (oscillator, lowpass, envelope) points at
an index into a fixed arena of state slots:

    description                  program                    arena
    ───────────                  ───────                    ─────
    Sine  key=KeyA/sine   ──→    Osc   slot 7       ──→     [7] Phase
    Adsr  key=KeyA/env    ──→    Adsr  slot 3       ──→     [3] Envelope
    Lowpass (no key)      ──→    Lpf   slot 12      ──→     [12] SvFilter (reset)

The compiler remembers which slot each node key owns. A keyed node in the
new graph takes over the slot of the same key if it holds the same kind of
state. Unkeyed stateful nodes and keys seen for the first time get a free
slot plus a reset instruction. Slots whose key disappeared go back to the
free list once the program is built, so the program that stops using a
slot never also reuses it.

That is the whole trick that makes full rebuilds safe: the held note's
envelope keeps its stage and level, its oscillators keep their phase, and
only the constants around them change.

Installing (audio side)
-----------------------
`GraphRenderer::install` applies the program's resets, then its gate
edges: every envelope whose inputs are all constants gets its shape and
gate applied right away. A key pressed and released between two blocks
therefore still sees both edges, in order. The replaced program is handed
back to the caller, which frees it on its own thread.

The arena is sized once. When it runs out, further stateful nodes render
without state: oscillators and envelopes give silence, lowpasses pass
their input through.

Silence reports
---------------
After each rendered block, every voice whose gate is low and whose envelope
has fallen back to idle is reported once (per program) as
`SynthEvent::VoiceSilent`, carrying the release generation from the graph.
*/

/// Number of state slots in the arena.
pub const MAX_SLOTS: usize = 512;

/// Silence reports held between drains.
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    Osc,
    Filter,
    Envelope,
}

impl SlotKind {
    fn of(kind: NodeKind) -> Option<Self> {
        match kind {
            NodeKind::Sine | NodeKind::Saw => Some(SlotKind::Osc),
            NodeKind::Lowpass => Some(SlotKind::Filter),
            NodeKind::Adsr => Some(SlotKind::Envelope),
            _ => None,
        }
    }
}

/// Per-node running state.
#[derive(Debug, Clone, Default)]
enum Slot {
    #[default]
    Empty,
    Osc(Phase),
    Filter(SvFilter),
    Envelope(Envelope),
}

impl Slot {
    fn fresh(kind: SlotKind, sample_rate: f32) -> Self {
        match kind {
            SlotKind::Osc => Slot::Osc(Phase::new()),
            SlotKind::Filter => Slot::Filter(SvFilter::new()),
            SlotKind::Envelope => Slot::Envelope(Envelope::new(sample_rate)),
        }
    }
}

/// Compiled node: kind, inputs, and the state slot if it has one.
#[derive(Debug)]
struct Op {
    kind: NodeKind,
    slot: Option<usize>,
    inputs: Vec<Op>,
}

#[derive(Debug)]
struct CompiledVoice {
    key: KeyId,
    gate: bool,
    generation: Option<u64>,
    output: Op,
    envelope: Option<usize>,
    reported: bool,
}

/// Envelope shape and gate applied when a program is installed.
#[derive(Debug, Clone, Copy)]
struct GateEdge {
    slot: usize,
    shape: AdsrShape,
    gate: bool,
}

/// A compiled graph, ready to install on the audio side.
#[derive(Debug, Default)]
pub struct Program {
    voices: Vec<CompiledVoice>,
    resets: Vec<(usize, Slot)>,
    gates: Vec<GateEdge>,
}

impl Program {
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }
}

/// Control-side half: compiles graphs against the slots handed out so far.
pub struct GraphCompiler {
    sample_rate: f32,
    keyed: HashMap<NodeKey, (usize, SlotKind)>,
    unkeyed: Vec<usize>,
    free: Vec<usize>,
}

impl GraphCompiler {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            keyed: HashMap::new(),
            unkeyed: Vec::new(),
            free: (0..MAX_SLOTS).rev().collect(),
        }
    }

    /// Compile `graph`, carrying state over by node key from the previous
    /// compile. Programs must be installed in the order they are compiled.
    pub fn compile(&mut self, graph: &AggregateGraph) -> Program {
        self.free.append(&mut self.unkeyed);
        let mut previous = std::mem::take(&mut self.keyed);
        let mut program = Program::default();

        for voice in graph.voices() {
            let output = self.compile_node(&voice.output, &mut previous, &mut program);
            let envelope = self.keyed.get(&voice.envelope_key()).map(|(index, _)| *index);
            program.voices.push(CompiledVoice {
                key: voice.key.clone(),
                gate: voice.gate,
                generation: voice.generation,
                output,
                envelope,
                reported: false,
            });
        }

        for (key, (index, _)) in previous {
            trace!(%key, slot = index, "releasing state slot");
            self.free.push(index);
        }

        program
    }

    /// Slots still available for new stateful nodes.
    pub fn free_slots(&self) -> usize {
        self.free.len()
    }

    fn compile_node(
        &mut self,
        node: &Node,
        previous: &mut HashMap<NodeKey, (usize, SlotKind)>,
        program: &mut Program,
    ) -> Op {
        let inputs = node
            .inputs()
            .iter()
            .map(|input| self.compile_node(input, previous, program))
            .collect();
        let kind = node.kind();

        let slot = SlotKind::of(kind).and_then(|slot_kind| self.assign(node.key(), slot_kind, previous, program));
        if let (NodeKind::Adsr, Some(index)) = (kind, slot) {
            if let Some(edge) = gate_edge(node, index) {
                program.gates.push(edge);
            }
        }

        Op { kind, slot, inputs }
    }

    fn assign(
        &mut self,
        key: Option<&NodeKey>,
        kind: SlotKind,
        previous: &mut HashMap<NodeKey, (usize, SlotKind)>,
        program: &mut Program,
    ) -> Option<usize> {
        match key {
            // a key repeated within one graph gets private state
            Some(key) if !self.keyed.contains_key(key) => {
                let index = match previous.remove(key) {
                    Some((index, old)) if old == kind => index,
                    Some((index, _)) => {
                        program.resets.push((index, Slot::fresh(kind, self.sample_rate)));
                        index
                    }
                    None => self.allocate(kind, program)?,
                };
                self.keyed.insert(key.clone(), (index, kind));
                Some(index)
            }
            _ => {
                let index = self.allocate(kind, program)?;
                self.unkeyed.push(index);
                Some(index)
            }
        }
    }

    fn allocate(&mut self, kind: SlotKind, program: &mut Program) -> Option<usize> {
        let Some(index) = self.free.pop() else {
            warn!(capacity = MAX_SLOTS, "state slots exhausted, node renders without state");
            return None;
        };
        program.resets.push((index, Slot::fresh(kind, self.sample_rate)));
        Some(index)
    }
}

/// Shape and gate of an envelope whose inputs are all constants.
fn gate_edge(node: &Node, slot: usize) -> Option<GateEdge> {
    let [attack, decay, sustain, release, gate] = node.inputs() else {
        return None;
    };
    Some(GateEdge {
        slot,
        shape: AdsrShape::new(
            attack.as_constant()?,
            decay.as_constant()?,
            sustain.as_constant()?,
            release.as_constant()?,
        ),
        gate: gate.as_constant()? > 0.5,
    })
}

/// Audio-side half: evaluates the installed program sample by sample.
///
/// Allocates only in `new`.
pub struct GraphRenderer {
    sample_rate: f32,
    program: Program,
    slots: Vec<Slot>,
    events: VecDeque<SynthEvent>,
}

impl GraphRenderer {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            program: Program::default(),
            slots: vec![Slot::Empty; MAX_SLOTS],
            events: VecDeque::with_capacity(EVENT_CAPACITY),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Start playing `program`, returning the one it replaces.
    pub fn install(&mut self, mut program: Program) -> Program {
        for (index, slot) in program.resets.drain(..) {
            if let Some(target) = self.slots.get_mut(index) {
                *target = slot;
            }
        }
        for edge in program.gates.drain(..) {
            if let Some(Slot::Envelope(env)) = self.slots.get_mut(edge.slot) {
                env.set_shape(edge.shape);
                env.set_gate(edge.gate);
            }
        }

        std::mem::replace(&mut self.program, program)
    }

    /// Render the mix of all installed voices into `out`.
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            let mut mix = 0.0;
            for voice in &self.program.voices {
                mix += eval(&voice.output, &mut self.slots, self.sample_rate);
            }
            *sample = mix;
        }

        self.collect_silent_voices();
    }

    /// Silence reports gathered since the last drain.
    pub fn drain_events(&mut self) -> std::collections::vec_deque::Drain<'_, SynthEvent> {
        self.events.drain(..)
    }

    /// Oldest undelivered silence report.
    pub fn next_event(&mut self) -> Option<SynthEvent> {
        self.events.pop_front()
    }

    /// Put back a report that could not be delivered.
    pub fn requeue_event(&mut self, event: SynthEvent) {
        self.events.push_front(event);
    }

    pub fn voice_count(&self) -> usize {
        self.program.voices.len()
    }

    /// Current level of the envelope of `key`'s voice, if it has one.
    pub fn envelope_level(&self, key: &KeyId) -> Option<f32> {
        let voice = self.program.voices.iter().find(|voice| &voice.key == key)?;
        match self.slots.get(voice.envelope?)? {
            Slot::Envelope(env) => Some(env.level()),
            _ => None,
        }
    }

    fn collect_silent_voices(&mut self) {
        for voice in &mut self.program.voices {
            if voice.gate || voice.reported {
                continue;
            }
            // queue full, report on a later block
            if self.events.len() >= self.events.capacity() {
                break;
            }
            let finished = match voice.envelope.and_then(|index| self.slots.get(index)) {
                Some(Slot::Envelope(env)) => !env.is_active(),
                _ => true,
            };
            if let (true, Some(generation)) = (finished, voice.generation) {
                voice.reported = true;
                self.events.push_back(SynthEvent::VoiceSilent {
                    key: voice.key.clone(),
                    generation,
                });
            }
        }
    }
}

#[inline]
fn input(op: &Op, index: usize, slots: &mut [Slot], sample_rate: f32) -> f32 {
    op.inputs
        .get(index)
        .map_or(0.0, |input| eval(input, slots, sample_rate))
}

fn eval(op: &Op, slots: &mut [Slot], sample_rate: f32) -> f32 {
    match op.kind {
        NodeKind::Const(value) => value,

        NodeKind::Sine | NodeKind::Saw => {
            let frequency = input(op, 0, slots, sample_rate);
            let waveform = if op.kind == NodeKind::Sine {
                Waveform::Sine
            } else {
                Waveform::Saw
            };
            match op.slot.and_then(|index| slots.get_mut(index)) {
                Some(Slot::Osc(phase)) => phase.next_sample(waveform, frequency, sample_rate),
                _ => 0.0,
            }
        }

        NodeKind::Mul => {
            let mut product = 1.0;
            for input in &op.inputs {
                product *= eval(input, slots, sample_rate);
            }
            product
        }

        NodeKind::Add => {
            let mut sum = 0.0;
            for input in &op.inputs {
                sum += eval(input, slots, sample_rate);
            }
            sum
        }

        NodeKind::Div => {
            let numerator = input(op, 0, slots, sample_rate);
            let denominator = input(op, 1, slots, sample_rate);
            if denominator == 0.0 {
                0.0
            } else {
                numerator / denominator
            }
        }

        NodeKind::Floor => input(op, 0, slots, sample_rate).floor(),

        NodeKind::Lowpass => {
            let cutoff = input(op, 0, slots, sample_rate);
            let q = input(op, 1, slots, sample_rate);
            let signal = input(op, 2, slots, sample_rate);
            match op.slot.and_then(|index| slots.get_mut(index)) {
                Some(Slot::Filter(filter)) => filter.next_sample(signal, cutoff, q, sample_rate),
                _ => signal,
            }
        }

        NodeKind::Adsr => {
            let shape = AdsrShape::new(
                input(op, 0, slots, sample_rate),
                input(op, 1, slots, sample_rate),
                input(op, 2, slots, sample_rate),
                input(op, 3, slots, sample_rate),
            );
            let gate = input(op, 4, slots, sample_rate) > 0.5;
            match op.slot.and_then(|index| slots.get_mut(index)) {
                Some(Slot::Envelope(env)) => {
                    env.set_shape(shape);
                    env.set_gate(gate);
                    env.next_sample()
                }
                _ => 0.0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{build_graph, quant_step, quantize},
        keys::{KeyTracker, PitchTable},
        params::VoiceParams,
    };

    const SAMPLE_RATE: f32 = 8_000.0;

    fn key(code: &str) -> KeyId {
        KeyId::from(code)
    }

    fn graph(tracker: &KeyTracker, params: &VoiceParams) -> AggregateGraph {
        build_graph(&PitchTable::qwerty(), tracker.state(), params)
    }

    fn load(compiler: &mut GraphCompiler, renderer: &mut GraphRenderer, graph: &AggregateGraph) {
        renderer.install(compiler.compile(graph));
    }

    /// Compile a bare node and evaluate it once.
    fn eval_once(node: &Node) -> f32 {
        let mut compiler = GraphCompiler::new(SAMPLE_RATE);
        let mut program = Program::default();
        let op = compiler.compile_node(node, &mut HashMap::new(), &mut program);
        let mut slots = vec![Slot::Empty; MAX_SLOTS];
        for (index, slot) in program.resets {
            slots[index] = slot;
        }
        eval(&op, &mut slots, SAMPLE_RATE)
    }

    #[test]
    fn arithmetic_nodes_evaluate() {
        let node = Node::div(
            Node::floor(Node::mul([Node::constant(0.3), Node::constant(4.0)])),
            Node::constant(4.0),
        );
        assert_eq!(eval_once(&node), 0.25);
        assert_eq!(eval_once(&Node::div(Node::constant(1.0), Node::constant(0.0))), 0.0);
    }

    #[test]
    fn quantizer_chain_agrees_with_quantize() {
        for bits in [1, 2, 5, 16] {
            for x in [-1.0, -0.37, 0.0, 0.21, 0.999] {
                let step = quant_step(bits);
                let node = Node::div(
                    Node::floor(Node::mul([Node::constant(x), Node::constant(step)])),
                    Node::constant(step),
                );
                assert_eq!(eval_once(&node), quantize(x, bits));
            }
        }
    }

    #[test]
    fn silent_graph_renders_zeros() {
        let mut compiler = GraphCompiler::new(SAMPLE_RATE);
        let mut renderer = GraphRenderer::new(SAMPLE_RATE);
        load(&mut compiler, &mut renderer, &AggregateGraph::silent());
        let mut out = vec![1.0; 64];
        renderer.render(&mut out);

        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn reload_keeps_envelope_progress() {
        let mut tracker = KeyTracker::new();
        let mut params = VoiceParams::default();
        params.set_attack(10.0); // 1s attack
        tracker.key_down(key("KeyA"));

        let mut compiler = GraphCompiler::new(SAMPLE_RATE);
        let mut renderer = GraphRenderer::new(SAMPLE_RATE);
        load(&mut compiler, &mut renderer, &graph(&tracker, &params));
        renderer.render(&mut vec![0.0f32; 800]);
        let before = renderer.envelope_level(&key("KeyA")).unwrap();
        assert!(before > 0.05, "attack should be under way, got {before}");

        // A parameter change rebuilds the graph; the attack must continue
        params.set_blend(0.9);
        let program = compiler.compile(&graph(&tracker, &params));
        assert!(program.resets.is_empty(), "held voice keeps every slot");
        renderer.install(program);
        renderer.render(&mut vec![0.0f32; 1]);
        let after = renderer.envelope_level(&key("KeyA")).unwrap();
        assert!(after > before, "envelope restarted: {before} -> {after}");
    }

    #[test]
    fn unkeyed_nodes_get_private_state() {
        let mut compiler = GraphCompiler::new(SAMPLE_RATE);
        let mut program = Program::default();
        let node = Node::add([Node::sine(Node::constant(1_000.0))]);
        let op = compiler.compile_node(&node, &mut HashMap::new(), &mut program);

        assert!(compiler.keyed.is_empty());
        assert_eq!(program.resets.len(), 1);
        assert!(op.inputs[0].slot.is_some());
    }

    #[test]
    fn vanished_keys_return_their_slots() {
        let mut tracker = KeyTracker::new();
        let params = VoiceParams::default();
        let mut compiler = GraphCompiler::new(SAMPLE_RATE);
        assert_eq!(compiler.free_slots(), MAX_SLOTS);

        tracker.key_down(key("KeyA"));
        tracker.key_down(key("KeyS"));
        compiler.compile(&graph(&tracker, &params));
        assert_eq!(compiler.free_slots(), MAX_SLOTS - 8, "four stateful nodes per voice");

        tracker.key_up(&key("KeyS"));
        assert!(tracker.reclaim(&key("KeyS"), 1));
        compiler.compile(&graph(&tracker, &params));
        assert_eq!(compiler.free_slots(), MAX_SLOTS - 4);
    }

    #[test]
    fn exhausted_arena_renders_without_state() {
        let mut tracker = KeyTracker::new();
        tracker.key_down(key("KeyA"));
        let mut compiler = GraphCompiler::new(SAMPLE_RATE);
        compiler.free.clear();
        let program = compiler.compile(&graph(&tracker, &VoiceParams::default()));
        assert!(program.resets.is_empty());

        let mut renderer = GraphRenderer::new(SAMPLE_RATE);
        renderer.install(program);
        let mut out = vec![1.0f32; 64];
        renderer.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn tap_between_blocks_still_sounds() {
        let mut tracker = KeyTracker::new();
        let mut params = VoiceParams::default();
        params.set_attack(0.0);
        params.set_release(5.0); // 0.5s
        let mut compiler = GraphCompiler::new(SAMPLE_RATE);
        let mut renderer = GraphRenderer::new(SAMPLE_RATE);

        tracker.key_down(key("KeyA"));
        load(&mut compiler, &mut renderer, &graph(&tracker, &params));
        tracker.key_up(&key("KeyA"));
        load(&mut compiler, &mut renderer, &graph(&tracker, &params));

        let mut out = vec![0.0f32; 400];
        renderer.render(&mut out);
        assert!(out.iter().any(|&s| s != 0.0), "tap should be heard");
        assert_eq!(renderer.drain_events().count(), 0, "voice is still ringing out");
        assert!(renderer.envelope_level(&key("KeyA")).unwrap() > 0.0);
    }

    #[test]
    fn replaced_program_comes_back_to_the_caller() {
        let mut tracker = KeyTracker::new();
        let params = VoiceParams::default();
        let mut compiler = GraphCompiler::new(SAMPLE_RATE);
        let mut renderer = GraphRenderer::new(SAMPLE_RATE);

        tracker.key_down(key("KeyA"));
        let first = renderer.install(compiler.compile(&graph(&tracker, &params)));
        assert_eq!(first.voice_count(), 0);

        tracker.key_down(key("KeyS"));
        let second = renderer.install(compiler.compile(&graph(&tracker, &params)));
        assert_eq!(second.voice_count(), 1);
        assert_eq!(renderer.voice_count(), 2);
    }

    #[test]
    fn reports_silence_after_release_once() {
        let mut tracker = KeyTracker::new();
        let mut params = VoiceParams::default();
        params.set_attack(0.0);
        params.set_release(1.0); // 100ms
        tracker.key_down(key("KeyA"));

        let mut compiler = GraphCompiler::new(SAMPLE_RATE);
        let mut renderer = GraphRenderer::new(SAMPLE_RATE);
        load(&mut compiler, &mut renderer, &graph(&tracker, &params));
        renderer.render(&mut vec![0.0f32; 400]);
        assert_eq!(renderer.drain_events().count(), 0);

        tracker.key_up(&key("KeyA"));
        load(&mut compiler, &mut renderer, &graph(&tracker, &params));
        renderer.render(&mut vec![0.0f32; 400]);
        assert_eq!(renderer.drain_events().count(), 0, "still releasing");

        renderer.render(&mut vec![0.0f32; 800]);
        let events: Vec<SynthEvent> = renderer.drain_events().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            SynthEvent::VoiceSilent { key: k, generation: 1 } if k == &key("KeyA")
        ));

        renderer.render(&mut vec![0.0f32; 64]);
        assert_eq!(renderer.drain_events().count(), 0, "reported only once");
    }
}
