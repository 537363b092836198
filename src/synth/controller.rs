use tracing::debug;

use crate::{
    dispatch::{Dispatcher, PendingPolicy, RenderEngine},
    graph::{build_graph, AggregateGraph},
    keys::{KeyId, KeyState, KeyTracker, PitchTable},
    params::{Param, ParamChange, VoiceParams},
    synth::message::{MessageReceiver, SynthEvent},
};

/// The keyboard synth: owns key state and parameters, and re-derives the
/// whole graph after every event.
///
/// Events are applied strictly in arrival order, so the graph sent after
/// event N always reflects events 1..=N.
pub struct Synth<E> {
    table: PitchTable,
    tracker: KeyTracker,
    params: VoiceParams,
    dispatcher: Dispatcher<E>,
    graph: AggregateGraph,
}

impl<E: RenderEngine> Synth<E> {
    /// QWERTY pitch table, default parameters, latest-graph pending policy.
    pub fn new(engine: E) -> Self {
        Self {
            table: PitchTable::qwerty(),
            tracker: KeyTracker::new(),
            params: VoiceParams::default(),
            dispatcher: Dispatcher::new(engine, PendingPolicy::default()),
            graph: AggregateGraph::silent(),
        }
    }

    pub fn with_table(mut self, table: PitchTable) -> Self {
        self.table = table;
        self
    }

    pub fn with_params(mut self, params: VoiceParams) -> Self {
        self.params = params.clamped();
        self
    }

    pub fn with_pending_policy(mut self, policy: PendingPolicy) -> Self {
        self.dispatcher.set_policy(policy);
        self
    }

    pub fn handle(&mut self, event: SynthEvent) {
        match event {
            SynthEvent::KeyDown(key) => {
                self.tracker.key_down(key);
                self.rebuild();
            }
            SynthEvent::KeyUp(key) => {
                self.tracker.key_up(&key);
                self.rebuild();
            }
            SynthEvent::Param(change) => {
                self.params.apply(change);
                self.rebuild();
            }
            SynthEvent::EngineReady => {
                self.dispatcher.open();
            }
            SynthEvent::VoiceSilent { key, generation } => {
                if self.tracker.reclaim(&key, generation) {
                    debug!(%key, generation, "voice finished releasing");
                    self.rebuild();
                }
            }
        }
    }

    /// Apply every queued event. Returns how many were handled.
    pub fn drain(&mut self, rx: &mut impl MessageReceiver) -> usize {
        let mut handled = 0;
        while let Some(event) = rx.pop() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    pub fn key_down(&mut self, key: impl Into<KeyId>) {
        self.handle(SynthEvent::KeyDown(key.into()));
    }

    pub fn key_up(&mut self, key: impl Into<KeyId>) {
        self.handle(SynthEvent::KeyUp(key.into()));
    }

    pub fn set_param(&mut self, param: Param, value: f32) {
        self.handle(SynthEvent::Param(ParamChange::new(param, value)));
    }

    pub fn set_attack(&mut self, value: f32) {
        self.set_param(Param::Attack, value);
    }

    pub fn set_decay(&mut self, value: f32) {
        self.set_param(Param::Decay, value);
    }

    pub fn set_sustain(&mut self, value: f32) {
        self.set_param(Param::Sustain, value);
    }

    pub fn set_release(&mut self, value: f32) {
        self.set_param(Param::Release, value);
    }

    pub fn set_blend(&mut self, value: f32) {
        self.set_param(Param::Blend, value);
    }

    pub fn set_bit_depth(&mut self, bits: u32) {
        self.set_param(Param::BitDepth, bits as f32);
    }

    pub fn set_cutoff(&mut self, hz: f32) {
        self.set_param(Param::Cutoff, hz);
    }

    pub fn set_volume(&mut self, value: f32) {
        self.set_param(Param::Volume, value);
    }

    pub fn engine_ready(&mut self) {
        self.handle(SynthEvent::EngineReady);
    }

    pub fn voice_silent(&mut self, key: impl Into<KeyId>, generation: u64) {
        self.handle(SynthEvent::VoiceSilent {
            key: key.into(),
            generation,
        });
    }

    /// The current `(keys, params)` snapshot pair.
    pub fn snapshot(&self) -> (KeyState, VoiceParams) {
        (self.tracker.snapshot(), self.params)
    }

    /// The most recently built graph.
    pub fn graph(&self) -> &AggregateGraph {
        &self.graph
    }

    pub fn keys(&self) -> &KeyState {
        self.tracker.state()
    }

    pub fn params(&self) -> &VoiceParams {
        &self.params
    }

    pub fn table(&self) -> &PitchTable {
        &self.table
    }

    pub fn is_engine_ready(&self) -> bool {
        self.dispatcher.is_open()
    }

    pub fn engine(&self) -> &E {
        self.dispatcher.engine()
    }

    pub fn engine_mut(&mut self) -> &mut E {
        self.dispatcher.engine_mut()
    }

    fn rebuild(&mut self) {
        self.graph = build_graph(&self.table, self.tracker.state(), &self.params);
        self.dispatcher.dispatch(self.graph.clone());
    }
}
