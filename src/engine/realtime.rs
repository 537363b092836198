use std::collections::VecDeque;

use rtrb::{Consumer, Producer, PushError, RingBuffer};
use tracing::warn;

use crate::{
    dispatch::RenderEngine,
    engine::renderer::{GraphCompiler, GraphRenderer, Program},
    graph::AggregateGraph,
    synth::SynthEvent,
};

/// Capacity of the program ring.
pub const GRAPH_QUEUE_CAPACITY: usize = 16;

/// Capacity of the ring carrying replaced programs back to the control side.
pub const RETIRED_QUEUE_CAPACITY: usize = GRAPH_QUEUE_CAPACITY * 2;

/// Capacity of the engine → controller event ring.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// Backlog length at which the sender starts complaining.
const BACKLOG_WARNING: usize = 64;

/// Control-thread half: implements [`RenderEngine`] by compiling graphs and
/// pushing the programs into the ring consumed by [`GraphPlayer`].
///
/// Programs carry slot assignments relative to the one before, so none is
/// ever skipped: what does not fit waits in the backlog, in order.
pub struct GraphSender {
    compiler: GraphCompiler,
    programs: Producer<Program>,
    retired: Consumer<Program>,
    backlog: VecDeque<Program>,
}

impl GraphSender {
    /// Free the programs the audio side is done with and retry the backlog.
    /// Call this from the control loop.
    pub fn flush(&mut self) {
        while let Ok(program) = self.retired.pop() {
            drop(program);
        }

        while let Some(program) = self.backlog.pop_front() {
            if let Err(PushError::Full(program)) = self.programs.push(program) {
                self.backlog.push_front(program);
                break;
            }
        }
    }

    pub fn has_backlog(&self) -> bool {
        !self.backlog.is_empty()
    }
}

impl RenderEngine for GraphSender {
    fn render(&mut self, graph: AggregateGraph) {
        self.backlog.push_back(self.compiler.compile(&graph));
        if self.backlog.len() == BACKLOG_WARNING {
            warn!(queued = BACKLOG_WARNING, "audio side is not picking up programs");
        }
        self.flush();
    }
}

/// Audio-thread half: installs every queued program at each block boundary
/// and renders the last one, reporting silent voices back to the controller.
///
/// Neither allocates nor frees: programs arrive compiled and leave through
/// the retired ring.
pub struct GraphPlayer {
    programs: Consumer<Program>,
    retired: Producer<Program>,
    events: Producer<SynthEvent>,
    renderer: GraphRenderer,
}

impl GraphPlayer {
    /// Render one block of mono samples.
    pub fn render_block(&mut self, out: &mut [f32]) {
        // a program is only taken when its predecessor has somewhere to go
        while self.retired.slots() > 0 {
            let Ok(program) = self.programs.pop() else {
                break;
            };
            let replaced = self.renderer.install(program);
            let _ = self.retired.push(replaced);
        }

        self.renderer.render(out);

        while let Some(event) = self.renderer.next_event() {
            if let Err(PushError::Full(event)) = self.events.push(event) {
                self.renderer.requeue_event(event);
                break;
            }
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.renderer.sample_rate()
    }
}

/// Create the engine pair plus the consumer end of the engine's event queue.
pub fn channel(sample_rate: f32) -> (GraphSender, GraphPlayer, Consumer<SynthEvent>) {
    let (program_tx, program_rx) = RingBuffer::new(GRAPH_QUEUE_CAPACITY);
    let (retired_tx, retired_rx) = RingBuffer::new(RETIRED_QUEUE_CAPACITY);
    let (event_tx, event_rx) = RingBuffer::new(EVENT_QUEUE_CAPACITY);

    let sender = GraphSender {
        compiler: GraphCompiler::new(sample_rate),
        programs: program_tx,
        retired: retired_rx,
        backlog: VecDeque::new(),
    };
    let player = GraphPlayer {
        programs: program_rx,
        retired: retired_tx,
        events: event_tx,
        renderer: GraphRenderer::new(sample_rate),
    };

    (sender, player, event_rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::build_graph,
        keys::{KeyId, KeyTracker, PitchTable},
        params::VoiceParams,
    };

    fn graph_with(codes: &[&str]) -> AggregateGraph {
        let mut tracker = KeyTracker::new();
        for code in codes {
            tracker.key_down(KeyId::from(*code));
        }
        build_graph(&PitchTable::qwerty(), tracker.state(), &VoiceParams::default())
    }

    #[test]
    fn player_installs_every_queued_program() {
        let (mut sender, mut player, _events) = channel(48_000.0);
        sender.render(graph_with(&["KeyA"]));
        sender.render(graph_with(&["KeyA", "KeyS"]));

        let mut block = [0.0f32; 64];
        player.render_block(&mut block);
        assert_eq!(player.renderer.voice_count(), 2);
        assert!(block.iter().any(|&s| s != 0.0));
        assert_eq!(sender.retired.slots(), 2, "both replaced programs come back");
    }

    #[test]
    fn replaced_programs_are_freed_by_the_sender() {
        let (mut sender, mut player, _events) = channel(48_000.0);
        sender.render(graph_with(&["KeyA"]));
        player.render_block(&mut [0.0f32; 16]);
        assert_eq!(sender.retired.slots(), 1);

        sender.flush();
        assert_eq!(sender.retired.slots(), 0);
    }

    #[test]
    fn full_ring_queues_programs_in_order() {
        let (mut sender, mut player, _events) = channel(48_000.0);
        for _ in 0..GRAPH_QUEUE_CAPACITY {
            sender.render(graph_with(&["KeyA"]));
        }
        sender.render(graph_with(&["KeyA", "KeyS"]));
        sender.render(graph_with(&["KeyA", "KeyS", "KeyD"]));
        assert!(sender.has_backlog());

        player.render_block(&mut [0.0f32; 16]);
        assert_eq!(player.renderer.voice_count(), 1);
        sender.flush();
        assert!(!sender.has_backlog());

        player.render_block(&mut [0.0f32; 16]);
        assert_eq!(player.renderer.voice_count(), 3);
    }

    #[test]
    fn tap_within_one_block_is_played() {
        let (mut sender, mut player, mut events) = channel(8_000.0);
        let mut tracker = KeyTracker::new();
        let mut params = VoiceParams::default();
        params.set_attack(0.0);
        params.set_release(5.0);
        tracker.key_down(KeyId::from("KeyA"));
        sender.render(build_graph(&PitchTable::qwerty(), tracker.state(), &params));
        tracker.key_up(&KeyId::from("KeyA"));
        sender.render(build_graph(&PitchTable::qwerty(), tracker.state(), &params));

        let mut block = [0.0f32; 256];
        player.render_block(&mut block);
        assert!(block.iter().any(|&s| s != 0.0));
        assert!(events.pop().is_err(), "still ringing out");
    }

    #[test]
    fn silence_reports_reach_the_controller() {
        let (mut sender, mut player, mut events) = channel(8_000.0);
        let mut tracker = KeyTracker::new();
        let mut params = VoiceParams::default();
        params.set_attack(0.0);
        params.set_release(0.0);
        tracker.key_down(KeyId::from("KeyA"));
        sender.render(build_graph(&PitchTable::qwerty(), tracker.state(), &params));
        player.render_block(&mut [0.0f32; 128]);

        tracker.key_up(&KeyId::from("KeyA"));
        sender.render(build_graph(&PitchTable::qwerty(), tracker.state(), &params));
        player.render_block(&mut [0.0f32; 128]);

        assert_eq!(
            events.pop().ok(),
            Some(SynthEvent::VoiceSilent {
                key: KeyId::from("KeyA"),
                generation: 1
            })
        );
    }
}
