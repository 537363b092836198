//! Hands rebuilt graphs to the rendering engine.
//!
//! Once the engine is up every graph is forwarded, replacing whatever the
//! engine was playing. There is no diffing or rate limiting; the engine
//! reconciles node state by key on its own. Before the engine is ready, graphs are either parked
//! (only the most recent one, since each graph is complete state) or
//! dropped, depending on [`PendingPolicy`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::graph::{AggregateGraph, GraphDiff};

/// A consumer of graph descriptions.
pub trait RenderEngine {
    /// Start playing `graph` in place of the previous one.
    fn render(&mut self, graph: AggregateGraph);
}

impl<E: RenderEngine + ?Sized> RenderEngine for Box<E> {
    fn render(&mut self, graph: AggregateGraph) {
        (**self).render(graph)
    }
}

/// What happens to graphs produced before the engine is ready.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PendingPolicy {
    /// Keep the latest graph and send it when the engine becomes ready.
    #[default]
    Latest,
    /// Discard it; the next event after readiness sends fresh state.
    Drop,
}

pub struct Dispatcher<E> {
    engine: E,
    open: bool,
    policy: PendingPolicy,
    pending: Option<AggregateGraph>,
    /// Kept only while debug logging is on, to diff the next graph against.
    last_sent: Option<AggregateGraph>,
}

impl<E: RenderEngine> Dispatcher<E> {
    pub fn new(engine: E, policy: PendingPolicy) -> Self {
        Self {
            engine,
            open: false,
            policy,
            pending: None,
            last_sent: None,
        }
    }

    /// Forward `graph`, or hold/drop it while the gate is closed.
    pub fn dispatch(&mut self, graph: AggregateGraph) {
        if !self.open {
            match self.policy {
                PendingPolicy::Latest => {
                    trace!(voices = graph.len(), "engine not ready, parking graph");
                    self.pending = Some(graph);
                }
                PendingPolicy::Drop => {
                    trace!(voices = graph.len(), "engine not ready, dropping graph");
                }
            }
            return;
        }

        self.send(graph);
    }

    /// Open the initialisation gate and flush any parked graph.
    pub fn open(&mut self) {
        if self.open {
            return;
        }
        self.open = true;
        debug!("render engine ready");

        if let Some(graph) = self.pending.take() {
            self.send(graph);
        }
    }

    pub fn set_policy(&mut self, policy: PendingPolicy) {
        self.policy = policy;
        if policy == PendingPolicy::Drop {
            self.pending = None;
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    fn send(&mut self, graph: AggregateGraph) {
        if tracing::enabled!(tracing::Level::DEBUG) {
            let previous = self.last_sent.take().unwrap_or_default();
            let diff = GraphDiff::between(&previous, &graph);
            debug!(
                voices = graph.len(),
                added = ?diff.added,
                removed = ?diff.removed,
                changed = diff.changed.len(),
                "dispatching graph"
            );
            self.last_sent = Some(graph.clone());
        } else {
            self.last_sent = None;
        }

        self.engine.render(graph);
    }
}
