use std::collections::BTreeMap;

use crate::{graph::voice::AggregateGraph, keys::KeyId};

/// Per-key difference between two aggregate graphs.
///
/// Rebuilding never patches a graph; this only reports what a rebuild did,
/// so it can be logged or inspected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphDiff {
    pub added: Vec<KeyId>,
    pub removed: Vec<KeyId>,
    pub changed: Vec<KeyId>,
}

impl GraphDiff {
    pub fn between(previous: &AggregateGraph, next: &AggregateGraph) -> Self {
        let before: BTreeMap<&KeyId, _> = previous.voices().iter().map(|v| (&v.key, v)).collect();
        let after: BTreeMap<&KeyId, _> = next.voices().iter().map(|v| (&v.key, v)).collect();

        let mut diff = Self::default();
        for (key, voice) in &after {
            match before.get(key) {
                None => diff.added.push((*key).clone()),
                Some(old) if **old != **voice => diff.changed.push((*key).clone()),
                Some(_) => {}
            }
        }
        diff.removed = before
            .keys()
            .filter(|key| !after.contains_key(*key))
            .map(|key| (*key).clone())
            .collect();

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{graph::voice::build_graph, keys::KeyTracker, keys::PitchTable, params::VoiceParams};

    fn key(code: &str) -> KeyId {
        KeyId::from(code)
    }

    #[test]
    fn reports_added_changed_and_removed_voices() {
        let table = PitchTable::qwerty();
        let params = VoiceParams::default();
        let mut tracker = KeyTracker::new();

        tracker.key_down(key("KeyA"));
        tracker.key_down(key("KeyS"));
        let first = build_graph(&table, &tracker.snapshot(), &params);

        tracker.key_up(&key("KeyA"));
        tracker.key_down(key("KeyD"));
        let second = build_graph(&table, &tracker.snapshot(), &params);

        let diff = GraphDiff::between(&first, &second);
        assert_eq!(diff.added, vec![key("KeyD")]);
        assert_eq!(diff.changed, vec![key("KeyA")]);
        assert!(diff.removed.is_empty());

        let diff = GraphDiff::between(&second, &AggregateGraph::silent());
        assert_eq!(diff.removed, vec![key("KeyA"), key("KeyD"), key("KeyS")]);
    }

    #[test]
    fn identical_graphs_have_empty_diff() {
        let mut tracker = KeyTracker::new();
        tracker.key_down(key("KeyA"));
        let graph = build_graph(&PitchTable::qwerty(), &tracker.snapshot(), &VoiceParams::default());

        assert!(GraphDiff::between(&graph, &graph.clone()).is_empty());
    }
}
