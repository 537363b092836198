use std::collections::BTreeMap;

use tracing::trace;

use super::KeyId;

/*
Key Lifecycle
=============

Every key runs through a small state machine:

    ┌──────┐  key_down  ┌──────┐  key_up   ┌───────────┐
    │ Idle │ ─────────→ │ Held │ ────────→ │ Releasing │
    └──────┘            └──────┘           └───────────┘
        ↑                   ↑   key_down         │
        │                   └────────────────────┤
        │        reclaim (generation matches)    │
        └────────────────────────────────────────┘

Idle keys are simply absent from the tracker. A released key is NOT dropped
on key_up: its voice has to stay in the graph while the envelope rings out.
It leaves the tracker only when the rendering engine reports that the
release has reached silence.

Each release is stamped with a generation number. The engine echoes the
generation back in its report, so a report that describes an older release
(the key has since been pressed and released again) cannot cut the newer
release short.
*/

/// Where a tracked key is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    /// Key is down; gate is high.
    Held,
    /// Key is up; the voice is ringing out through its release stage.
    Releasing { generation: u64 },
}

impl KeyPhase {
    pub fn is_held(&self) -> bool {
        matches!(self, KeyPhase::Held)
    }
}

/// Immutable snapshot of every tracked key.
///
/// Absence of a key means "not held". Iteration is ordered by key, so graphs
/// derived from equal snapshots list their voices in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyState {
    keys: BTreeMap<KeyId, KeyPhase>,
}

impl KeyState {
    /// True while the key is down (the boolean "held" flag).
    pub fn is_held(&self, key: &KeyId) -> bool {
        self.keys.get(key).is_some_and(KeyPhase::is_held)
    }

    /// True while the key is tracked at all, held or releasing.
    pub fn contains(&self, key: &KeyId) -> bool {
        self.keys.contains_key(key)
    }

    pub fn phase(&self, key: &KeyId) -> Option<KeyPhase> {
        self.keys.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KeyId, KeyPhase)> + '_ {
        self.keys.iter().map(|(key, phase)| (key, *phase))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Mutable owner of the key lifecycle, driven by key events.
#[derive(Debug, Default)]
pub struct KeyTracker {
    state: KeyState,
    next_generation: u64,
}

impl KeyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as held. Pressing a held key again changes nothing.
    pub fn key_down(&mut self, key: KeyId) {
        trace!(%key, "key down");
        self.state.keys.insert(key, KeyPhase::Held);
    }

    /// Start the release of a held key.
    ///
    /// Releasing a key that is already releasing, or was never pressed, is a
    /// no-op: absence already reads as "not held".
    pub fn key_up(&mut self, key: &KeyId) {
        if let Some(phase) = self.state.keys.get_mut(key) {
            if phase.is_held() {
                self.next_generation += 1;
                *phase = KeyPhase::Releasing {
                    generation: self.next_generation,
                };
                trace!(%key, generation = self.next_generation, "key up");
            }
        }
    }

    /// Drop a releasing key once its release has finished.
    ///
    /// Returns `true` if the key was removed. Reports for a different
    /// generation, or for a key that is held again, are ignored.
    pub fn reclaim(&mut self, key: &KeyId, generation: u64) -> bool {
        match self.state.keys.get(key) {
            Some(KeyPhase::Releasing { generation: current }) if *current == generation => {
                self.state.keys.remove(key);
                trace!(%key, generation, "key reclaimed");
                true
            }
            _ => false,
        }
    }

    pub fn snapshot(&self) -> KeyState {
        self.state.clone()
    }

    pub fn state(&self) -> &KeyState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: &str) -> KeyId {
        KeyId::from(code)
    }

    #[test]
    fn release_keeps_key_tracked() {
        let mut tracker = KeyTracker::new();
        tracker.key_down(key("KeyA"));
        tracker.key_up(&key("KeyA"));

        let state = tracker.snapshot();
        assert!(!state.is_held(&key("KeyA")));
        assert!(state.contains(&key("KeyA")), "released key must stay tracked");
    }

    #[test]
    fn double_key_down_is_idempotent() {
        let mut tracker = KeyTracker::new();
        tracker.key_down(key("KeyA"));
        let once = tracker.snapshot();
        tracker.key_down(key("KeyA"));
        let twice = tracker.snapshot();

        assert_eq!(once, twice);
        assert_eq!(twice.len(), 1);
        assert!(twice.is_held(&key("KeyA")));
    }

    #[test]
    fn double_key_up_keeps_first_generation() {
        let mut tracker = KeyTracker::new();
        tracker.key_down(key("KeyA"));
        tracker.key_up(&key("KeyA"));
        let first = tracker.snapshot().phase(&key("KeyA"));
        tracker.key_up(&key("KeyA"));

        assert_eq!(tracker.snapshot().phase(&key("KeyA")), first);
    }

    #[test]
    fn stray_key_up_creates_nothing() {
        let mut tracker = KeyTracker::new();
        tracker.key_up(&key("KeyQ"));
        assert!(tracker.snapshot().is_empty());
    }

    #[test]
    fn reclaim_requires_matching_generation() {
        let mut tracker = KeyTracker::new();
        tracker.key_down(key("KeyA"));
        tracker.key_up(&key("KeyA"));
        let Some(KeyPhase::Releasing { generation: old }) = tracker.state().phase(&key("KeyA"))
        else {
            panic!("expected releasing phase");
        };

        // Re-press and release: the old report is now stale
        tracker.key_down(key("KeyA"));
        assert!(!tracker.reclaim(&key("KeyA"), old), "held key must not be reclaimed");
        tracker.key_up(&key("KeyA"));
        assert!(!tracker.reclaim(&key("KeyA"), old), "stale generation must be ignored");
        assert!(tracker.state().contains(&key("KeyA")));

        let Some(KeyPhase::Releasing { generation: new }) = tracker.state().phase(&key("KeyA"))
        else {
            panic!("expected releasing phase");
        };
        assert!(new > old);
        assert!(tracker.reclaim(&key("KeyA"), new));
        assert!(!tracker.state().contains(&key("KeyA")));
    }

    #[test]
    fn snapshot_is_detached_from_tracker() {
        let mut tracker = KeyTracker::new();
        tracker.key_down(key("KeyS"));
        let before = tracker.snapshot();
        tracker.key_up(&key("KeyS"));

        assert!(before.is_held(&key("KeyS")));
        assert!(!tracker.state().is_held(&key("KeyS")));
    }
}
