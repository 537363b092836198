use std::{fmt, sync::Arc};

use crate::keys::KeyId;

/// Primitive node types understood by a rendering engine.
///
/// | kind      | inputs                                   | output                     |
/// | --------- | ---------------------------------------- | -------------------------- |
/// | `Const`   | none                                     | the constant               |
/// | `Sine`    | frequency                                | sine at that frequency     |
/// | `Saw`     | frequency                                | sawtooth at that frequency |
/// | `Mul`     | any number                               | product (1 if empty)       |
/// | `Add`     | any number                               | sum (0 if empty)           |
/// | `Div`     | numerator, denominator                   | quotient                   |
/// | `Floor`   | signal                                   | largest integer ≤ signal   |
/// | `Lowpass` | cutoff Hz, Q, signal                     | filtered signal            |
/// | `Adsr`    | attack s, decay s, sustain, release s, gate | envelope level          |
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    Const(f32),
    Sine,
    Saw,
    Mul,
    Add,
    Div,
    Floor,
    Lowpass,
    Adsr,
}

impl NodeKind {
    /// True for nodes whose output depends on their own history.
    pub fn is_stateful(&self) -> bool {
        matches!(
            self,
            NodeKind::Sine | NodeKind::Saw | NodeKind::Lowpass | NodeKind::Adsr
        )
    }
}

/// Stable identity for a node across graph rebuilds.
///
/// Two descriptions that give a node the same key refer to the same engine
/// state (oscillator phase, filter memory, envelope stage), even though the
/// descriptions themselves were built independently.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey(Arc<str>);

impl NodeKey {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    /// Key for the `role` node of the voice belonging to `key`, e.g. `KeyA/env`.
    pub fn voice(key: &KeyId, role: &str) -> Self {
        Self(Arc::from(format!("{key}/{role}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable signal-graph description node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    key: Option<NodeKey>,
    inputs: Vec<Node>,
}

impl Node {
    fn new(kind: NodeKind, inputs: Vec<Node>) -> Self {
        Self {
            kind,
            key: None,
            inputs,
        }
    }

    pub fn constant(value: f32) -> Self {
        Self::new(NodeKind::Const(value), Vec::new())
    }

    pub fn sine(frequency: Node) -> Self {
        Self::new(NodeKind::Sine, vec![frequency])
    }

    pub fn saw(frequency: Node) -> Self {
        Self::new(NodeKind::Saw, vec![frequency])
    }

    pub fn mul(inputs: impl IntoIterator<Item = Node>) -> Self {
        Self::new(NodeKind::Mul, inputs.into_iter().collect())
    }

    pub fn add(inputs: impl IntoIterator<Item = Node>) -> Self {
        Self::new(NodeKind::Add, inputs.into_iter().collect())
    }

    pub fn div(numerator: Node, denominator: Node) -> Self {
        Self::new(NodeKind::Div, vec![numerator, denominator])
    }

    pub fn floor(signal: Node) -> Self {
        Self::new(NodeKind::Floor, vec![signal])
    }

    pub fn lowpass(cutoff: Node, q: Node, signal: Node) -> Self {
        Self::new(NodeKind::Lowpass, vec![cutoff, q, signal])
    }

    pub fn adsr(attack: Node, decay: Node, sustain: Node, release: Node, gate: Node) -> Self {
        Self::new(NodeKind::Adsr, vec![attack, decay, sustain, release, gate])
    }

    /// Attach a stable identity.
    pub fn keyed(mut self, key: NodeKey) -> Self {
        self.key = Some(key);
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn key(&self) -> Option<&NodeKey> {
        self.key.as_ref()
    }

    pub fn inputs(&self) -> &[Node] {
        &self.inputs
    }

    /// The constant value, if this is a `Const` node.
    pub fn as_constant(&self) -> Option<f32> {
        match self.kind {
            NodeKind::Const(value) => Some(value),
            _ => None,
        }
    }

    /// True for the empty sum, the description of silence.
    pub fn is_silent(&self) -> bool {
        self.kind == NodeKind::Add && self.inputs.is_empty()
    }

    /// Depth-first pre-order visit of this node and everything below it.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        f(self);
        for input in &self.inputs {
            input.visit(f);
        }
    }

    /// First node (depth-first) carrying `key`.
    pub fn find(&self, key: &NodeKey) -> Option<&Node> {
        if self.key.as_ref() == Some(key) {
            return Some(self);
        }
        self.inputs.iter().find_map(|input| input.find(key))
    }

    /// Keys of every keyed node below and including this one.
    pub fn keys(&self) -> Vec<&NodeKey> {
        let mut keys = Vec::new();
        self.visit(&mut |node| {
            if let Some(key) = node.key() {
                keys.push(key);
            }
        });
        keys
    }
}
