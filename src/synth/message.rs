#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::{keys::KeyId, params::ParamChange};

/// Everything that can change what the synth should be playing.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthEvent {
    KeyDown(KeyId),
    KeyUp(KeyId),
    Param(ParamChange),
    /// The rendering engine finished initialising.
    EngineReady,
    /// The engine reports that a released voice's envelope reached zero.
    VoiceSilent { key: KeyId, generation: u64 },
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<SynthEvent>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<SynthEvent> {
    fn pop(&mut self) -> Option<SynthEvent> {
        Consumer::pop(self).ok()
    }
}

impl MessageReceiver for std::collections::VecDeque<SynthEvent> {
    fn pop(&mut self) -> Option<SynthEvent> {
        self.pop_front()
    }
}
