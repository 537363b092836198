use crate::MIN_TIME;

/*
Gate-driven ADSR Envelope
=========================

A linear attack/decay/sustain/release contour. The envelope does not know
about keys or notes, only about a gate: a rising gate starts the attack, a
falling gate starts the release.

  Level
    1.0 ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲
    0.0 └─╱───────────────────╲──→ Time
          A     D      S       R

Stage transitions:

    Idle ──gate↑──→ Attack ──level=1──→ Decay ──level=S──→ Sustain
      ↑                 │                  │                  │
      │                 └──────gate↓───────┴──────────────────┘
      │                                    ↓
      └─────────────level=0─────────── Release

Unlike a patch envelope whose shape is fixed at construction, the parameters
here can change at any sample: the synth rebuilds its graph whenever a
slider moves and the new attack/decay/sustain/release values arrive while a
voice is mid-contour. Per-sample increments are therefore derived from the
current parameters every sample. Release is the exception: its slope is
fixed when the gate falls (start level and length in samples), so the
contour lands exactly on zero.

A gate that falls before the envelope has produced a single sample (a key
tapped faster than one audio block) does not cancel the note. The release
is held back until the attack peaks, so every tap is heard.

Per-sample increment for a stage of `t` seconds covering a level change `d`:

    increment = d / (t * sample_rate)
*/

/// The current stage of the envelope state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// ADSR shape in seconds (attack, decay, release) and level (sustain).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrShape {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl AdsrShape {
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack: attack.max(MIN_TIME),
            decay: decay.max(MIN_TIME),
            sustain: sustain.clamp(0.0, 1.0),
            release: release.max(MIN_TIME),
        }
    }
}

impl Default for AdsrShape {
    fn default() -> Self {
        Self::new(0.01, 0.1, 0.7, 0.3)
    }
}

#[derive(Debug, Clone)]
pub struct Envelope {
    sample_rate: f32,
    shape: AdsrShape,

    stage: EnvelopeStage,
    level: f32,
    gate: bool,

    release_start_level: f32,
    release_total_samples: u32,
    release_elapsed_samples: u32,
    /// Gate fell before the attack produced anything.
    release_pending: bool,
}

impl Envelope {
    pub fn new(sample_rate: f32) -> Self {
        Self::with_shape(sample_rate, AdsrShape::default())
    }

    pub fn with_shape(sample_rate: f32, shape: AdsrShape) -> Self {
        Self {
            sample_rate,
            shape,
            stage: EnvelopeStage::Idle,
            level: 0.0,
            gate: false,
            release_start_level: 0.0,
            release_total_samples: 1,
            release_elapsed_samples: 0,
            release_pending: false,
        }
    }

    /// Replace the shape. Takes effect on the next sample; an ongoing
    /// release keeps the slope it started with.
    pub fn set_shape(&mut self, shape: AdsrShape) {
        self.shape = shape;
    }

    /// Feed the gate for the next sample. Only edges change the stage.
    pub fn set_gate(&mut self, high: bool) {
        if high == self.gate {
            return;
        }
        self.gate = high;
        if high {
            self.note_on();
        } else {
            self.note_off();
        }
    }

    /// Restart the attack from zero.
    pub fn note_on(&mut self) {
        self.gate = true;
        self.level = 0.0;
        self.stage = EnvelopeStage::Attack;
        self.release_elapsed_samples = 0;
        self.release_pending = false;
    }

    /// Release from the current level.
    pub fn note_off(&mut self) {
        self.gate = false;
        if self.stage == EnvelopeStage::Idle {
            return;
        }
        if self.stage == EnvelopeStage::Attack && self.level <= 0.0 {
            self.release_pending = true;
            return;
        }

        self.start_release();
    }

    fn start_release(&mut self) {
        self.release_pending = false;
        self.release_start_level = self.level;
        self.release_total_samples = (self.shape.release * self.sample_rate).round().max(1.0) as u32;
        self.release_elapsed_samples = 0;
        self.stage = EnvelopeStage::Release;
    }

    /// Advance by one sample and return the new level.
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => {
                self.level = 0.0;
            }

            EnvelopeStage::Attack => {
                self.level += 1.0 / (self.shape.attack * self.sample_rate);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                    if self.release_pending {
                        self.start_release();
                    }
                }
            }

            EnvelopeStage::Decay => {
                let target = self.shape.sustain;
                self.level -= (1.0 - target) / (self.shape.decay * self.sample_rate);
                if self.level <= target {
                    self.level = target;
                    self.stage = EnvelopeStage::Sustain;
                }
            }

            EnvelopeStage::Sustain => {
                // follows sustain changes made while the key is held
                self.level = self.shape.sustain;
            }

            EnvelopeStage::Release => {
                let progress =
                    self.release_elapsed_samples as f32 / self.release_total_samples as f32;
                self.level = (self.release_start_level * (1.0 - progress)).max(0.0);
                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);

                if self.release_elapsed_samples >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    /// True while the envelope produces output (not idle).
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }
}
