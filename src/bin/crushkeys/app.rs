//! Audio setup and the UI/control loop.
//!
//! Two threads: the cpal callback owns the `GraphPlayer`, everything else
//! (terminal input, the synth reducer, drawing) runs here on the main thread.

use std::{
    collections::HashMap,
    io::stdout,
    time::{Duration, Instant},
};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossterm::{
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::supports_keyboard_enhancement,
};
use crushkeys::{
    config::{Config, KeyboardConfig},
    engine::{self, GraphSender},
    KeyId, Param, Synth, SynthEvent, MAX_BLOCK_SIZE,
};
use ratatui::DefaultTerminal;
use rtrb::{Consumer, PushError, RingBuffer};
use tracing::{debug, error, info};

use crate::ui::{self, keymap, SpectrumAnalyzer, View, VIS_BUFFER_SIZE};

/// Mono samples buffered for the scope between UI frames.
const SCOPE_RING_LEN: usize = VIS_BUFFER_SIZE * 8;

/// Where key releases come from.
#[derive(Debug, Clone, Copy)]
pub enum ReleaseMode {
    /// The terminal reports key-up events.
    KeyEvents,
    /// No key-up events; each press releases after the given delay.
    Timed(Duration),
}

pub fn run(config: Config) -> EyreResult<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let stream_config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = stream_config.sample_rate().0 as f32;
    let channels = stream_config.channels() as usize;
    info!(sample_rate, channels, "opening output stream");

    let (sender, player, engine_rx) = engine::channel(sample_rate);
    let (scope_tx, scope_rx) = RingBuffer::<f32>::new(SCOPE_RING_LEN);

    let stream = device
        .build_output_stream(
            &stream_config.into(),
            {
                let mut player = player;
                let mut scope_tx = scope_tx;
                let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];
                move |data: &mut [f32], _| {
                    for chunk in data.chunks_mut(MAX_BLOCK_SIZE * channels) {
                        let frames = chunk.len() / channels;
                        let block = &mut render_buf[..frames];
                        player.render_block(block);

                        // Duplicate mono to all channels
                        for (frame, &s) in chunk.chunks_mut(channels).zip(block.iter()) {
                            frame.fill(s);
                        }

                        for &s in block.iter() {
                            if let Err(PushError::Full(_)) = scope_tx.push(s) {
                                break;
                            }
                        }
                    }
                }
            },
            |err| error!(%err, "audio stream error"),
            None,
        )
        .wrap_err("failed to build output stream")?;

    let mut synth = Synth::new(sender)
        .with_params(config.voice)
        .with_pending_policy(config.dispatch.pending);

    stream.play().wrap_err("failed to start output stream")?;
    synth.engine_ready();

    let mut terminal = ratatui::init();
    let enhanced = enable_key_release_events();
    let release = if enhanced {
        ReleaseMode::KeyEvents
    } else {
        timed_release(&config.keyboard)
    };
    info!(?release, "keyboard ready");

    let mut app = App::new(synth, engine_rx, scope_rx, sample_rate, release);
    let result = app.run(&mut terminal);

    if enhanced {
        let _ = execute!(stdout(), PopKeyboardEnhancementFlags);
    }
    ratatui::restore();
    drop(stream);
    result
}

fn timed_release(config: &KeyboardConfig) -> ReleaseMode {
    ReleaseMode::Timed(Duration::from_millis(config.auto_release_ms))
}

/// Ask the terminal for press/repeat/release reporting.
fn enable_key_release_events() -> bool {
    match supports_keyboard_enhancement() {
        Ok(true) => execute!(
            stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )
        .is_ok(),
        _ => false,
    }
}

struct App {
    synth: Synth<GraphSender>,
    engine_rx: Consumer<SynthEvent>,
    scope_rx: Consumer<f32>,
    scope: Vec<f32>,
    spectrum: SpectrumAnalyzer,
    sample_rate: f32,
    selected: usize,
    release: ReleaseMode,
    /// Pending automatic releases, timed mode only.
    deadlines: HashMap<KeyId, Instant>,
    should_quit: bool,
}

impl App {
    fn new(
        synth: Synth<GraphSender>,
        engine_rx: Consumer<SynthEvent>,
        scope_rx: Consumer<f32>,
        sample_rate: f32,
        release: ReleaseMode,
    ) -> Self {
        Self {
            synth,
            engine_rx,
            scope_rx,
            scope: vec![0.0; VIS_BUFFER_SIZE],
            spectrum: SpectrumAnalyzer::new(VIS_BUFFER_SIZE, sample_rate),
            sample_rate,
            selected: 0,
            release,
            deadlines: HashMap::new(),
            should_quit: false,
        }
    }

    fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            // Engine reports first, so reclaimed keys vanish this frame
            self.synth.drain(&mut self.engine_rx);
            self.synth.engine_mut().flush();
            self.release_expired(Instant::now());

            self.poll_scope();
            self.spectrum.update(&self.scope);

            let view = View {
                params: self.synth.params(),
                keys: self.synth.keys(),
                table: self.synth.table(),
                selected: Param::ALL[self.selected],
                scope: &self.scope,
                spectrum: self.spectrum.data(),
                sample_rate: self.sample_rate,
                key_events: matches!(self.release, ReleaseMode::KeyEvents),
            };
            terminal.draw(|frame| ui::render(frame, &view))?;

            // ~60fps
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }
        }

        Ok(())
    }

    fn poll_scope(&mut self) {
        let mut fresh = 0;
        while let Ok(sample) = self.scope_rx.pop() {
            self.scope.push(sample);
            fresh += 1;
        }
        if fresh > 0 && self.scope.len() > VIS_BUFFER_SIZE {
            let excess = self.scope.len() - VIS_BUFFER_SIZE;
            self.scope.drain(0..excess);
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let pressed = matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat);

        match key.code {
            KeyCode::Esc if key.kind == KeyEventKind::Press => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Up if pressed => {
                self.selected = (self.selected + Param::ALL.len() - 1) % Param::ALL.len();
            }
            KeyCode::Down if pressed => {
                self.selected = (self.selected + 1) % Param::ALL.len();
            }
            KeyCode::Left if pressed => self.nudge(-1.0),
            KeyCode::Right if pressed => self.nudge(1.0),
            code => {
                if let Some(id) = keymap::key_id(code) {
                    self.play(id, key.kind);
                }
            }
        }
    }

    fn nudge(&mut self, direction: f32) {
        let param = Param::ALL[self.selected];
        let value = self.synth.params().get(param) + direction * param.step();
        debug!(%param, value, "parameter nudge");
        self.synth.set_param(param, value);
    }

    fn play(&mut self, id: KeyId, kind: KeyEventKind) {
        match (self.release, kind) {
            (_, KeyEventKind::Release) => self.synth.key_up(id),
            (ReleaseMode::KeyEvents, KeyEventKind::Repeat) => {}
            (ReleaseMode::KeyEvents, _) => self.synth.key_down(id),
            (ReleaseMode::Timed(hold), _) => {
                // Terminals without release events repeat the press while the
                // key is down; every repeat pushes the release back.
                self.deadlines.insert(id.clone(), Instant::now() + hold);
                self.synth.key_down(id);
            }
        }
    }

    fn release_expired(&mut self, now: Instant) {
        let expired: Vec<KeyId> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in expired {
            self.deadlines.remove(&key);
            self.synth.key_up(key);
        }
    }
}
