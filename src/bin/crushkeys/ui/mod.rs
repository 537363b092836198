//! TUI for crushkeys
//!
//! Parameter panel, a picture of the keyboard with live key states, and
//! scope/spectrum views of the output.

mod controls;
pub mod keymap;
mod spectrum;
mod waveform;

use crushkeys::{KeyState, Param, PitchTable, VoiceParams};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub use spectrum::SpectrumAnalyzer;

use controls::{render_keyboard, render_params};
use spectrum::render_spectrum;
use waveform::render_waveform;

/// Audio visualization buffer size (also the FFT size)
pub const VIS_BUFFER_SIZE: usize = 1024;

/// Everything one frame needs, borrowed from the app.
pub struct View<'a> {
    pub params: &'a VoiceParams,
    pub keys: &'a KeyState,
    pub table: &'a PitchTable,
    pub selected: Param,
    pub scope: &'a [f32],
    pub spectrum: &'a [(f64, f64)],
    pub sample_rate: f32,
    /// Key releases come from the terminal rather than a timer.
    pub key_events: bool,
}

/// Peak and RMS of the scope buffer.
struct AudioStats {
    peak: f32,
    rms: f32,
}

impl AudioStats {
    fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

pub fn render(frame: &mut Frame, view: &View) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Status bar
            Constraint::Length(10), // Params + keyboard
            Constraint::Min(6),     // Scope + spectrum
            Constraint::Length(1),  // Help bar
        ])
        .split(frame.area());

    render_status(frame, chunks[0], view);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(36), Constraint::Min(40)])
        .split(chunks[1]);
    render_params(frame, middle[0], view.params, view.selected);
    render_keyboard(frame, middle[1], view.keys, view.table);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);
    render_waveform(frame, bottom[0], view.scope);
    render_spectrum(frame, bottom[1], view.spectrum);

    let help = Paragraph::new(" [A-Z 0-9] Play  [↑/↓] Select  [←/→] Adjust  [Esc] Quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[3]);
}

fn render_status(frame: &mut Frame, area: Rect, view: &View) {
    let block = Block::default().title(" crushkeys ").borders(Borders::ALL);
    let stats = AudioStats::from_buffer(view.scope);

    let held = view.keys.iter().filter(|(_, phase)| phase.is_held()).count();
    let releasing = view.keys.len() - held;
    let release_source = if view.key_events {
        "key-up events"
    } else {
        "auto release"
    };

    let line = Line::from(vec![
        Span::styled(
            format!(" {:.1}kHz  ", view.sample_rate / 1000.0),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(format!("held {held}  "), Style::default().fg(Color::Green)),
        Span::styled(
            format!("releasing {releasing}  "),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(
            format!("Peak: {:.2}  RMS: {:.2}  ", stats.peak, stats.rms),
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(release_source, Style::default().fg(Color::DarkGray)),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}
