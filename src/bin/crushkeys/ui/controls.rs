//! Parameter panel and keyboard picture

use crushkeys::{keys::QWERTY_LAYOUT, KeyId, KeyPhase, KeyState, Param, PitchTable, VoiceParams};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const BAR_WIDTH: usize = 12;

/// Keyboard rows as drawn, top row first, with their indent.
const ROWS: [(&str, usize); 4] = [("Digit", 0), ("KeyQ", 1), ("KeyA", 2), ("KeyZ", 3)];

fn format_value(param: Param, params: &VoiceParams) -> String {
    match param {
        Param::Attack => format!("{:.2}s", params.attack_secs()),
        Param::Decay => format!("{:.2}s", params.decay_secs()),
        Param::Sustain => format!("{:.0}%", params.sustain_level() * 100.0),
        Param::Release => format!("{:.2}s", params.release_secs()),
        Param::Blend => format!("{:.2}", params.blend()),
        Param::BitDepth => format!("{} bit", params.bit_depth()),
        Param::Cutoff => format!("{:.0}Hz", params.cutoff_hz()),
        Param::Volume => format!("{:.2}", params.volume()),
    }
}

/// Fraction of the control range covered by the current value.
fn fill(param: Param, value: f32) -> f32 {
    let range = param.range();
    let span = range.end() - range.start();
    if span <= 0.0 {
        return 0.0;
    }
    ((value - range.start()) / span).clamp(0.0, 1.0)
}

pub fn render_params(frame: &mut Frame, area: Rect, params: &VoiceParams, selected: Param) {
    let block = Block::default().title(" Voice ").borders(Borders::ALL);

    let lines: Vec<Line> = Param::ALL
        .iter()
        .map(|&param| {
            let filled = (fill(param, params.get(param)) * BAR_WIDTH as f32).round() as usize;
            let bar = format!("{}{}", "█".repeat(filled), "·".repeat(BAR_WIDTH - filled));
            let style = if param == selected {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(format!(" {:<9}", param.label()), style),
                Span::styled(bar, Style::default().fg(Color::Cyan)),
                Span::raw(format!(" {}", format_value(param, params))),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

pub fn render_keyboard(frame: &mut Frame, area: Rect, keys: &KeyState, table: &PitchTable) {
    let block = Block::default().title(" Keys ").borders(Borders::ALL);

    let mut lines = Vec::with_capacity(ROWS.len() * 2);
    for (first, indent) in ROWS {
        let row = layout_row(first);
        let mut spans = vec![Span::raw(" ".repeat(indent * 2 + 1))];
        for code in row {
            let id = KeyId::from(*code);
            let style = match keys.phase(&id) {
                Some(KeyPhase::Held) => Style::default()
                    .fg(Color::Black)
                    .bg(Color::Green)
                    .add_modifier(Modifier::BOLD),
                Some(KeyPhase::Releasing { .. }) => Style::default().fg(Color::Black).bg(Color::Yellow),
                None if table.contains(&id) => Style::default().fg(Color::White),
                None => Style::default().fg(Color::DarkGray),
            };
            spans.push(Span::styled(format!(" {} ", short_label(code)), style));
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));
        lines.push(Line::default());
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Run of consecutive layout keys sharing the prefix of `first`.
fn layout_row(first: &str) -> &'static [&'static str] {
    let start = QWERTY_LAYOUT
        .iter()
        .position(|code| code.starts_with(first))
        .unwrap_or(QWERTY_LAYOUT.len());
    let len = match first {
        "KeyZ" => 7,
        "KeyA" => 9,
        _ => 10,
    };
    let end = (start + len).min(QWERTY_LAYOUT.len());
    &QWERTY_LAYOUT[start..end]
}

fn short_label(code: &str) -> &str {
    code.strip_prefix("Key")
        .or_else(|| code.strip_prefix("Digit"))
        .unwrap_or(code)
}
