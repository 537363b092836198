//! Triggered oscilloscope

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

/// Index of the first rising zero crossing in the first half of the buffer,
/// so a steady tone stands still on screen.
fn trigger_point(buffer: &[f32]) -> usize {
    let search = buffer.len() / 2;
    buffer
        .windows(2)
        .take(search)
        .position(|pair| pair[0] <= 0.0 && pair[1] > 0.0)
        .unwrap_or(0)
}

pub fn render_waveform(frame: &mut Frame, area: Rect, audio_buffer: &[f32]) {
    let block = Block::default().title(" Scope ").borders(Borders::ALL);

    let start = trigger_point(audio_buffer);
    let visible = &audio_buffer[start..(start + audio_buffer.len() / 2).min(audio_buffer.len())];

    let data: Vec<(f64, f64)> = visible
        .iter()
        .enumerate()
        .map(|(i, &sample)| (i as f64 / visible.len().max(1) as f64, sample as f64))
        .collect();

    // Zoom in on quiet signals, never past full scale
    let peak = visible.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    let range = (peak as f64 * 1.2).clamp(0.1, 1.0);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, 1.0])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([-range, range])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_finds_rising_crossing() {
        let buffer = [0.5, 0.2, -0.3, -0.1, 0.4, 0.8, 0.1, -0.2];
        assert_eq!(trigger_point(&buffer), 3);
    }

    #[test]
    fn trigger_defaults_to_start() {
        assert_eq!(trigger_point(&[0.0; 16]), 0);
        assert_eq!(trigger_point(&[]), 0);
    }
}
