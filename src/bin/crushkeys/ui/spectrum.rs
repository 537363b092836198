//! Spectrum analyzer
//!
//! Hann-windowed FFT of the scope buffer, read out at log-spaced
//! frequencies. Bars fall back slowly so short notes stay visible.

use std::sync::Arc;

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Number of frequency points to display
const SPECTRUM_BINS: usize = 64;

const FLOOR_DB: f64 = -100.0;

/// dB lost per frame when the signal drops
const FALL_DB: f64 = 1.5;

pub struct SpectrumAnalyzer {
    window: Vec<f32>,
    /// FFT bin read for each display point
    bin_indices: Vec<usize>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    /// (log10 frequency, magnitude dB)
    spectrum: Vec<(f64, f64)>,
    /// Full-scale sine reference, so 0 dB means a peak of 1.0
    reference: f32,
}

impl SpectrumAnalyzer {
    pub fn new(fft_len: usize, sample_rate: f32) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(fft_len);

        let window: Vec<f32> = (0..fft_len)
            .map(|i| {
                if fft_len > 1 {
                    let x = i as f32 / (fft_len - 1) as f32;
                    0.5 * (1.0 - (2.0 * std::f32::consts::PI * x).cos())
                } else {
                    1.0
                }
            })
            .collect();
        let reference = (window.iter().sum::<f32>() / 2.0).max(f32::EPSILON);

        let nyquist = (sample_rate / 2.0).min(20_000.0).max(40.0) as f64;
        let (low, high) = (20.0f64.log10(), nyquist.log10());
        let last_bin = (fft_len / 2).saturating_sub(1);

        let mut bin_indices = Vec::with_capacity(SPECTRUM_BINS);
        let mut spectrum = Vec::with_capacity(SPECTRUM_BINS);
        for i in 0..SPECTRUM_BINS {
            let log_freq = low + (high - low) * i as f64 / (SPECTRUM_BINS - 1) as f64;
            let freq = 10f64.powf(log_freq);
            let index = (freq * fft_len as f64 / sample_rate as f64).round() as usize;
            bin_indices.push(index.min(last_bin));
            spectrum.push((log_freq, FLOOR_DB));
        }

        Self {
            window,
            bin_indices,
            fft,
            scratch: vec![Complex::new(0.0, 0.0); fft_len],
            spectrum,
            reference,
        }
    }

    /// Analyze `buffer`; ignored unless it is exactly the FFT length.
    pub fn update(&mut self, buffer: &[f32]) {
        if buffer.len() != self.window.len() {
            return;
        }

        for ((slot, &sample), &w) in self.scratch.iter_mut().zip(buffer).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        for ((_, shown), &index) in self.spectrum.iter_mut().zip(&self.bin_indices) {
            let magnitude = self.scratch[index].norm() / self.reference;
            let db = (20.0 * (magnitude.max(1e-6) as f64).log10()).max(FLOOR_DB);
            *shown = if db >= *shown { db } else { (*shown - FALL_DB).max(db) };
        }
    }

    pub fn data(&self) -> &[(f64, f64)] {
        &self.spectrum
    }
}

pub fn render_spectrum(frame: &mut Frame, area: Rect, spectrum: &[(f64, f64)]) {
    let block = Block::default().title(" Spectrum ").borders(Borders::ALL);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(spectrum);

    let (low, high) = match (spectrum.first(), spectrum.last()) {
        (Some(first), Some(last)) if last.0 > first.0 => (first.0, last.0),
        _ => (1.0, 4.3),
    };

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([low, high])
                .labels(vec!["20", "200", "2k", "20k"])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([FLOOR_DB, 6.0])
                .labels(vec!["-100", "-60", "-20", "0"])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
