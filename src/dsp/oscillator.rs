use std::f32::consts::TAU;

/// Waveforms the graph can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Saw,
}

/// Phase accumulator in [0, 1).
///
/// Frequency is supplied per sample, so a voice keeps its phase when the
/// graph is rebuilt and only the surrounding parameters change.
#[derive(Debug, Clone, Copy, Default)]
pub struct Phase {
    phase: f32,
}

impl Phase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output for the current phase, then advance by `frequency / sample_rate`.
    pub fn next_sample(&mut self, waveform: Waveform, frequency: f32, sample_rate: f32) -> f32 {
        let out = match waveform {
            Waveform::Sine => (TAU * self.phase).sin(),
            // naive (non band-limited) ramp from -1 to 1
            Waveform::Saw => 2.0 * self.phase - 1.0,
        };

        self.phase = (self.phase + frequency / sample_rate).rem_euclid(1.0);
        out
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_sine() {
        let sample_rate = 48_000.0;
        let freq = 440.0;
        let mut phase = Phase::new();

        let samples: Vec<f32> = (0..128)
            .map(|_| phase.next_sample(Waveform::Sine, freq, sample_rate))
            .collect();

        // sample n should be sin(2pi f n / sr)
        let n = 12;
        let expected = (TAU * freq * n as f32 / sample_rate).sin();
        assert!(
            (samples[n] - expected).abs() < 1e-4,
            "expected {expected}, got {}",
            samples[n]
        );
    }

    #[test]
    fn saw_ramps_and_wraps() {
        let mut phase = Phase::new();
        // 4 samples per cycle
        let samples: Vec<f32> = (0..8)
            .map(|_| phase.next_sample(Waveform::Saw, 1.0, 4.0))
            .collect();

        assert_eq!(&samples[..4], &[-1.0, -0.5, 0.0, 0.5]);
        assert_eq!(&samples[4..], &[-1.0, -0.5, 0.0, 0.5]);
    }
}
