use std::f32::consts::PI;

/*
State-Variable Lowpass
======================

Topology-preserving-transform (TPT) state-variable filter, lowpass output
only. Two trapezoidal integrators give a 12 dB/octave slope that stays
stable while the cutoff moves, which it does every time the cutoff slider
is touched.

    g = tan(π · cutoff / sample_rate)
    k = 1 / Q

Q = 1 is slightly resonant (about +1.2 dB at cutoff); Q = 0.707 would be
maximally flat. The cutoff is kept under Nyquist because tan() diverges
there.
*/

/// Highest cutoff as a fraction of the sample rate.
const MAX_CUTOFF_RATIO: f32 = 0.49;

#[derive(Debug, Clone, Default)]
pub struct SvFilter {
    ic1eq: f32, // first integrator memory
    ic2eq: f32, // second integrator memory
}

impl SvFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn coefficients(cutoff_hz: f32, q: f32, sample_rate: f32) -> (f32, f32) {
        let cutoff = cutoff_hz.clamp(1.0, sample_rate * MAX_CUTOFF_RATIO);
        let g = (PI * cutoff / sample_rate).tan();
        let k = 1.0 / q.max(0.01);
        (g, k)
    }

    /// Filter one sample at the given cutoff and Q.
    pub fn next_sample(&mut self, input: f32, cutoff_hz: f32, q: f32, sample_rate: f32) -> f32 {
        let (g, k) = Self::coefficients(cutoff_hz, q, sample_rate);

        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = input - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        v2
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}
