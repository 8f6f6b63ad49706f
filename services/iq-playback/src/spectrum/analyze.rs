//! Time-domain magnitude and DFT magnitude of a whole capture

use num_complex::Complex;
use rustfft::FftPlanner;

use super::freq::{frequency_axis, wrap_index};

/// Everything the two plots need, computed from one buffer
#[derive(Debug, Clone)]
pub struct Spectrum {
    pub sample_rate: f64,

    /// |x[n]| per sample
    pub magnitude: Vec<f32>,

    /// Bin frequencies in FFT output order
    pub frequencies: Vec<f64>,

    /// |X[k]|, unnormalised, in FFT output order
    pub fft_magnitude: Vec<f32>,
}

impl Spectrum {
    /// Run a single forward FFT over the full buffer.
    pub fn compute(samples: &[Complex<f32>], sample_rate: f64) -> Self {
        let magnitude = samples.iter().map(|s| s.norm()).collect();

        let mut bins = samples.to_vec();
        if !bins.is_empty() {
            let mut planner = FftPlanner::<f32>::new();
            let fft = planner.plan_fft_forward(bins.len());
            fft.process(&mut bins);
        }

        Self {
            sample_rate,
            magnitude,
            frequencies: frequency_axis(samples.len(), sample_rate),
            fft_magnitude: bins.iter().map(|b| b.norm()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.magnitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitude.is_empty()
    }

    /// (frequency, |X|) pairs in ascending frequency order.
    pub fn shifted(&self) -> Vec<(f64, f32)> {
        let mut pairs: Vec<(f64, f32)> = self
            .frequencies
            .iter()
            .copied()
            .zip(self.fft_magnitude.iter().copied())
            .collect();
        let wrap = wrap_index(pairs.len());
        pairs.rotate_left(wrap);
        pairs
    }

    /// Frequency of the strongest bin
    pub fn peak_frequency(&self) -> Option<f64> {
        self.fft_magnitude
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| self.frequencies[i])
    }
}
