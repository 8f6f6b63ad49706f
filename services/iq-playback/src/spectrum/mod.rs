//! Magnitude and FFT spectrum of a sample buffer

mod analyze;
mod freq;

pub use analyze::Spectrum;
