//! Configuration loaded from environment variables

use std::path::PathBuf;

/// Playback configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Recorded sc16 I/Q file
    pub iq_file: PathBuf,

    /// Sample rate the file was recorded at, in Hz
    pub sample_rate: f64,

    /// Where the rendered SVG is written
    pub plot_output: PathBuf,

    /// Plot size in pixels
    pub plot_width: u32,
    pub plot_height: u32,

    /// Maximum points drawn per trace
    pub plot_max_points: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            iq_file: PathBuf::from("usrp_samples.dat"),
            sample_rate: 5e6,
            plot_output: PathBuf::from("spectrum.svg"),
            plot_width: 1280,
            plot_height: 960,
            plot_max_points: 20_000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            iq_file: std::env::var("IQ_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.iq_file),

            sample_rate: std::env::var("SAMPLE_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|rate: &f64| *rate > 0.0)
                .unwrap_or(defaults.sample_rate),

            plot_output: std::env::var("PLOT_OUTPUT")
                .map(PathBuf::from)
                .unwrap_or(defaults.plot_output),

            plot_width: std::env::var("PLOT_WIDTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.plot_width),

            plot_height: std::env::var("PLOT_HEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.plot_height),

            plot_max_points: std::env::var("PLOT_MAX_POINTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.plot_max_points),
        }
    }
}
