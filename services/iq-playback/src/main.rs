//! I/Q Playback - plot a recorded sc16 capture
//!
//! Loads interleaved 16-bit I/Q samples from disk, then renders the
//! time-domain magnitude and the full-length FFT magnitude to an SVG file.

mod config;
mod iq;
mod plot;
mod spectrum;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use plot::PlotSettings;
use spectrum::Spectrum;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("iq_playback=info")),
        )
        .with_target(false)
        .init();

    info!("===========================================");
    info!("   I/Q Playback - sc16 file spectrum");
    info!("===========================================");

    let config = Config::from_env();

    info!("Configuration:");
    info!("  Input file: {}", config.iq_file.display());
    info!("  Sample rate: {:.3} MSPS", config.sample_rate / 1e6);
    info!("  Plot output: {}", config.plot_output.display());
    info!("  Plot size: {}x{}", config.plot_width, config.plot_height);

    run(&config)
}

/// Load, transform and plot one file.
fn run(config: &Config) -> Result<()> {
    let samples = iq::load_cs16(&config.iq_file)
        .with_context(|| format!("Failed to load {}", config.iq_file.display()))?;
    info!(
        "Loaded {} samples ({:.3} s of signal)",
        samples.len(),
        samples.len() as f64 / config.sample_rate
    );

    let spectrum = Spectrum::compute(&samples, config.sample_rate);
    if let Some(peak) = spectrum.peak_frequency() {
        info!("Strongest bin at {:.1} Hz", peak);
    }

    let settings = PlotSettings {
        width: config.plot_width,
        height: config.plot_height,
        max_points: config.plot_max_points,
    };
    plot::render(&spectrum, &config.plot_output, settings)
        .with_context(|| format!("Failed to render {}", config.plot_output.display()))?;

    info!("Plot saved to {}", config.plot_output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_missing_file_fails() {
        let config = Config {
            iq_file: std::env::temp_dir().join("iq-playback-does-not-exist.dat"),
            ..Config::default()
        };
        let err = run(&config).unwrap_err();
        assert!(err.to_string().contains("Failed to load"));
    }

    #[test]
    fn test_run_end_to_end() {
        let dir = std::env::temp_dir();
        let input = dir.join(format!("iq-playback-run-{}.dat", std::process::id()));
        let output = dir.join(format!("iq-playback-run-{}.svg", std::process::id()));

        let mut bytes = Vec::new();
        for n in 0..1024i16 {
            bytes.extend_from_slice(&(n % 100).to_le_bytes());
            bytes.extend_from_slice(&(-(n % 50)).to_le_bytes());
        }
        std::fs::write(&input, bytes).unwrap();

        let config = Config {
            iq_file: input.clone(),
            plot_output: output.clone(),
            ..Config::default()
        };
        let result = run(&config);
        let written = output.exists();
        std::fs::remove_file(&input).ok();
        std::fs::remove_file(&output).ok();

        result.unwrap();
        assert!(written);
    }
}
