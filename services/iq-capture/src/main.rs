//! I/Q Capture - continuous receive session against a SoapySDR radio
//!
//! Tunes the radio, starts continuous streaming, pulls a fixed number of
//! fixed-size buffers and stops the stream, checking every buffer's
//! receive metadata along the way.

mod config;
mod radio;
mod session;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::Config;
use radio::RxDevice;
use session::CaptureSession;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("iq_capture=info")),
        )
        .with_target(false)
        .init();

    info!("===========================================");
    info!("   I/Q Capture - continuous RX session");
    info!("===========================================");

    let config = Config::from_env();

    info!("Configuration:");
    info!("  Device args: '{}'", config.device_args);
    info!("  Channel: {}", config.channel);
    info!("  Sample rate: {:.3} MSPS", config.sample_rate / 1e6);
    info!("  Center frequency: {:.6} MHz", config.center_freq / 1e6);
    info!("  LO offset: {} Hz", config.lo_offset);
    info!("  Formats: cpu={} wire={}", config.cpu_format, config.wire_format);
    info!("  Buffers: {} x {} samples", config.num_buffers, config.buffer_len);
    info!("  Overflow policy: {:?}", config.overflow_policy);

    let radio = open_radio(&config)?;
    run(radio, config)
}

/// Drive one session to completion and log its summary.
fn run<D: RxDevice>(radio: D, config: Config) -> Result<()> {
    let mut session = CaptureSession::new(radio, config);

    let report = match session.run() {
        Ok(report) => report,
        Err(e) => {
            error!(
                "Capture ended in state {} after {} buffers ({} overflows)",
                session.state(),
                session.stats().buffers_received,
                session.stats().overflows
            );
            return Err(e).context("Capture failed");
        }
    };

    info!("===========================================");
    info!("  Capture complete");
    info!("  Started: {}", report.started_at.to_rfc3339());
    info!(
        "  Tuned: {:.3} MSPS at {:.6} MHz",
        report.tuning.sample_rate / 1e6,
        report.tuning.center_freq / 1e6
    );
    info!(
        "  Received {} samples in {} buffers over {:.3} s ({:.3} MSPS)",
        report.stats.samples_received,
        report.stats.buffers_received,
        report.elapsed.as_secs_f64(),
        report.throughput_msps()
    );
    info!(
        "  Overflows: {} | Short reads: {} | Saturated buffers: {}",
        report.stats.overflows, report.stats.short_reads, report.stats.saturated_buffers
    );
    info!("  Peak magnitude: {:.4}", report.stats.peak_magnitude);
    info!("===========================================");

    Ok(())
}

#[cfg(feature = "soapy")]
fn open_radio(config: &Config) -> Result<Box<dyn RxDevice>> {
    let radio = radio::SoapyRadio::open(&config.device_args, config.channel)
        .context("Failed to open SoapySDR device")?;
    Ok(Box::new(radio))
}

#[cfg(not(feature = "soapy"))]
fn open_radio(_config: &Config) -> Result<Box<dyn RxDevice>> {
    anyhow::bail!("iq-capture was built without hardware support; rebuild with `--features soapy`")
}
