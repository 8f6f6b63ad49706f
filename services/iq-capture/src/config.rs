//! Configuration loaded from environment variables

use std::time::Duration;

use crate::radio::SampleFormat;
use crate::session::OverflowPolicy;

/// Capture configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SoapySDR device arguments (e.g. "driver=uhd"), empty for first match
    pub device_args: String,

    /// Receive channel index
    pub channel: usize,

    /// Requested receive sample rate in Hz
    pub sample_rate: f64,

    /// Requested center frequency in Hz
    pub center_freq: f64,

    /// LO offset in Hz (0 tunes the LO directly to the center frequency)
    pub lo_offset: f64,

    /// Host-side sample format
    pub cpu_format: SampleFormat,

    /// Over-the-wire sample format
    pub wire_format: SampleFormat,

    /// Samples requested per receive call
    pub buffer_len: usize,

    /// Number of receive calls
    pub num_buffers: usize,

    /// Per-receive timeout, driver default when unset
    pub recv_timeout: Option<Duration>,

    /// What an overflow does to the receive loop
    pub overflow_policy: OverflowPolicy,

    /// Warn when any sample magnitude exceeds this
    pub saturation_warning: Option<f32>,

    /// Progress log interval
    pub stats_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_args: String::new(),
            channel: 0,
            sample_rate: 1e6,
            center_freq: 1e9,
            lo_offset: 0.0,
            cpu_format: SampleFormat::Fc32,
            wire_format: SampleFormat::Sc16,
            buffer_len: 10_000,
            num_buffers: 1000,
            recv_timeout: None,
            overflow_policy: OverflowPolicy::Log,
            saturation_warning: None,
            stats_interval: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            device_args: std::env::var("DEVICE_ARGS").unwrap_or(defaults.device_args),

            channel: std::env::var("RX_CHANNEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.channel),

            sample_rate: std::env::var("RX_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|rate: &f64| *rate > 0.0)
                .unwrap_or(defaults.sample_rate),

            center_freq: std::env::var("RX_FREQ")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.center_freq),

            lo_offset: std::env::var("LO_OFFSET")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.lo_offset),

            cpu_format: std::env::var("CPU_FORMAT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cpu_format),

            wire_format: std::env::var("WIRE_FORMAT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.wire_format),

            buffer_len: std::env::var("BUFFER_LEN")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.buffer_len),

            num_buffers: std::env::var("NUM_BUFFERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.num_buffers),

            recv_timeout: std::env::var("RECV_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis),

            overflow_policy: std::env::var("OVERFLOW_POLICY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.overflow_policy),

            saturation_warning: std::env::var("SATURATION_WARNING")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|t: &f32| *t > 0.0),

            stats_interval: std::env::var("STATS_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.stats_interval),
        }
    }
}
