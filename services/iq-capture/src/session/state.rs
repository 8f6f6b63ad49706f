//! Session state and receive statistics

use std::fmt;
use std::str::FromStr;

/// Linear session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconfigured,
    Configured,
    Streaming,
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unconfigured => "unconfigured",
            Self::Configured => "configured",
            Self::Streaming => "streaming",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// What an overflow indication does to the receive loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Count it, warn once, keep receiving
    Log,
    /// End the loop with an error
    Abort,
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "log" | "continue" => Ok(Self::Log),
            "abort" | "stop" => Ok(Self::Abort),
            other => Err(format!("unknown overflow policy '{}'", other)),
        }
    }
}

/// Receive statistics for one session
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CaptureStats {
    pub buffers_received: u64,
    pub samples_received: u64,
    pub overflows: u64,
    pub short_reads: u64,
    pub saturated_buffers: u64,
    pub peak_magnitude: f32,
}

impl CaptureStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_buffer(&mut self, samples: usize) {
        self.buffers_received += 1;
        self.samples_received += samples as u64;
    }

    pub fn record_overflow(&mut self) {
        self.overflows += 1;
    }

    pub fn record_short_read(&mut self) {
        self.short_reads += 1;
    }

    pub fn record_saturation(&mut self) {
        self.saturated_buffers += 1;
    }

    pub fn record_peak(&mut self, magnitude: f32) {
        if magnitude > self.peak_magnitude {
            self.peak_magnitude = magnitude;
        }
    }
}
