//! Radio capability interface
//!
//! The session controller only needs call-and-response semantics from the
//! hardware driver: configure, open a stream, start, receive, stop. Real
//! hardware goes through SoapySDR (`soapy` feature).

#[cfg(feature = "soapy")]
mod soapy;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use num_complex::Complex;
use thiserror::Error;

#[cfg(feature = "soapy")]
pub use soapy::SoapyRadio;

#[derive(Debug, Error)]
pub enum RadioError {
    #[error("no device found for args '{0}'")]
    DeviceNotFound(String),

    #[error("unsupported stream format: host {host}, wire {wire}")]
    UnsupportedFormat {
        host: SampleFormat,
        wire: SampleFormat,
    },

    #[error("unsupported channel selection {0:?}")]
    UnsupportedChannels(Vec<usize>),

    #[error("no stream open")]
    StreamNotOpen,

    #[error("driver error: {0}")]
    Driver(String),
}

/// Sample encodings, named the way UHD and SoapySDR name them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Complex f32
    Fc32,
    /// Complex i16
    Sc16,
    /// Complex i8
    Sc8,
}

impl SampleFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fc32 => "fc32",
            Self::Sc16 => "sc16",
            Self::Sc8 => "sc8",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SampleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fc32" | "cf32" => Ok(Self::Fc32),
            "sc16" | "cs16" => Ok(Self::Sc16),
            "sc8" | "cs8" => Ok(Self::Sc8),
            other => Err(format!("unknown sample format '{}'", other)),
        }
    }
}

/// Requested receive tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuneRequest {
    pub sample_rate: f64,
    pub center_freq: f64,
    pub lo_offset: f64,
}

/// Tuning the hardware actually settled on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub sample_rate: f64,
    pub center_freq: f64,
}

/// Stream descriptor handed to the driver
#[derive(Debug, Clone, PartialEq)]
pub struct StreamArgs {
    pub cpu_format: SampleFormat,
    pub wire_format: SampleFormat,
    pub channels: Vec<usize>,
}

/// Per-receive error indication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxErrorCode {
    None,
    Timeout,
    Overflow,
    /// Stream command arrived after its time
    Late,
    BadPacket,
    StreamError,
}

impl fmt::Display for RxErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Timeout => "timeout",
            Self::Overflow => "overflow",
            Self::Late => "late command",
            Self::BadPacket => "bad packet",
            Self::StreamError => "stream error",
        };
        f.write_str(s)
    }
}

/// Metadata filled in by every receive call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxMetadata {
    /// Samples written into the buffer
    pub num_samples: usize,
    pub error: RxErrorCode,
}

impl RxMetadata {
    #[cfg(any(test, feature = "soapy"))]
    pub fn ok(num_samples: usize) -> Self {
        Self {
            num_samples,
            error: RxErrorCode::None,
        }
    }

    #[cfg(test)]
    pub fn error(code: RxErrorCode) -> Self {
        Self {
            num_samples: 0,
            error: code,
        }
    }
}

/// Fill `buf` from successive reads that share one deadline.
///
/// `read` gets the unfilled tail and the time left before `timeout` runs
/// out. Returns the number of samples filled plus the error that ended the
/// fill, if any. A read of zero samples, or the deadline passing with part
/// of the buffer filled, ends the fill short.
#[cfg(any(test, feature = "soapy"))]
pub(crate) fn fill_within<E>(
    buf: &mut [Complex<f32>],
    timeout: Duration,
    mut read: impl FnMut(&mut [Complex<f32>], Duration) -> Result<usize, E>,
) -> (usize, Option<E>) {
    let deadline = std::time::Instant::now().checked_add(timeout);

    let mut filled = 0;
    while filled < buf.len() {
        let left = match deadline {
            Some(d) => d.saturating_duration_since(std::time::Instant::now()),
            None => timeout,
        };
        if filled > 0 && left.is_zero() {
            break;
        }

        match read(&mut buf[filled..], left) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) => return (filled, Some(e)),
        }
    }

    (filled, None)
}

/// Minimal receive-side radio capability
pub trait RxDevice {
    /// Set sample rate and center frequency; returns what the hardware
    /// actually settled on.
    fn configure(&mut self, tune: &TuneRequest) -> Result<Tuning, RadioError>;

    /// Create the streaming object for `args`.
    fn open_stream(&mut self, args: &StreamArgs) -> Result<(), RadioError>;

    /// Start continuous streaming immediately.
    fn start(&mut self) -> Result<(), RadioError>;

    /// Block until `buf` is full, the timeout elapses or the stream reports
    /// an error. The timeout bounds the whole call, not each driver read.
    /// Stream-level conditions come back in the metadata; `Err`
    /// is reserved for driver failures.
    fn receive(
        &mut self,
        buf: &mut [Complex<f32>],
        timeout: Option<Duration>,
    ) -> Result<RxMetadata, RadioError>;

    /// Stop continuous streaming immediately.
    fn stop(&mut self) -> Result<(), RadioError>;
}

impl<D: RxDevice + ?Sized> RxDevice for Box<D> {
    fn configure(&mut self, tune: &TuneRequest) -> Result<Tuning, RadioError> {
        (**self).configure(tune)
    }

    fn open_stream(&mut self, args: &StreamArgs) -> Result<(), RadioError> {
        (**self).open_stream(args)
    }

    fn start(&mut self) -> Result<(), RadioError> {
        (**self).start()
    }

    fn receive(
        &mut self,
        buf: &mut [Complex<f32>],
        timeout: Option<Duration>,
    ) -> Result<RxMetadata, RadioError> {
        (**self).receive(buf, timeout)
    }

    fn stop(&mut self) -> Result<(), RadioError> {
        (**self).stop()
    }
}
