//! SoapySDR-backed radio
//!
//! LO offset goes through the `OFFSET` tune argument and the wire format
//! through the `WIRE` stream argument, the keys SoapyUHD and most other
//! modules understand.

use std::time::Duration;

use num_complex::Complex;
use soapysdr::{Args, Device, Direction, ErrorCode, RxStream};
use tracing::{debug, info, warn};

use super::{
    fill_within, RadioError, RxDevice, RxErrorCode, RxMetadata, SampleFormat, StreamArgs,
    TuneRequest, Tuning,
};

/// SoapySDR's customary receive timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

impl From<soapysdr::Error> for RadioError {
    fn from(err: soapysdr::Error) -> Self {
        RadioError::Driver(err.to_string())
    }
}

pub struct SoapyRadio {
    device: Device,
    channel: usize,
    stream: Option<RxStream<Complex<f32>>>,
}

impl SoapyRadio {
    /// Open the first device matching `args`.
    pub fn open(args: &str, channel: usize) -> Result<Self, RadioError> {
        let device = Device::new(args)
            .map_err(|e| RadioError::DeviceNotFound(format!("{}: {}", args, e)))?;

        info!(
            "Opened {} ({})",
            device.hardware_key().unwrap_or_else(|_| "unknown hardware".to_string()),
            device.driver_key().unwrap_or_else(|_| "unknown driver".to_string()),
        );

        let channels = device.num_channels(Direction::Rx)?;
        if channel >= channels {
            return Err(RadioError::UnsupportedChannels(vec![channel]));
        }

        Ok(Self {
            device,
            channel,
            stream: None,
        })
    }

    fn stream(&mut self) -> Result<&mut RxStream<Complex<f32>>, RadioError> {
        self.stream.as_mut().ok_or(RadioError::StreamNotOpen)
    }
}

impl RxDevice for SoapyRadio {
    fn configure(&mut self, tune: &TuneRequest) -> Result<Tuning, RadioError> {
        self.device
            .set_sample_rate(Direction::Rx, self.channel, tune.sample_rate)?;

        let mut tune_args = Args::new();
        if tune.lo_offset != 0.0 {
            tune_args.set("OFFSET", tune.lo_offset.to_string());
        }
        self.device
            .set_frequency(Direction::Rx, self.channel, tune.center_freq, tune_args)?;

        // Read back after both setters, a rate change can move the tuning
        Ok(Tuning {
            sample_rate: self.device.sample_rate(Direction::Rx, self.channel)?,
            center_freq: self.device.frequency(Direction::Rx, self.channel)?,
        })
    }

    fn open_stream(&mut self, args: &StreamArgs) -> Result<(), RadioError> {
        if args.cpu_format != SampleFormat::Fc32 {
            return Err(RadioError::UnsupportedFormat {
                host: args.cpu_format,
                wire: args.wire_format,
            });
        }
        if args.channels != [self.channel] {
            return Err(RadioError::UnsupportedChannels(args.channels.clone()));
        }

        let mut stream_args = Args::new();
        stream_args.set("WIRE", args.wire_format.as_str());

        let stream = self
            .device
            .rx_stream_args::<Complex<f32>, _>(&args.channels, stream_args)?;
        debug!("Stream MTU: {} samples", stream.mtu().unwrap_or(0));

        self.stream = Some(stream);
        Ok(())
    }

    fn start(&mut self) -> Result<(), RadioError> {
        self.stream()?.activate(None)?;
        Ok(())
    }

    fn receive(
        &mut self,
        buf: &mut [Complex<f32>],
        timeout: Option<Duration>,
    ) -> Result<RxMetadata, RadioError> {
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let stream = self.stream()?;

        // A single read may return less than the buffer; keep reading
        // until it is full, the stream reports a condition or time is up.
        let (filled, err) = fill_within(buf, timeout, |tail, left| {
            let timeout_us = i64::try_from(left.as_micros()).unwrap_or(i64::MAX);
            stream.read(&mut [tail], timeout_us)
        });

        let Some(e) = err else {
            return Ok(RxMetadata::ok(filled));
        };

        let code = match e.code {
            ErrorCode::Timeout => RxErrorCode::Timeout,
            ErrorCode::Overflow => RxErrorCode::Overflow,
            ErrorCode::TimeError => RxErrorCode::Late,
            ErrorCode::Corruption => RxErrorCode::BadPacket,
            ErrorCode::StreamError => RxErrorCode::StreamError,
            _ => return Err(e.into()),
        };
        if filled > 0 {
            warn!("{} after {} of {} samples", code, filled, buf.len());
        }

        Ok(RxMetadata {
            num_samples: filled,
            error: code,
        })
    }

    fn stop(&mut self) -> Result<(), RadioError> {
        self.stream()?.deactivate(None)?;
        Ok(())
    }
}
