//! Capture session controller
//!
//! Sequences the driver calls in the only order the hardware accepts:
//! configure and open the stream, start continuous streaming, receive a
//! fixed number of buffers, stop. Every receive's metadata is checked;
//! timeouts and receiver errors end the loop, overflows follow the
//! configured policy.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use num_complex::Complex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::radio::{RadioError, RxDevice, RxErrorCode, RxMetadata, StreamArgs, TuneRequest, Tuning};

use super::state::{CaptureStats, OverflowPolicy, SessionState};

/// Relative difference above which a coerced setting is reported
const COERCION_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: SessionState,
    },

    #[error(transparent)]
    Radio(#[from] RadioError),

    #[error("receive timed out on buffer {index}")]
    Timeout { index: usize },

    #[error("overflow on buffer {index}, samples were dropped")]
    Overflow { index: usize },

    #[error("receiver error on buffer {index}: {code}")]
    Receive { index: usize, code: RxErrorCode },
}

/// Summary of a completed session
#[derive(Debug, Clone)]
pub struct CaptureReport {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub tuning: Tuning,
    pub stats: CaptureStats,
}

impl CaptureReport {
    /// Average received rate in millions of samples per second
    pub fn throughput_msps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.stats.samples_received as f64 / secs / 1e6
        } else {
            0.0
        }
    }
}

/// Capture session over an exclusively owned radio
pub struct CaptureSession<D: RxDevice> {
    device: D,
    config: Config,
    state: SessionState,
    buffer: Vec<Complex<f32>>,
    stats: CaptureStats,
    overflow_reported: bool,
}

impl<D: RxDevice> CaptureSession<D> {
    pub fn new(device: D, config: Config) -> Self {
        let buffer = vec![Complex::new(0.0, 0.0); config.buffer_len];
        Self {
            device,
            config,
            state: SessionState::Unconfigured,
            buffer,
            stats: CaptureStats::new(),
            overflow_reported: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    #[cfg(test)]
    pub fn device(&self) -> &D {
        &self.device
    }

    fn expect_state(&self, expected: SessionState, action: &'static str) -> Result<(), CaptureError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CaptureError::InvalidState {
                action,
                state: self.state,
            })
        }
    }

    /// Tune the radio and open the stream. Unconfigured → Configured.
    pub fn configure(&mut self) -> Result<Tuning, CaptureError> {
        self.expect_state(SessionState::Unconfigured, "configure")?;

        let request = TuneRequest {
            sample_rate: self.config.sample_rate,
            center_freq: self.config.center_freq,
            lo_offset: self.config.lo_offset,
        };
        let tuning = self.device.configure(&request)?;
        report_coercion(&request, &tuning);

        let args = StreamArgs {
            cpu_format: self.config.cpu_format,
            wire_format: self.config.wire_format,
            channels: vec![self.config.channel],
        };
        self.device.open_stream(&args)?;
        debug!(
            "Stream open: cpu={} wire={} channels={:?}",
            args.cpu_format, args.wire_format, args.channels
        );

        self.state = SessionState::Configured;
        Ok(tuning)
    }

    /// Start continuous streaming now. Configured → Streaming.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        self.expect_state(SessionState::Configured, "start streaming")?;
        self.device.start()?;
        self.state = SessionState::Streaming;
        info!("Streaming started");
        Ok(())
    }

    /// Fill the buffer once and check the metadata.
    pub fn receive(&mut self, index: usize) -> Result<RxMetadata, CaptureError> {
        self.expect_state(SessionState::Streaming, "receive")?;

        let md = self
            .device
            .receive(&mut self.buffer, self.config.recv_timeout)?;
        self.inspect(index, &md)?;
        Ok(md)
    }

    /// Stop continuous streaming. Streaming → Stopped.
    pub fn stop(&mut self) -> Result<(), CaptureError> {
        self.expect_state(SessionState::Streaming, "stop streaming")?;
        self.device.stop()?;
        self.state = SessionState::Stopped;
        info!("Streaming stopped");
        Ok(())
    }

    /// Run the whole sequence. When the receive loop fails the stream is
    /// still stopped before the error is returned.
    pub fn run(&mut self) -> Result<CaptureReport, CaptureError> {
        let started_at = Utc::now();
        let tuning = self.configure()?;

        let t0 = Instant::now();
        self.start()?;
        let received = self.receive_loop();
        let stopped = self.stop();

        if let Err(e) = received {
            if let Err(stop_err) = stopped {
                warn!("Stop after failed receive also failed: {}", stop_err);
            }
            return Err(e);
        }
        stopped?;

        Ok(CaptureReport {
            started_at,
            elapsed: t0.elapsed(),
            tuning,
            stats: self.stats.clone(),
        })
    }

    fn receive_loop(&mut self) -> Result<(), CaptureError> {
        let mut last_stats_time = Instant::now();
        let mut last_sample_count = 0u64;

        for index in 0..self.config.num_buffers {
            self.receive(index)?;

            if last_stats_time.elapsed() >= self.config.stats_interval {
                let delta = self.stats.samples_received - last_sample_count;
                let rate = delta as f64 / last_stats_time.elapsed().as_secs_f64();
                info!(
                    "[Capture] Buffers: {}/{} | Rate: {:.2} MSPS | Overflows: {} | Peak: {:.3}",
                    index + 1,
                    self.config.num_buffers,
                    rate / 1e6,
                    self.stats.overflows,
                    self.stats.peak_magnitude
                );
                last_stats_time = Instant::now();
                last_sample_count = self.stats.samples_received;
            }
        }

        Ok(())
    }

    fn inspect(&mut self, index: usize, md: &RxMetadata) -> Result<(), CaptureError> {
        self.stats.record_buffer(md.num_samples);

        match md.error {
            RxErrorCode::None => {}
            RxErrorCode::Overflow => {
                self.stats.record_overflow();
                if !self.overflow_reported {
                    warn!(
                        "Overflow on buffer {}: the host is not keeping up with {:.3} MSPS, samples were dropped",
                        index,
                        self.config.sample_rate / 1e6
                    );
                    self.overflow_reported = true;
                } else {
                    debug!("Overflow on buffer {}", index);
                }
                if self.config.overflow_policy == OverflowPolicy::Abort {
                    return Err(CaptureError::Overflow { index });
                }
            }
            RxErrorCode::Timeout => {
                warn!("Timeout while streaming (buffer {})", index);
                return Err(CaptureError::Timeout { index });
            }
            code => {
                warn!("Receiver error on buffer {}: {}", index, code);
                return Err(CaptureError::Receive { index, code });
            }
        }

        if md.error == RxErrorCode::None && md.num_samples < self.buffer.len() {
            self.stats.record_short_read();
            debug!(
                "Short read on buffer {}: {} of {} samples",
                index,
                md.num_samples,
                self.buffer.len()
            );
        }

        let received = &self.buffer[..md.num_samples.min(self.buffer.len())];
        let peak = received.iter().map(|s| s.norm()).fold(0.0f32, f32::max);
        self.stats.record_peak(peak);

        if let Some(threshold) = self.config.saturation_warning {
            if peak > threshold {
                self.stats.record_saturation();
                warn!(
                    "Saturated samples in buffer {} (peak {:.3} > {:.3})",
                    index, peak, threshold
                );
            }
        }

        Ok(())
    }
}

fn report_coercion(request: &TuneRequest, tuning: &Tuning) {
    let coerced = |asked: f64, got: f64| (asked - got).abs() > asked.abs() * COERCION_TOLERANCE;

    if coerced(request.sample_rate, tuning.sample_rate) {
        warn!(
            "Sample rate coerced: requested {:.3} MSPS, got {:.3} MSPS",
            request.sample_rate / 1e6,
            tuning.sample_rate / 1e6
        );
    }
    if coerced(request.center_freq, tuning.center_freq) {
        warn!(
            "Center frequency coerced: requested {:.6} MHz, got {:.6} MHz",
            request.center_freq / 1e6,
            tuning.center_freq / 1e6
        );
    }
    info!(
        "Tuned: {:.3} MSPS at {:.6} MHz",
        tuning.sample_rate / 1e6,
        tuning.center_freq / 1e6
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::SampleFormat;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Configure(TuneRequest),
        OpenStream(StreamArgs),
        Start,
        Receive(usize),
        Stop,
    }

    /// In-memory radio that records every call
    #[derive(Default)]
    struct FakeRadio {
        calls: Vec<Call>,
        /// Metadata for successive receives; full buffers once exhausted
        script: VecDeque<RxMetadata>,
        fill: Complex<f32>,
        achieved_rate: Option<f64>,
        reject_stream: bool,
    }

    impl RxDevice for FakeRadio {
        fn configure(&mut self, tune: &TuneRequest) -> Result<Tuning, RadioError> {
            self.calls.push(Call::Configure(*tune));
            Ok(Tuning {
                sample_rate: self.achieved_rate.unwrap_or(tune.sample_rate),
                center_freq: tune.center_freq,
            })
        }

        fn open_stream(&mut self, args: &StreamArgs) -> Result<(), RadioError> {
            self.calls.push(Call::OpenStream(args.clone()));
            if self.reject_stream {
                return Err(RadioError::UnsupportedFormat {
                    host: args.cpu_format,
                    wire: args.wire_format,
                });
            }
            Ok(())
        }

        fn start(&mut self) -> Result<(), RadioError> {
            self.calls.push(Call::Start);
            Ok(())
        }

        fn receive(
            &mut self,
            buf: &mut [Complex<f32>],
            _timeout: Option<Duration>,
        ) -> Result<RxMetadata, RadioError> {
            self.calls.push(Call::Receive(buf.len()));
            let md = self
                .script
                .pop_front()
                .unwrap_or_else(|| RxMetadata::ok(buf.len()));
            for s in buf.iter_mut().take(md.num_samples) {
                *s = self.fill;
            }
            Ok(md)
        }

        fn stop(&mut self) -> Result<(), RadioError> {
            self.calls.push(Call::Stop);
            Ok(())
        }
    }

    fn small_config() -> Config {
        Config {
            buffer_len: 16,
            num_buffers: 5,
            ..Config::default()
        }
    }

    fn count(calls: &[Call], wanted: &Call) -> usize {
        calls.iter().filter(|c| *c == wanted).count()
    }

    #[test]
    fn test_default_sequence() {
        let mut session = CaptureSession::new(FakeRadio::default(), Config::default());
        let report = session.run().unwrap();

        let calls = &session.device().calls;
        assert_eq!(calls.len(), 1 + 1 + 1 + 1000 + 1);
        assert_eq!(
            calls[0],
            Call::Configure(TuneRequest {
                sample_rate: 1e6,
                center_freq: 1e9,
                lo_offset: 0.0,
            })
        );
        assert_eq!(
            calls[1],
            Call::OpenStream(StreamArgs {
                cpu_format: SampleFormat::Fc32,
                wire_format: SampleFormat::Sc16,
                channels: vec![0],
            })
        );
        assert_eq!(calls[2], Call::Start);
        assert!(calls[3..1003].iter().all(|c| *c == Call::Receive(10_000)));
        assert_eq!(calls[1003], Call::Stop);
        assert_eq!(count(calls, &Call::Start), 1);
        assert_eq!(count(calls, &Call::Stop), 1);

        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(report.stats.buffers_received, 1000);
        assert_eq!(report.stats.samples_received, 10_000_000);
        assert_eq!(report.stats.overflows, 0);
    }

    #[test]
    fn test_overflow_logged_and_counted() {
        let mut radio = FakeRadio::default();
        radio.script = VecDeque::from(vec![
            RxMetadata::ok(16),
            RxMetadata::error(RxErrorCode::Overflow),
            RxMetadata::ok(16),
            RxMetadata::error(RxErrorCode::Overflow),
        ]);

        let mut session = CaptureSession::new(radio, small_config());
        let report = session.run().unwrap();

        assert_eq!(report.stats.overflows, 2);
        assert_eq!(report.stats.buffers_received, 5);
        assert_eq!(report.stats.samples_received, 16 * 3);
        assert_eq!(count(&session.device().calls, &Call::Receive(16)), 5);
        assert_eq!(session.device().calls.last(), Some(&Call::Stop));
    }

    #[test]
    fn test_overflow_abort_still_stops() {
        let mut radio = FakeRadio::default();
        radio.script = VecDeque::from(vec![
            RxMetadata::ok(16),
            RxMetadata::ok(16),
            RxMetadata::error(RxErrorCode::Overflow),
        ]);
        let config = Config {
            overflow_policy: OverflowPolicy::Abort,
            ..small_config()
        };

        let mut session = CaptureSession::new(radio, config);
        let err = session.run().unwrap_err();

        assert!(matches!(err, CaptureError::Overflow { index: 2 }));
        let calls = &session.device().calls;
        assert_eq!(count(calls, &Call::Receive(16)), 3);
        assert_eq!(calls.last(), Some(&Call::Stop));
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn test_timeout_ends_loop() {
        let mut radio = FakeRadio::default();
        radio.script = VecDeque::from(vec![RxMetadata::error(RxErrorCode::Timeout)]);

        let mut session = CaptureSession::new(radio, small_config());
        let err = session.run().unwrap_err();

        assert!(matches!(err, CaptureError::Timeout { index: 0 }));
        assert_eq!(
            session.device().calls[2..],
            [Call::Start, Call::Receive(16), Call::Stop]
        );
    }

    #[test]
    fn test_receiver_error_ends_loop() {
        let mut radio = FakeRadio::default();
        radio.script = VecDeque::from(vec![
            RxMetadata::ok(16),
            RxMetadata::error(RxErrorCode::BadPacket),
        ]);

        let mut session = CaptureSession::new(radio, small_config());
        let err = session.run().unwrap_err();

        assert!(matches!(
            err,
            CaptureError::Receive {
                index: 1,
                code: RxErrorCode::BadPacket
            }
        ));
        assert_eq!(session.device().calls.last(), Some(&Call::Stop));
    }

    #[test]
    fn test_out_of_order_calls_rejected() {
        let mut session = CaptureSession::new(FakeRadio::default(), small_config());

        assert!(matches!(
            session.start(),
            Err(CaptureError::InvalidState {
                state: SessionState::Unconfigured,
                ..
            })
        ));
        assert!(session.receive(0).is_err());
        assert!(session.stop().is_err());
        assert!(session.device().calls.is_empty());

        session.configure().unwrap();
        assert!(session.configure().is_err());
        assert!(session.receive(0).is_err());

        session.start().unwrap();
        session.receive(0).unwrap();
        session.stop().unwrap();

        // No way back to streaming
        assert!(session.start().is_err());
        assert!(session.stop().is_err());
        assert_eq!(count(&session.device().calls, &Call::Start), 1);
        assert_eq!(count(&session.device().calls, &Call::Stop), 1);
    }

    #[test]
    fn test_rejected_stream_never_starts() {
        let radio = FakeRadio {
            reject_stream: true,
            ..FakeRadio::default()
        };
        let mut session = CaptureSession::new(radio, small_config());
        let err = session.run().unwrap_err();

        assert!(matches!(
            err,
            CaptureError::Radio(RadioError::UnsupportedFormat { .. })
        ));
        assert_eq!(session.state(), SessionState::Unconfigured);
        assert_eq!(count(&session.device().calls, &Call::Start), 0);
    }

    #[test]
    fn test_short_reads_counted() {
        let mut radio = FakeRadio::default();
        radio.script = VecDeque::from(vec![RxMetadata::ok(10), RxMetadata::ok(16), RxMetadata::ok(3)]);

        let mut session = CaptureSession::new(radio, small_config());
        let report = session.run().unwrap();

        assert_eq!(report.stats.short_reads, 2);
        assert_eq!(report.stats.samples_received, 10 + 16 + 3 + 16 + 16);
    }

    #[test]
    fn test_saturation_warning() {
        let radio = FakeRadio {
            fill: Complex::new(0.6, 0.8),
            ..FakeRadio::default()
        };
        let config = Config {
            saturation_warning: Some(0.9),
            ..small_config()
        };

        let mut session = CaptureSession::new(radio, config);
        let report = session.run().unwrap();

        assert_eq!(report.stats.saturated_buffers, 5);
        assert!((report.stats.peak_magnitude - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_coerced_tuning_reported() {
        let radio = FakeRadio {
            achieved_rate: Some(999_755.859_375),
            ..FakeRadio::default()
        };
        let mut session = CaptureSession::new(radio, small_config());
        let report = session.run().unwrap();

        assert_eq!(report.tuning.sample_rate, 999_755.859_375);
        assert_eq!(report.tuning.center_freq, 1e9);
    }
}
