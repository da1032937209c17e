use crate::config::EngineConfig;
use crate::constants::{DISTANCE_RATE_HZ, EMPTY_PAYLOAD, INBOUND_FRAME_SIZE, METEO_RATE_HZ, VELOCITY_RATE_HZ};
use crate::data::{Distance, Measurement, Meteo, Velocity, decode_distance, decode_meteo, decode_velocity};
use crate::error::LineError;
use crate::frame::{InboundFrame, encode_command, try_parse_inbound};
use crate::opcode::{Command, Inbound};
use crate::queue::{AckSignal, MeasurementQueues, Stream};
use crate::transport::{Receiver, SerialConfig, SerialTransport, Sender, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Counters kept by the reader thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkStats {
    /// Measurement frames decoded and queued
    pub measurements: u64,
    /// Command echoes received
    pub acks: u64,
    /// Reads that returned fewer than 16 bytes and were dropped
    pub short_reads: u64,
    /// Bad frames (checksum or opcode) followed by a receive-buffer discard
    pub desyncs: u64,
}

#[derive(Debug, Default)]
struct Counters {
    measurements: AtomicU64,
    acks: AtomicU64,
    short_reads: AtomicU64,
    desyncs: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> LinkStats {
        LinkStats {
            measurements: self.measurements.load(Ordering::Relaxed),
            acks: self.acks.load(Ordering::Relaxed),
            short_reads: self.short_reads.load(Ordering::Relaxed),
            desyncs: self.desyncs.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    queues: MeasurementQueues,
    ack: AckSignal,
    stop: AtomicBool,
    counters: Counters,
}

/// An open connection to a LINE F1 interferometer.
///
/// Opening starts a background thread that reads frames, queues decoded
/// measurements and signals command acknowledgments. Closing (explicitly or
/// on drop) stops and joins that thread before the transport is released.
///
/// Only one distance-or-velocity stream may be enabled at a time; the
/// instrument does not support both and this type does not enforce it.
pub struct LineF1 {
    shared: Arc<Shared>,
    /// Held for the whole write/acknowledge exchange: one command in flight
    tx: Mutex<Box<dyn Sender>>,
    reader: Option<JoinHandle<()>>,
    config: EngineConfig,
}

impl LineF1 {
    /// Take ownership of `transport` and start the reader thread.
    pub fn open<T: Transport>(transport: T, config: EngineConfig) -> Result<Self, LineError> {
        let (rx, tx) = transport.split()?;
        let shared = Arc::new(Shared::default());

        let reader = ReaderLoop {
            rx,
            shared: Arc::clone(&shared),
            resync_pause: config.resync_pause,
        };
        let handle = thread::Builder::new()
            .name("linef1-reader".to_string())
            .spawn(move || reader.run())?;
        info!("Connection opened, reader thread started");

        let tx: Box<dyn Sender> = Box::new(tx);
        Ok(Self {
            shared,
            tx: Mutex::new(tx),
            reader: Some(handle),
            config,
        })
    }

    /// Open a serial port with the instrument's link settings and start the engine.
    pub fn open_serial(serial: &SerialConfig, config: EngineConfig) -> Result<Self, LineError> {
        let transport = SerialTransport::open(serial)?;
        Self::open(transport, config)
    }

    /// Stop the reader thread and release the transport.
    pub fn close(mut self) -> Result<(), LineError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), LineError> {
        let Some(handle) = self.reader.take() else {
            return Ok(());
        };

        self.shared.stop.store(true, Ordering::Release);
        let joined = handle.join();
        let closed = self.tx.lock().close();
        info!("Connection closed");

        if joined.is_err() {
            return Err(LineError::ReaderPanicked);
        }
        closed?;
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> LinkStats {
        self.shared.counters.snapshot()
    }

    /// Number of records waiting in one queue
    pub fn queued(&self, stream: Stream) -> usize {
        self.shared.queues.len(stream)
    }

    /// Write `command` and block until it is acknowledged.
    ///
    /// Each attempt waits up to the configured acknowledgment timeout; after
    /// `max_retries` retransmissions the command fails with
    /// [`LineError::ConnectionExhausted`]. Concurrent callers are serialised.
    pub fn send_command(&self, command: Command, payload: [u8; 4], max_retries: u32) -> Result<(), LineError> {
        let frame = encode_command(command, payload);
        let mut tx = self.tx.lock();
        let mut retries_left = max_retries;
        let mut attempts = 0;

        loop {
            self.shared.ack.clear();
            debug!(bytes = hex::encode(&frame), %command, "Write");
            tx.write_frame(&frame)?;
            attempts += 1;

            if self.shared.ack.wait(self.config.ack_timeout) {
                debug!(%command, attempts, "Acknowledged");
                return Ok(());
            }
            if retries_left == 0 {
                return Err(LineError::ConnectionExhausted { command, attempts });
            }
            retries_left -= 1;
            warn!(%command, attempts, retries_left, "No acknowledgment, retransmitting");
        }
    }

    /// Pop one record from `stream`, waiting up to `timeout`.
    pub fn read_one(&self, stream: Stream, timeout: Duration) -> Result<Measurement, LineError> {
        self.shared
            .queues
            .pop_timeout(stream, timeout)
            .ok_or(LineError::WaitTimeout { what: "measurement data" })
    }

    /// Pop `n` records in order; each one gets its own `timeout`.
    pub fn read_n(&self, stream: Stream, n: usize, timeout: Duration) -> Result<Vec<Measurement>, LineError> {
        (0..n).map(|_| self.read_one(stream, timeout)).collect()
    }

    /// Drop every buffered, unread measurement.
    pub fn flush(&self) {
        let dropped = self.shared.queues.flush();
        debug!(dropped, "Flushed measurement queues");
    }

    // --- Instrument configuration ---

    /// Enable or disable the distance stream ([`DISTANCE_RATE_HZ`]).
    pub fn set_distance_stream(&self, on: bool) -> Result<(), LineError> {
        info!(on, rate_hz = DISTANCE_RATE_HZ, "Distance stream");
        self.command(Command::distance(on))
    }

    /// Enable or disable the velocity stream ([`VELOCITY_RATE_HZ`]).
    pub fn set_velocity_stream(&self, on: bool) -> Result<(), LineError> {
        info!(on, rate_hz = VELOCITY_RATE_HZ, "Velocity stream");
        self.command(Command::velocity(on))
    }

    /// Enable or disable the meteo stream ([`METEO_RATE_HZ`] per sensor).
    pub fn set_meteo_stream(&self, on: bool) -> Result<(), LineError> {
        info!(on, rate_hz = METEO_RATE_HZ, "Meteo stream");
        self.command(Command::meteo(on))
    }

    pub fn stop_all_streams(&self) -> Result<(), LineError> {
        info!("Stopping all streams");
        self.command(Command::StopAllStreams)
    }

    pub fn clear_small_signal_flag(&self) -> Result<(), LineError> {
        self.command(Command::ClearSmallSignalFlag)
    }

    pub fn clear_velocity_overflow_flag(&self) -> Result<(), LineError> {
        self.command(Command::ClearVelocityOverflowFlag)
    }

    pub fn clear_external_capture_flag(&self) -> Result<(), LineError> {
        self.command(Command::ClearExternalCaptureFlag)
    }

    /// Make the current position the distance origin.
    pub fn reset_origin(&self) -> Result<(), LineError> {
        info!("Resetting distance origin");
        self.command(Command::ResetOrigin)
    }

    fn command(&self, command: Command) -> Result<(), LineError> {
        self.send_command(command, EMPTY_PAYLOAD, self.config.max_retries)
    }

    // --- Typed reads with the configured read timeout ---

    pub fn read_distance(&self) -> Result<Distance, LineError> {
        self.shared
            .queues
            .pop_distance(self.config.read_timeout)
            .ok_or(LineError::WaitTimeout { what: "distance data" })
    }

    pub fn read_velocity(&self) -> Result<Velocity, LineError> {
        self.shared
            .queues
            .pop_velocity(self.config.read_timeout)
            .ok_or(LineError::WaitTimeout { what: "velocity data" })
    }

    pub fn read_meteo_air(&self) -> Result<Meteo, LineError> {
        self.shared
            .queues
            .pop_meteo_air(self.config.read_timeout)
            .ok_or(LineError::WaitTimeout { what: "meteo (air) data" })
    }

    pub fn read_meteo_mat(&self) -> Result<Meteo, LineError> {
        self.shared
            .queues
            .pop_meteo_mat(self.config.read_timeout)
            .ok_or(LineError::WaitTimeout { what: "meteo (material) data" })
    }

    pub fn read_distances(&self, n: usize) -> Result<Vec<Distance>, LineError> {
        (0..n).map(|_| self.read_distance()).collect()
    }

    pub fn read_velocities(&self, n: usize) -> Result<Vec<Velocity>, LineError> {
        (0..n).map(|_| self.read_velocity()).collect()
    }

    pub fn read_meteo_airs(&self, n: usize) -> Result<Vec<Meteo>, LineError> {
        (0..n).map(|_| self.read_meteo_air()).collect()
    }

    pub fn read_meteo_mats(&self, n: usize) -> Result<Vec<Meteo>, LineError> {
        (0..n).map(|_| self.read_meteo_mat()).collect()
    }
}

impl Drop for LineF1 {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "Error while closing connection");
        }
    }
}

struct ReaderLoop<R> {
    rx: R,
    shared: Arc<Shared>,
    resync_pause: Duration,
}

impl<R: Receiver> ReaderLoop<R> {
    fn run(mut self) {
        debug!("Reader loop running");
        let mut buf = [0u8; INBOUND_FRAME_SIZE];

        while !self.shared.stop.load(Ordering::Acquire) {
            let n = match self.rx.read_frame(&mut buf) {
                Ok(n) => n,
                Err(e) => {
                    let backoff = self.rx.read_timeout();
                    warn!(error = %e, ?backoff, "Transport read failed");
                    thread::sleep(backoff);
                    continue;
                }
            };

            if n < INBOUND_FRAME_SIZE {
                if n > 0 {
                    trace!(bytes = n, "Short read discarded");
                    self.shared.counters.short_reads.fetch_add(1, Ordering::Relaxed);
                }
                continue;
            }

            debug!(bytes = hex::encode(buf), "Read");
            match try_parse_inbound(&buf) {
                Ok(frame) => self.dispatch(frame),
                Err(e) => {
                    warn!(error = %e, "Invalid frame, resynchronising");
                    self.resync();
                }
            }
        }
        debug!("Reader loop stopped");
    }

    fn dispatch(&mut self, frame: InboundFrame) {
        match frame.kind() {
            Inbound::Distance => self.enqueue(decode_distance(&frame.payload).into()),
            Inbound::Velocity => self.enqueue(decode_velocity(&frame.payload).into()),
            Inbound::Meteo => self.enqueue(decode_meteo(&frame.payload).into()),
            Inbound::Ack(command) => {
                debug!(%command, "Command echo received");
                self.shared.counters.acks.fetch_add(1, Ordering::Relaxed);
                self.shared.ack.set();
            }
            Inbound::Unknown(code) => {
                warn!(opcode = format!("{code:#06x}"), "Unknown opcode, resynchronising");
                self.resync();
            }
        }
    }

    fn enqueue(&self, measurement: Measurement) {
        let stream = self.shared.queues.push(measurement);
        trace!(%stream, "Queued measurement");
        self.shared.counters.measurements.fetch_add(1, Ordering::Relaxed);
    }

    fn resync(&mut self) {
        thread::sleep(self.resync_pause);
        if let Err(e) = self.rx.clear_input() {
            warn!(error = %e, "Failed to clear receive buffer");
        }
        self.shared.counters.desyncs.fetch_add(1, Ordering::Relaxed);
    }
}
