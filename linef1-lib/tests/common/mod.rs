//! Common test utilities: an in-memory transport and frame builders

// Not every test file uses every helper
#![allow(dead_code)]

use linef1_lib::constants::START_BYTE;
use linef1_lib::crc::crc8;
use linef1_lib::{EngineConfig, LineError, Receiver, Response, Sender, Transport};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Read window of the mock link, like the short serial read timeout
pub const MOCK_READ_TIMEOUT: Duration = Duration::from_millis(10);

type Responder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>> + Send>;

#[derive(Debug, Default)]
struct LinkLog {
    written: Mutex<Vec<Vec<u8>>>,
    clears: AtomicUsize,
    closes: AtomicUsize,
}

/// In-memory duplex link. Inbound bytes are fed through a [`MockHandle`];
/// outbound frames are recorded and may trigger a scripted reply.
pub struct MockTransport {
    inbound: mpsc::Receiver<Vec<u8>>,
    feeder: mpsc::Sender<Vec<u8>>,
    log: Arc<LinkLog>,
    responder: Option<Responder>,
    fail_close: bool,
    failing_reads: usize,
    read_timeout: Duration,
}

/// Test-side view of a [`MockTransport`], usable after the engine owns it.
#[derive(Clone)]
pub struct MockHandle {
    feeder: mpsc::Sender<Vec<u8>>,
    log: Arc<LinkLog>,
}

impl MockTransport {
    /// A link that never answers
    pub fn new() -> (Self, MockHandle) {
        let (feeder, inbound) = mpsc::channel();
        let log = Arc::new(LinkLog::default());
        let handle = MockHandle {
            feeder: feeder.clone(),
            log: Arc::clone(&log),
        };
        let transport = Self {
            inbound,
            feeder,
            log,
            responder: None,
            fail_close: false,
            failing_reads: 0,
            read_timeout: MOCK_READ_TIMEOUT,
        };
        (transport, handle)
    }

    /// A link that acknowledges every command it receives
    pub fn acking() -> (Self, MockHandle) {
        let (transport, handle) = Self::new();
        (transport.with_responder(|frame| Some(ack_for(frame))), handle)
    }

    pub fn with_responder(mut self, responder: impl FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Fail the first `count` reads with an I/O error
    pub fn failing_reads(mut self, count: usize) -> Self {
        self.failing_reads = count;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl MockHandle {
    /// Deliver bytes to the receive side as one chunk
    pub fn feed(&self, bytes: &[u8]) {
        // The engine may already be closed
        let _ = self.feeder.send(bytes.to_vec());
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.log.written.lock().clone()
    }

    pub fn clears(&self) -> usize {
        self.log.clears.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.log.closes.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    type Rx = MockRx;
    type Tx = MockTx;

    fn split(self) -> Result<(MockRx, MockTx), LineError> {
        let rx = MockRx {
            inbound: self.inbound,
            pending: VecDeque::new(),
            log: Arc::clone(&self.log),
            failing_reads: self.failing_reads,
            read_timeout: self.read_timeout,
        };
        let tx = MockTx {
            feeder: self.feeder,
            log: self.log,
            responder: self.responder,
            fail_close: self.fail_close,
        };
        Ok((rx, tx))
    }
}

pub struct MockRx {
    inbound: mpsc::Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
    log: Arc<LinkLog>,
    failing_reads: usize,
    read_timeout: Duration,
}

impl Receiver for MockRx {
    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "link dropped"));
        }
        let deadline = Instant::now() + self.read_timeout;
        while self.pending.len() < buf.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.inbound.recv_timeout(remaining) {
                Ok(chunk) => self.pending.extend(chunk),
                Err(mpsc::RecvTimeoutError::Timeout) => break,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    std::thread::sleep(remaining);
                    break;
                }
            }
        }
        let n = self.pending.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.pending.clear();
        while self.inbound.try_recv().is_ok() {}
        self.log.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

pub struct MockTx {
    feeder: mpsc::Sender<Vec<u8>>,
    log: Arc<LinkLog>,
    responder: Option<Responder>,
    fail_close: bool,
}

impl Sender for MockTx {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.log.written.lock().push(frame.to_vec());
        if let Some(reply) = self.responder.as_mut().and_then(|respond| respond(frame)) {
            let _ = self.feeder.send(reply);
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(io::Error::other("port vanished"));
        }
        Ok(())
    }
}

/// Build a checksummed 16-byte inbound frame
pub fn inbound_frame(opcode: [u8; 2], payload: [u8; 12]) -> Vec<u8> {
    let mut frame = vec![START_BYTE, opcode[0], opcode[1]];
    frame.extend_from_slice(&payload);
    frame.push(crc8(&frame));
    frame
}

/// The instrument's echo of an outbound command frame
pub fn ack_for(command_frame: &[u8]) -> Vec<u8> {
    inbound_frame([command_frame[1], command_frame[2]], [0; 12])
}

/// Distance frame carrying `counts` × 100 pm with the given status bytes
pub fn distance_frame(counts: i64, overflow_status: u8, laser_status: u8, level: u8) -> Vec<u8> {
    let mut payload = [0u8; 12];
    payload[..7].copy_from_slice(&counts.to_be_bytes()[1..]);
    payload[9] = overflow_status;
    payload[10] = laser_status;
    payload[11] = level;
    inbound_frame(Response::DistanceData.to_bytes(), payload)
}

/// Velocity frame carrying `counts` × 100 nm/s
pub fn velocity_frame(counts: i32) -> Vec<u8> {
    let mut payload = [0u8; 12];
    payload[..4].copy_from_slice(&counts.to_be_bytes());
    payload[10] = 0x09;
    inbound_frame(Response::VelocityData.to_bytes(), payload)
}

/// Meteo frame; temperature in 0.01 °C, pressure in 10 Pa
pub fn meteo_frame(sensor_id: u8, temperature: i16, pressure: i16) -> Vec<u8> {
    let mut payload = [0u8; 12];
    payload[0] = sensor_id;
    payload[1..3].copy_from_slice(&temperature.to_be_bytes());
    payload[3] = 45;
    payload[4] = 200;
    payload[5] = 90;
    payload[6..8].copy_from_slice(&pressure.to_be_bytes());
    inbound_frame(Response::MeteoData.to_bytes(), payload)
}

/// Short timeouts so failure paths finish quickly
pub fn fast_config() -> EngineConfig {
    EngineConfig::default()
        .with_ack_timeout(Duration::from_millis(50))
        .with_read_timeout(Duration::from_secs(1))
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_for(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
