//! Duplex byte channel underneath the protocol engine.
//!
//! The engine splits a [`Transport`] into a receive half, owned by the
//! background reader, and a transmit half, used by the command path. The two
//! halves never contend because they use opposite directions of the link.

use crate::constants::{BAUD_RATE, SERIAL_READ_TIMEOUT};
use crate::error::LineError;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Receive half of a transport.
pub trait Receiver: Send + 'static {
    /// Fill as much of `buf` as arrives within the transport's read timeout.
    ///
    /// Returning fewer than `buf.len()` bytes is a short read, not an error.
    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Discard everything waiting in the receive buffer.
    fn clear_input(&mut self) -> io::Result<()>;

    /// How long one [`read_frame`](Self::read_frame) may block. The reader
    /// also waits this long before retrying after a failed read.
    fn read_timeout(&self) -> Duration {
        SERIAL_READ_TIMEOUT
    }
}

/// Transmit half of a transport.
pub trait Sender: Send + 'static {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Flush and release the link.
    fn close(&mut self) -> io::Result<()>;
}

/// A link that can be split into independent receive and transmit halves.
pub trait Transport {
    type Rx: Receiver;
    type Tx: Sender;

    fn split(self) -> Result<(Self::Rx, Self::Tx), LineError>;
}

/// Serial link settings. Framing is fixed at 8N1 without flow control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Port name (e.g. COM7, /dev/ttyUSB0)
    pub port: String,
    pub baud_rate: u32,
    /// Keep this short: it bounds how quickly the reader notices a close
    pub read_timeout: Duration,
}

impl SerialConfig {
    pub fn new(port: &str) -> Self {
        Self {
            port: port.to_string(),
            baud_rate: BAUD_RATE,
            read_timeout: SERIAL_READ_TIMEOUT,
        }
    }

    #[must_use]
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

/// Serial port link to the instrument.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    read_timeout: Duration,
}

impl SerialTransport {
    pub fn open(config: &SerialConfig) -> Result<Self, LineError> {
        info!(port = %config.port, baud = config.baud_rate, "Opening serial port");
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout)
            .open()?;

        Ok(Self {
            port,
            read_timeout: config.read_timeout,
        })
    }
}

impl Transport for SerialTransport {
    type Rx = SerialReceiver;
    type Tx = SerialSender;

    fn split(self) -> Result<(SerialReceiver, SerialSender), LineError> {
        let rx_port = self.port.try_clone()?;
        Ok((
            SerialReceiver {
                port: rx_port,
                read_timeout: self.read_timeout,
            },
            SerialSender { port: self.port },
        ))
    }
}

pub struct SerialReceiver {
    port: Box<dyn SerialPort>,
    read_timeout: Duration,
}

impl Receiver for SerialReceiver {
    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let deadline = Instant::now().checked_add(self.read_timeout);
        let mut filled = 0;
        while filled < buf.len() {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                break;
            }
        }
        Ok(filled)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

pub struct SerialSender {
    port: Box<dyn SerialPort>,
}

impl Sender for SerialSender {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.port.write_all(frame)?;
        self.port.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        debug!("Flushing serial port before close");
        self.port.flush()
    }
}
