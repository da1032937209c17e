use crate::opcode::Command;
use std::io;
use thiserror::Error;

/// The primary error type for the `linef1-lib` library.
#[derive(Error, Debug)]
pub enum LineError {
    #[error("Timeout while waiting for {what}")]
    WaitTimeout { what: &'static str },

    #[error("No acknowledgment for '{command}' after {attempts} attempts")]
    ConnectionExhausted { command: Command, attempts: u32 },

    #[error("Invalid frame length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Reader thread panicked")]
    ReaderPanicked,
}
