pub mod config;
pub mod constants;
pub mod crc;
pub mod data;
pub mod device;
pub mod error;
pub mod frame;
pub mod opcode;
pub mod queue;
pub mod signed;
pub mod transport;

#[cfg(test)]
mod tests;

// Re-export the main types for easy access
pub use config::EngineConfig;
pub use data::{Distance, Measurement, Meteo, Velocity};
pub use device::{LineF1, LinkStats};
pub use error::LineError;
pub use frame::{InboundFrame, encode_command, try_parse_inbound};
pub use opcode::{Command, Inbound, Response};
pub use queue::Stream;
pub use transport::{Receiver, Sender, SerialConfig, SerialTransport, Transport};
