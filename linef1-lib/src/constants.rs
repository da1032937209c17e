// Protocol constants for the LINE F1 interferometer link

use std::time::Duration;

/// First byte of every frame in both directions
pub const START_BYTE: u8 = 0xAA;

/// Size of the opcode field (2 bytes, big-endian)
pub const OPCODE_SIZE: usize = 2;

/// Size of a host-to-device command payload (4 bytes)
pub const COMMAND_PAYLOAD_SIZE: usize = 4;

/// Size of a device-to-host payload (12 bytes)
pub const INBOUND_PAYLOAD_SIZE: usize = 12;

/// Outbound command frame: START(1) | OPCODE(2) | PAYLOAD(4) | CRC(1)
pub const COMMAND_FRAME_SIZE: usize = 1 + OPCODE_SIZE + COMMAND_PAYLOAD_SIZE + 1;

/// Inbound frame: START(1) | OPCODE(2) | PAYLOAD(12) | CRC(1)
pub const INBOUND_FRAME_SIZE: usize = 1 + OPCODE_SIZE + INBOUND_PAYLOAD_SIZE + 1;

/// Payload sent with every configuration command
pub const EMPTY_PAYLOAD: [u8; COMMAND_PAYLOAD_SIZE] = [0; COMMAND_PAYLOAD_SIZE];

/// Fixed link rate of the instrument (8N1, no flow control)
pub const BAUD_RATE: u32 = 3_000_000;

/// Serial read timeout; bounds how long the reader loop takes to notice a stop request
pub const SERIAL_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// How long a command waits for its acknowledgment before retransmitting
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a client read waits for a measurement
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Retransmissions after the first attempt before a command is given up
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Pause before discarding the receive buffer after a desync
pub const RESYNC_PAUSE: Duration = Duration::from_millis(1);

/// Distance stream sampling rate (Hz)
pub const DISTANCE_RATE_HZ: u32 = 25;

/// Velocity stream sampling rate (Hz)
pub const VELOCITY_RATE_HZ: u32 = 25;

/// Meteo stream sampling rate (Hz)
pub const METEO_RATE_HZ: u32 = 1;
