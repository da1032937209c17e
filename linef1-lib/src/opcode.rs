use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Commands sent from the host to the instrument.
///
/// The instrument acknowledges a command by echoing its opcode in an
/// inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u16)]
pub enum Command {
    #[strum(to_string = "distance on")]
    DistanceOn = 0xB032,
    #[strum(to_string = "distance off")]
    DistanceOff = 0xB033,
    #[strum(to_string = "velocity on")]
    VelocityOn = 0xB034,
    #[strum(to_string = "velocity off")]
    VelocityOff = 0xB035,
    #[strum(to_string = "stop all streams")]
    StopAllStreams = 0xB03C,
    #[strum(to_string = "clear small signal flag")]
    ClearSmallSignalFlag = 0xB03D,
    #[strum(to_string = "clear velocity overflow flag")]
    ClearVelocityOverflowFlag = 0xB03F,
    #[strum(to_string = "clear external capture flag")]
    ClearExternalCaptureFlag = 0xB040,
    #[strum(to_string = "reset origin")]
    ResetOrigin = 0xB048,
    #[strum(to_string = "meteo on")]
    MeteoOn = 0xB079,
    #[strum(to_string = "meteo off")]
    MeteoOff = 0xB07A,
}

impl Command {
    pub const ALL: [Command; 11] = [
        Command::DistanceOn,
        Command::DistanceOff,
        Command::VelocityOn,
        Command::VelocityOff,
        Command::StopAllStreams,
        Command::ClearSmallSignalFlag,
        Command::ClearVelocityOverflowFlag,
        Command::ClearExternalCaptureFlag,
        Command::ResetOrigin,
        Command::MeteoOn,
        Command::MeteoOff,
    ];

    /// Opcode as it appears on the wire
    pub fn to_bytes(self) -> [u8; 2] {
        u16::from(self).to_be_bytes()
    }

    pub fn distance(on: bool) -> Self {
        if on { Command::DistanceOn } else { Command::DistanceOff }
    }

    pub fn velocity(on: bool) -> Self {
        if on { Command::VelocityOn } else { Command::VelocityOff }
    }

    pub fn meteo(on: bool) -> Self {
        if on { Command::MeteoOn } else { Command::MeteoOff }
    }
}

/// Measurement data opcodes sent by the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u16)]
pub enum Response {
    #[strum(to_string = "meteo data")]
    MeteoData = 0xB00A,
    #[strum(to_string = "distance data")]
    DistanceData = 0xB015,
    #[strum(to_string = "velocity data")]
    VelocityData = 0xB016,
}

impl Response {
    pub fn to_bytes(self) -> [u8; 2] {
        u16::from(self).to_be_bytes()
    }
}

/// What an inbound frame means, decided once from its opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    Distance,
    Velocity,
    Meteo,
    /// Echo of a command: the instrument accepted it
    Ack(Command),
    Unknown(u16),
}

impl From<u16> for Inbound {
    fn from(code: u16) -> Self {
        if let Ok(response) = Response::try_from(code) {
            return match response {
                Response::DistanceData => Inbound::Distance,
                Response::VelocityData => Inbound::Velocity,
                Response::MeteoData => Inbound::Meteo,
            };
        }
        match Command::try_from(code) {
            Ok(command) => Inbound::Ack(command),
            Err(_) => Inbound::Unknown(code),
        }
    }
}

impl From<[u8; 2]> for Inbound {
    fn from(bytes: [u8; 2]) -> Self {
        Inbound::from(u16::from_be_bytes(bytes))
    }
}
