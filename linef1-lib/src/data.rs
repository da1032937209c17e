//! Measurement records and their fixed-layout payload decoders.
//!
//! Every decoder takes the 12-byte payload of a frame that already passed
//! the checksum, and never fails: unexpected flag bits or sensor ids are
//! reported as they are.

use crate::constants::INBOUND_PAYLOAD_SIZE;
use crate::signed::decode_signed;
use modular_bitfield::prelude::*;
use std::fmt;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One distance count is 100 pm
const DISTANCE_SCALE_M: f64 = 100e-12;
/// One velocity count is 100 nm/s
const VELOCITY_SCALE_M_S: f64 = 100e-9;
const TEMPERATURE_SCALE_C: f64 = 0.01;
const PRESSURE_SCALE_PA: f64 = 10.0;

/// Sensor id of the air (atmospheric) meteo station; any other id is a material sensor
pub const AIR_SENSOR_ID: u8 = 0;

/// Byte 9 of a distance/velocity payload
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverflowStatus {
    #[skip]
    unused_low: B3,
    pub velocity_overflow: bool,
    #[skip]
    unused_high: B4,
}

/// Byte 10 of a distance/velocity payload
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaserStatus {
    pub laser_on: bool,
    #[skip]
    unused_low: B2,
    /// Set while the return signal is strong enough
    pub signal_ok: bool,
    #[skip]
    unused_high: B4,
}

/// Distance payload: 7-byte count, 2 reserved bytes, status bytes, level
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct DistanceRaw {
    pub count: [u8; 7],
    pub reserved: [u8; 2],
    pub overflow_status: u8,
    pub laser_status: u8,
    pub level: u8,
}

/// Velocity payload: 4-byte count, 5 reserved bytes, status bytes, level
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct VelocityRaw {
    pub count: [u8; 4],
    pub reserved: [u8; 5],
    pub overflow_status: u8,
    pub laser_status: u8,
    pub level: u8,
}

/// Meteo payload
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct MeteoRaw {
    pub sensor_id: u8,
    pub temperature: [u8; 2], // 0.01 °C, signed
    pub humidity: u8,         // %
    pub battery: u8,          // raw, unit unknown
    pub link: u8,             // raw, unit unknown
    pub pressure: [u8; 2],    // 10 Pa
    pub reserved: [u8; 4],
}

/// Decoded status bytes shared by distance and velocity records
struct BeamFlags {
    velocity_overflow_flag: bool,
    laser_state_flag: bool,
    /// True when the return signal is too weak (inverse of the wire bit)
    small_signal_level_flag: bool,
    level: u8,
}

impl BeamFlags {
    fn from_raw(overflow_status: u8, laser_status: u8, level: u8) -> Self {
        let overflow = OverflowStatus::from_bytes([overflow_status]);
        let laser = LaserStatus::from_bytes([laser_status]);
        Self {
            velocity_overflow_flag: overflow.velocity_overflow(),
            laser_state_flag: laser.laser_on(),
            small_signal_level_flag: !laser.signal_ok(),
            level,
        }
    }
}

/// Distance sample, streamed at 25 Hz while enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Distance {
    /// Metres from the origin
    pub value: f64,
    pub velocity_overflow_flag: bool,
    pub laser_state_flag: bool,
    pub small_signal_level_flag: bool,
    pub level: u8,
}

/// Velocity sample, streamed at 25 Hz while enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Velocity {
    /// Metres per second
    pub value: f64,
    pub velocity_overflow_flag: bool,
    pub laser_state_flag: bool,
    pub small_signal_level_flag: bool,
    pub level: u8,
}

/// Environmental sample from the air station or a material sensor, 1 Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Meteo {
    /// 0 is the air station, 1.. are material sensors
    pub sensor_id: u8,
    /// °C
    pub temperature: f64,
    /// %
    pub humidity: u8,
    pub battery: u8,
    pub link: u8,
    /// Pa
    pub pressure: f64,
}

impl Meteo {
    pub fn is_air(&self) -> bool {
        self.sensor_id == AIR_SENSOR_ID
    }
}

impl From<DistanceRaw> for Distance {
    fn from(raw: DistanceRaw) -> Self {
        let flags = BeamFlags::from_raw(raw.overflow_status, raw.laser_status, raw.level);
        Distance {
            value: decode_signed(&raw.count) as f64 * DISTANCE_SCALE_M,
            velocity_overflow_flag: flags.velocity_overflow_flag,
            laser_state_flag: flags.laser_state_flag,
            small_signal_level_flag: flags.small_signal_level_flag,
            level: flags.level,
        }
    }
}

impl From<VelocityRaw> for Velocity {
    fn from(raw: VelocityRaw) -> Self {
        let flags = BeamFlags::from_raw(raw.overflow_status, raw.laser_status, raw.level);
        Velocity {
            value: decode_signed(&raw.count) as f64 * VELOCITY_SCALE_M_S,
            velocity_overflow_flag: flags.velocity_overflow_flag,
            laser_state_flag: flags.laser_state_flag,
            small_signal_level_flag: flags.small_signal_level_flag,
            level: flags.level,
        }
    }
}

impl From<MeteoRaw> for Meteo {
    fn from(raw: MeteoRaw) -> Self {
        Meteo {
            sensor_id: raw.sensor_id,
            temperature: decode_signed(&raw.temperature) as f64 * TEMPERATURE_SCALE_C,
            humidity: raw.humidity,
            battery: raw.battery,
            link: raw.link,
            pressure: decode_signed(&raw.pressure) as f64 * PRESSURE_SCALE_PA,
        }
    }
}

pub fn decode_distance(payload: &[u8; INBOUND_PAYLOAD_SIZE]) -> Distance {
    let raw: DistanceRaw = zerocopy::transmute!(*payload);
    Distance::from(raw)
}

pub fn decode_velocity(payload: &[u8; INBOUND_PAYLOAD_SIZE]) -> Velocity {
    let raw: VelocityRaw = zerocopy::transmute!(*payload);
    Velocity::from(raw)
}

pub fn decode_meteo(payload: &[u8; INBOUND_PAYLOAD_SIZE]) -> Meteo {
    let raw: MeteoRaw = zerocopy::transmute!(*payload);
    Meteo::from(raw)
}

/// Any record the instrument streams.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Measurement {
    Distance(Distance),
    Velocity(Velocity),
    Meteo(Meteo),
}

impl From<Distance> for Measurement {
    fn from(d: Distance) -> Self {
        Measurement::Distance(d)
    }
}

impl From<Velocity> for Measurement {
    fn from(v: Velocity) -> Self {
        Measurement::Velocity(v)
    }
}

impl From<Meteo> for Measurement {
    fn from(m: Meteo) -> Self {
        Measurement::Meteo(m)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Distance: {:.8} m, velocity overflow: {}, laser: {}, small signal: {}, level: {}",
            self.value,
            u8::from(self.velocity_overflow_flag),
            u8::from(self.laser_state_flag),
            u8::from(self.small_signal_level_flag),
            self.level
        )
    }
}

impl fmt::Display for Velocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Velocity: {:.8} m/s, velocity overflow: {}, laser: {}, small signal: {}, level: {}",
            self.value,
            u8::from(self.velocity_overflow_flag),
            u8::from(self.laser_state_flag),
            u8::from(self.small_signal_level_flag),
            self.level
        )
    }
}

impl fmt::Display for Meteo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = if self.is_air() { "air" } else { "material" };
        write!(
            f,
            "Meteo ({} #{}): {:.3} °C, humidity: {} %, battery: {}, link: {}, pressure: {:.0} Pa",
            source, self.sensor_id, self.temperature, self.humidity, self.battery, self.link, self.pressure
        )
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::Distance(d) => d.fmt(f),
            Measurement::Velocity(v) => v.fmt(f),
            Measurement::Meteo(m) => m.fmt(f),
        }
    }
}
