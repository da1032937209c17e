use crate::data::{Measurement, decode_distance, decode_meteo, decode_velocity};
use crate::frame::{encode_command, try_parse_inbound};
use crate::opcode::{Command, Inbound};
use crate::queue::{MeasurementQueues, Stream};
use std::time::Duration;

fn decode(hex_data: &str) -> Option<Measurement> {
    let bytes = hex::decode(hex_data).expect("Failed to decode hex");
    let frame = try_parse_inbound(&bytes).expect("Failed to parse frame");
    match frame.kind() {
        Inbound::Distance => Some(decode_distance(&frame.payload).into()),
        Inbound::Velocity => Some(decode_velocity(&frame.payload).into()),
        Inbound::Meteo => Some(decode_meteo(&frame.payload).into()),
        Inbound::Ack(_) | Inbound::Unknown(_) => None,
    }
}

#[test]
fn test_frame_aab0150000001dcd6500000008012a7b() {
    match decode("aab0150000001dcd6500000008012a7b") {
        Some(Measurement::Distance(d)) => {
            assert!((d.value - 0.05).abs() < 1e-12);
            assert!(d.velocity_overflow_flag);
            assert!(d.laser_state_flag);
            assert!(d.small_signal_level_flag);
            assert_eq!(d.level, 42);
        }
        other => panic!("Expected distance, got {:?}", other),
    }
}

#[test]
fn test_frame_aab016ffffcfc700000000000009806a() {
    match decode("aab016ffffcfc700000000000009806a") {
        Some(Measurement::Velocity(v)) => {
            assert!((v.value + 0.0012345).abs() < 1e-12);
            assert!(v.laser_state_flag);
            assert!(!v.small_signal_level_flag);
        }
        other => panic!("Expected velocity, got {:?}", other),
    }
}

#[test]
fn test_meteo_frames_route_by_sensor() {
    let queues = MeasurementQueues::new();
    for hex_data in ["aab00a0000642dc85a27940000000099", "aab00a02fdda00964600000000000001"] {
        queues.push(decode(hex_data).expect("Expected meteo"));
    }

    let air = queues.pop_meteo_air(Duration::ZERO).expect("air record");
    assert_eq!(air.sensor_id, 0);
    assert!((air.temperature - 1.0).abs() < 1e-9);
    assert!((air.pressure - 101_320.0).abs() < 1e-6);

    let mat = queues.pop_meteo_mat(Duration::ZERO).expect("material record");
    assert_eq!(mat.sensor_id, 2);
    assert!((mat.temperature + 5.5).abs() < 1e-9);

    assert!(queues.pop_timeout(Stream::MeteoAir, Duration::ZERO).is_none());
}

#[test]
fn test_ack_echoes_command_opcode() {
    let sent = encode_command(Command::DistanceOn, [0; 4]);
    let echo = hex::decode("aab0320000000000000000000000006f").unwrap();
    assert_eq!(&sent[1..3], &echo[1..3]);
    let frame = try_parse_inbound(&echo).unwrap();
    assert_eq!(frame.kind(), Inbound::Ack(Command::DistanceOn));
    assert_eq!(decode("aab0320000000000000000000000006f"), None);
}

#[test]
fn test_unknown_opcode_is_valid_frame() {
    let bytes = hex::decode("aab099000000000000000000000000da").unwrap();
    let frame = try_parse_inbound(&bytes).unwrap();
    assert_eq!(frame.kind(), Inbound::Unknown(0xB099));
}
