//! Big-endian two's-complement integers of arbitrary width.
//!
//! Measurement payloads pack their values in 1, 2, 4 and 7 byte fields, so
//! a fixed-width `from_be_bytes` does not cover them.

/// Decode `bytes` as a big-endian two's-complement signed integer.
///
/// The sign is taken from the top bit of the first byte. Inputs up to 16
/// bytes are decoded exactly; longer inputs keep only their low 128 bits.
/// An empty slice decodes to 0.
pub fn decode_signed(bytes: &[u8]) -> i128 {
    let Some(&first) = bytes.first() else {
        return 0;
    };

    if first < 0x80 {
        bytes.iter().fold(0i128, |acc, &b| (acc << 8) | i128::from(b))
    } else {
        let inverted = bytes
            .iter()
            .fold(0i128, |acc, &b| (acc << 8) | i128::from(0xFF - b));
        inverted.wrapping_add(1).wrapping_neg()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: i128, width: usize) -> Vec<u8> {
        value.to_be_bytes()[16 - width..].to_vec()
    }

    #[test]
    fn test_round_trip_boundaries() {
        for width in [1usize, 2, 4, 7] {
            let max = (1i128 << (width * 8 - 1)) - 1;
            let min = -(1i128 << (width * 8 - 1));
            let mut values = vec![0, -1, max, min];
            if width > 1 {
                values.extend([127, 128, -128, -129]);
            } else {
                values.extend([127, -128]);
            }
            for value in values {
                assert_eq!(
                    decode_signed(&encode(value, width)),
                    value,
                    "width {} value {}",
                    width,
                    value
                );
            }
        }
    }

    #[test]
    fn test_known_sequences() {
        assert_eq!(decode_signed(&[0x00, 0x64]), 100);
        assert_eq!(decode_signed(&[0xFF]), -1);
        assert_eq!(decode_signed(&[0x80]), -128);
        assert_eq!(decode_signed(&[0x00, 0x80]), 128);
        assert_eq!(decode_signed(&[0xFF, 0xFF, 0xCF, 0xC7]), -12345);
        assert_eq!(
            decode_signed(&[0x00, 0x00, 0x00, 0x1D, 0xCD, 0x65, 0x00]),
            500_000_000
        );
    }

    #[test]
    fn test_seven_byte_extremes() {
        assert_eq!(
            decode_signed(&[0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]),
            (1i128 << 55) - 1
        );
        assert_eq!(
            decode_signed(&[0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]),
            -(1i128 << 55)
        );
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(decode_signed(&[]), 0);
    }
}
