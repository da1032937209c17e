//! CRC-8 used by every frame on the link.
//!
//! Polynomial 0x31, initial value 0xFF, no reflection and no final XOR
//! (CRC-8/NRSC-5 parameters).

const POLYNOMIAL: u8 = 0x31;
const INIT: u8 = 0xFF;

/// Compute the frame checksum over `bytes`.
pub fn crc8(bytes: &[u8]) -> u8 {
    let mut crc = INIT;
    for &byte in bytes {
        let mut c = byte;
        for _ in 0..8 {
            if (crc ^ c) & 0x80 != 0 {
                crc = (crc << 1) ^ POLYNOMIAL;
            } else {
                crc <<= 1;
            }
            c <<= 1;
        }
    }
    crc
}
