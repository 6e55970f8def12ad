/*! CRC-CCITT frame check sequence.

The 16-bit CRC protecting the body of an AX.25 frame: polynomial
0x1021, initial register 0xFFFF, MSB first. Check value for the ASCII
string `"123456789"` is 0x29B1.

The FCS goes on the wire little-endian, after the payload and before
the closing flag.
 */

const POLY: u16 = 0x1021;
const INIT: u16 = 0xffff;

/// Calculate the CRC-CCITT checksum over `data`.
#[must_use]
pub fn crc_ccitt(data: &[u8]) -> u16 {
    data.iter().fold(INIT, |crc, &byte| {
        let mut crc = crc ^ (u16::from(byte) << 8);
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
        }
        crc
    })
}
