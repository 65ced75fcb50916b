//! KMP frame codec: framing, byte-stuffing and checksum.
//!
//! A frame on the wire is, before escaping:
//!
//! ```text
//! +-----------+---------+---------+----------+--------+--------+------+
//! | direction | address | command | data ... | ck hi  | ck lo  | 0x0D |
//! +-----------+---------+---------+----------+--------+--------+------+
//! ```
//!
//! Everything between the direction byte and the stop byte is byte-stuffed:
//! any payload byte that collides with a control byte is replaced by
//! `0x1B, byte ^ 0xFF`. The direction and stop bytes themselves are never
//! escaped, which is what makes the stop byte an unambiguous terminator.
//!
//! The checksum is CCITT CRC-16 (polynomial 0x1021) with an initial register
//! of zero rather than the customary 0xFFFF. Kamstrup computes it over the
//! message followed by two zero placeholder bytes; that zero augmentation is
//! exactly what CRC-16/XMODEM performs implicitly, so [`checksum`] is XMODEM
//! over the bare message.

use crc::{Crc, CRC_16_XMODEM};

use crate::command::Command;
use crate::error::{KmpError, KmpResult};

/// Start byte for frames sent to the meter.
pub const TO_METER: u8 = 0x80;

/// Start byte used by the meter for replies.
pub const FROM_METER: u8 = 0x40;

/// Single-byte acknowledgment sent by the meter.
pub const ACK: u8 = 0x06;

/// Frame terminator.
pub const STOP: u8 = 0x0D;

/// Escape introducer for byte-stuffing.
pub const ESCAPE: u8 = 0x1B;

/// Minimum unescaped length of a non-acknowledge frame:
/// direction, address, command, two checksum bytes and the stop byte.
const MIN_FRAME_LEN: usize = 6;

/// Kamstrup's block check: CCITT polynomial with initial value 0.
const CKSUM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Byte values which must be escaped before transmission.
fn needs_escape(byte: u8) -> bool {
    matches!(byte, STOP | ACK | ESCAPE | FROM_METER | TO_METER)
}

/// Compute the KMP checksum over `address . command . data`.
///
/// The two zero placeholder bytes the meter appends before checksumming are
/// already accounted for by the XMODEM augmentation; pass the bare message.
/// `checksum(&[])` is 0.
pub fn checksum(msg: &[u8]) -> u16 {
    CKSUM.checksum(msg)
}

/// Direction of a frame, taken from its leading byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Host to meter (0x80).
    ToMeter,
    /// Meter to host (0x40).
    FromMeter,
    /// Bare acknowledgment (0x06), carries no further fields.
    Ack,
    /// Leading byte 0x00; accepted on decode for tolerance.
    Untyped,
}

impl FrameType {
    /// The wire byte for this frame type.
    pub fn to_u8(self) -> u8 {
        match self {
            FrameType::ToMeter => TO_METER,
            FrameType::FromMeter => FROM_METER,
            FrameType::Ack => ACK,
            FrameType::Untyped => 0x00,
        }
    }

    fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            TO_METER => Some(FrameType::ToMeter),
            FROM_METER => Some(FrameType::FromMeter),
            ACK => Some(FrameType::Ack),
            0x00 => Some(FrameType::Untyped),
            _ => None,
        }
    }
}

/// One complete protocol message, in memory.
///
/// Immutable after creation; encoded with [`Frame::encode`] for
/// transmission or produced by [`Frame::decode`] from received bytes.
/// For acknowledge frames the address, command and data fields are unused
/// and left zeroed/empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: FrameType,
    pub address: u8,
    pub command: u8,
    pub data: Vec<u8>,
}

impl Frame {
    /// Build a request frame addressed to the meter.
    pub fn request(address: u8, command: Command, data: Vec<u8>) -> Self {
        Self {
            frame_type: FrameType::ToMeter,
            address,
            command: command.to_u8(),
            data,
        }
    }

    /// Build a bare acknowledge frame.
    pub fn ack() -> Self {
        Self {
            frame_type: FrameType::Ack,
            address: 0,
            command: 0,
            data: Vec::new(),
        }
    }

    /// Whether this is a bare acknowledgment.
    pub fn is_ack(&self) -> bool {
        self.frame_type == FrameType::Ack
    }

    /// Encode the frame, escaping included, ready for the wire.
    ///
    /// Encoding is total: every in-memory frame has a wire form.
    pub fn encode(&self) -> Vec<u8> {
        if self.is_ack() {
            // An acknowledgment is a single byte on the wire.
            return vec![ACK];
        }

        let mut payload = Vec::with_capacity(self.data.len() + 4);
        payload.push(self.address);
        payload.push(self.command);
        payload.extend_from_slice(&self.data);

        let cksum = checksum(&payload);
        payload.extend_from_slice(&cksum.to_be_bytes());

        let mut raw = Vec::with_capacity(payload.len() + 2);
        raw.push(self.frame_type.to_u8());
        for &byte in &payload {
            if needs_escape(byte) {
                raw.push(ESCAPE);
                raw.push(byte ^ 0xFF);
            } else {
                raw.push(byte);
            }
        }
        raw.push(STOP);

        raw
    }

    /// Decode a raw frame received from the wire.
    ///
    /// Every malformed input maps to a specific error: empty input,
    /// truncated frames (including a dangling escape introducer and a
    /// missing stop byte), an unrecognized direction byte, and a checksum
    /// mismatch.
    pub fn decode(raw: &[u8]) -> KmpResult<Frame> {
        if raw.is_empty() {
            return Err(KmpError::EmptyFrame);
        }

        // Unescape everything strictly between the first and last byte;
        // those two pass through verbatim even if they collide with an
        // escape value.
        let mut unescaped = Vec::with_capacity(raw.len());
        unescaped.push(raw[0]);
        if raw.len() >= 2 {
            let interior_end = raw.len() - 1;
            let mut i = 1;
            while i < interior_end {
                let byte = raw[i];
                if byte == ESCAPE {
                    i += 1;
                    if i >= interior_end {
                        return Err(KmpError::FrameTooShort);
                    }
                    unescaped.push(raw[i] ^ 0xFF);
                } else {
                    unescaped.push(byte);
                }
                i += 1;
            }
            unescaped.push(raw[interior_end]);
        }

        let frame_type = match FrameType::from_u8(unescaped[0]) {
            Some(FrameType::Ack) => return Ok(Frame::ack()),
            Some(other) => other,
            None => return Err(KmpError::invalid_frame_type(unescaped[0])),
        };

        let len = unescaped.len();
        if len < MIN_FRAME_LEN {
            return Err(KmpError::FrameTooShort);
        }

        let address = unescaped[1];
        let command = unescaped[2];
        let data = unescaped[3..len - 3].to_vec();

        let mut msg = Vec::with_capacity(data.len() + 2);
        msg.push(address);
        msg.push(command);
        msg.extend_from_slice(&data);
        let expected = checksum(&msg);
        let actual = u16::from_be_bytes([unescaped[len - 3], unescaped[len - 2]]);
        if expected != actual {
            return Err(KmpError::checksum_invalid(expected, actual));
        }

        if unescaped[len - 1] != STOP {
            return Err(KmpError::FrameTooShort);
        }

        Ok(Frame {
            frame_type,
            address,
            command,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The bit-serial block check as the meter documentation describes it:
    /// CCITT polynomial, register initialised to zero, message fed MSB
    /// first with two trailing zero placeholder bytes.
    fn reference_checksum(msg: &[u8]) -> u16 {
        let mut augmented = msg.to_vec();
        augmented.push(0x00);
        augmented.push(0x00);

        let poly: u32 = 0x1021;
        let mut reg: u32 = 0;
        for &byte in &augmented {
            let mut mask = 0x80u8;
            while mask > 0 {
                reg <<= 1;
                if byte & mask != 0 {
                    reg |= 1;
                }
                mask >>= 1;
                if reg & 0x10000 != 0 {
                    reg &= 0xFFFF;
                    reg ^= poly;
                }
            }
        }
        reg as u16
    }

    #[test]
    fn test_checksum_empty() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn test_checksum_matches_bit_serial_reference() {
        let samples: &[&[u8]] = &[
            &[],
            &[0x3F, 0x10, 0x01, 0x00, 0x01],
            &[0x3F, 0x02],
            &[0x00],
            &[0xFF, 0xFF, 0xFF],
            &[0x12, 0x34, 0x56, 0x78, 0x9A],
        ];
        for msg in samples {
            assert_eq!(
                checksum(msg),
                reference_checksum(msg),
                "checksum mismatch for {msg:02X?}"
            );
        }
    }

    #[test]
    fn test_checksum_sensitivity() {
        // Flipping any single byte must change the checksum.
        let msg = [0x3F, 0x10, 0x01, 0x04, 0x1E, 0x04, 0x1F];
        let base = checksum(&msg);
        for i in 0..msg.len() {
            let mut mutated = msg;
            mutated[i] ^= 0x01;
            assert_ne!(checksum(&mutated), base, "byte {i} did not affect checksum");
        }
    }

    #[test]
    fn test_round_trip() {
        let frame = Frame::request(0x3F, Command::GetRegister, vec![0x01, 0x04, 0x1E]);
        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded.frame_type, FrameType::ToMeter);
        assert_eq!(decoded.address, 0x3F);
        assert_eq!(decoded.command, 0x10);
        assert_eq!(decoded.data, vec![0x01, 0x04, 0x1E]);
    }

    #[test]
    fn test_escaping_full_set() {
        // Data containing every escapable byte round-trips, and the raw
        // form carries each as the two-byte stuffed sequence.
        let data = vec![STOP, ACK, ESCAPE, TO_METER, FROM_METER];
        let frame = Frame::request(0x3F, Command::PutRegister, data.clone());
        let raw = frame.encode();

        for &byte in &data {
            let stuffed = raw
                .windows(2)
                .any(|w| w[0] == ESCAPE && w[1] == (byte ^ 0xFF));
            assert!(
                stuffed,
                "byte 0x{byte:02X} was not stuffed as {{0x1B, 0x{:02X}}}",
                byte ^ 0xFF
            );
        }
        // Direction and stop bytes pass through unescaped.
        assert_eq!(raw[0], TO_METER);
        assert_eq!(*raw.last().unwrap(), STOP);

        let decoded = Frame::decode(&raw).unwrap();
        assert_eq!(decoded.data, data);
    }

    #[test]
    fn test_decode_ack() {
        let decoded = Frame::decode(&[ACK]).unwrap();
        assert!(decoded.is_ack());
        assert!(decoded.data.is_empty());
    }

    #[test]
    fn test_ack_round_trip() {
        let raw = Frame::ack().encode();
        assert_eq!(raw, vec![ACK]);
        assert!(Frame::decode(&raw).unwrap().is_ack());
    }

    #[test]
    fn test_decode_failure_classification() {
        assert_eq!(Frame::decode(&[]).unwrap_err(), KmpError::EmptyFrame);

        // Valid direction byte, but shorter than the minimum frame.
        assert_eq!(
            Frame::decode(&[FROM_METER, 0x3F, 0x10, 0x00, STOP]).unwrap_err(),
            KmpError::FrameTooShort
        );

        // Unrecognized direction byte on a long-enough frame.
        let err = Frame::decode(&[0x55, 0x3F, 0x10, 0x00, 0x00, 0x00, STOP]).unwrap_err();
        assert_eq!(err, KmpError::invalid_frame_type(0x55));
    }

    #[test]
    fn test_decode_checksum_flip() {
        // Pick a payload whose checksum bytes are plain on the wire so the
        // flipped byte is really the embedded checksum, not escape stuffing.
        let (mut raw, _) = (0u8..=255)
            .map(|b| {
                let cksum = checksum(&[0x3F, 0x10, b]).to_be_bytes();
                (Frame::request(0x3F, Command::GetRegister, vec![b]).encode(), cksum)
            })
            .find(|(_, cksum)| {
                !needs_escape(cksum[0])
                    && !needs_escape(cksum[1])
                    && !needs_escape(cksum[0] ^ 0x01)
            })
            .expect("some payload yields an unescaped checksum");
        let cksum_hi = raw.len() - 3;
        raw[cksum_hi] ^= 0x01;
        assert!(matches!(
            Frame::decode(&raw),
            Err(KmpError::ChecksumInvalid { .. })
        ));
    }

    #[test]
    fn test_decode_dangling_escape() {
        // An escape introducer with nothing but the terminator after it.
        let raw = [FROM_METER, 0x3F, 0x10, 0x00, 0x00, ESCAPE, STOP];
        assert_eq!(Frame::decode(&raw).unwrap_err(), KmpError::FrameTooShort);
    }

    #[test]
    fn test_decode_missing_stop() {
        // Well-formed frame with the stop byte replaced; the checksum still
        // verifies (it does not cover the terminator), so the frame is
        // reported as truncated.
        let mut raw = Frame::request(0x3F, Command::GetType, vec![]).encode();
        let last = raw.len() - 1;
        raw[last] = 0x00;
        assert_eq!(Frame::decode(&raw).unwrap_err(), KmpError::FrameTooShort);
    }

    #[test]
    fn test_escaped_checksum_bytes_round_trip() {
        // Hunt for a payload whose checksum bytes land in the escape set,
        // so the checksum itself gets stuffed on the wire.
        let mut found = false;
        for b in 0u8..=255 {
            let frame = Frame::request(0x3F, Command::GetRegister, vec![b]);
            let cksum = checksum(&[0x3F, 0x10, b]).to_be_bytes();
            if needs_escape(cksum[0]) || needs_escape(cksum[1]) {
                let decoded = Frame::decode(&frame.encode()).unwrap();
                assert_eq!(decoded.data, vec![b]);
                found = true;
            }
        }
        assert!(found, "no payload produced an escapable checksum byte");
    }
}
