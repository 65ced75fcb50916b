//! Register value decoding and the meter unit table.
//!
//! Registers come back from the meter in a compact floating-point layout:
//!
//! ```text
//! +------+-------------+------------------+---------------------+
//! | unit | mantissa    | exponent control | mantissa bytes ...  |
//! | code | length (L)  | sNNEEEEEE        | big-endian, L bytes |
//! +------+-------------+------------------+---------------------+
//! ```
//!
//! The control byte packs the exponent magnitude in bits 0–5, exponent sign
//! in bit 6 and an overall value sign in bit 7. Values pack back-to-back in
//! a reply, so [`Value::decode`] reports how many bytes it consumed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{KmpError, KmpResult};

/// Unit code attached to a register value.
///
/// The meter identifies units by a one-byte code. All codes observed on the
/// 382 and Multical families map to a display symbol below; codes outside
/// the table are still representable and render as a bracketed marker with
/// the raw code rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit(pub u8);

impl Unit {
    /// The raw unit code.
    pub fn code(self) -> u8 {
        self.0
    }

    /// Display symbol for the unit, if known.
    ///
    /// Code 0x00 is the explicit dimensionless case and maps to an empty
    /// symbol; unknown codes yield `None`.
    pub fn symbol(self) -> Option<&'static str> {
        let symbol = match self.0 {
            0x00 => "",
            0x01 => "Wh",
            0x02 => "kWh",
            0x03 => "MWh",
            0x04 => "GWh",
            0x05 => "j",
            0x06 => "kj",
            0x07 => "Mj",
            0x08 => "Gj",
            0x09 => "Cal",
            0x0A => "kCal",
            0x0B => "Mcal",
            0x0C => "Gcal",
            0x0D => "varh",
            0x0E => "kvarh",
            0x0F => "Mvarh",
            0x10 => "Gvarh",
            0x11 => "VAh",
            0x12 => "kVAh",
            0x13 => "MVAh",
            0x14 => "GVAh",
            0x15 => "kW",
            0x16 => "kW",
            0x17 => "MW",
            0x18 => "GW",
            0x19 => "kvar",
            0x1A => "kvar",
            0x1B => "Mvar",
            0x1C => "Gvar",
            0x1D => "VA",
            0x1E => "kVA",
            0x1F => "MVA",
            0x20 => "GVA",
            0x21 => "V",
            0x22 => "A",
            0x23 => "kV",
            0x24 => "kA",
            0x25 => "C",
            0x26 => "K",
            0x27 => "l",
            0x28 => "m3",
            0x29 => "l/h",
            0x2A => "m3/h",
            0x2B => "m3xC",
            0x2C => "ton",
            0x2D => "ton/h",
            0x2E => "h",
            0x2F => "hh:mm:ss",
            0x30 => "yy:mm:dd",
            0x31 => "yyyy:mm:dd",
            0x32 => "mm:dd",
            0x33 => " ",
            0x34 => "bar",
            0x35 => "RTC",
            0x36 => "ASCII",
            0x37 => "m3 x 10",
            0x38 => "ton x 10",
            0x39 => "GJ x 10",
            0x3A => "minutes",
            0x3B => "Bitfield",
            0x3C => "s",
            0x3D => "ms",
            0x3E => "days",
            0x3F => "RTC-Q",
            0x40 => "Datetime",
            _ => return None,
        };
        Some(symbol)
    }
}

impl From<u8> for Unit {
    fn from(code: u8) -> Self {
        Unit(code)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol() {
            Some(symbol) => f.write_str(symbol),
            None => write!(f, "[unknown unit: {} (0x{:02X})]", self.0, self.0),
        }
    }
}

/// A decoded register value: magnitude plus unit tag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub value: f64,
    pub unit: Unit,
}

impl Value {
    /// Decode one value from the start of `raw`.
    ///
    /// Returns the number of bytes consumed (`L + 3`) together with the
    /// value, so callers can walk several values packed consecutively in
    /// one reply payload. Fails if fewer than three header bytes, or fewer
    /// than the advertised mantissa bytes, are available.
    pub fn decode(raw: &[u8]) -> KmpResult<(usize, Value)> {
        if raw.len() < 3 {
            return Err(KmpError::value_decode(format!(
                "need at least 3 bytes, have {}",
                raw.len()
            )));
        }

        let unit = Unit(raw[0]);
        let mantissa_len = raw[1] as usize;
        if raw.len() < mantissa_len + 3 {
            return Err(KmpError::value_decode(format!(
                "mantissa of {} bytes but only {} available",
                mantissa_len,
                raw.len() - 3
            )));
        }

        let mut mantissa: u64 = 0;
        for &byte in &raw[3..3 + mantissa_len] {
            mantissa = mantissa.wrapping_shl(8) | u64::from(byte);
        }

        let control = raw[2];
        let mut exponent = i32::from(control & 0x3F);
        if control & 0x40 != 0 {
            exponent = -exponent;
        }
        let mut value = mantissa as f64 * 10f64.powi(exponent);
        if control & 0x80 != 0 {
            value = -value;
        }

        Ok((mantissa_len + 3, Value { value, unit }))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} {}", self.value, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_basic() {
        // unit=kWh, mantissa length 2, exponent 0, mantissa 10.
        let raw = [0x02, 0x02, 0x00, 0x00, 0x0A];
        let (consumed, value) = Value::decode(&raw).unwrap();
        assert_eq!(consumed, 5);
        assert_eq!(value.value, 10.0);
        assert_eq!(value.unit, Unit(0x02));
        assert_eq!(value.unit.symbol(), Some("kWh"));
    }

    #[test]
    fn test_decode_negative_exponent() {
        // Control 0x41: exponent magnitude 1, bit 6 set -> scale by 10^-1.
        let raw = [0x21, 0x02, 0x41, 0x08, 0xFC]; // 2300 * 0.1 = 230.0 V
        let (consumed, value) = Value::decode(&raw).unwrap();
        assert_eq!(consumed, 5);
        assert!((value.value - 230.0).abs() < 1e-9);
        assert_eq!(value.unit.symbol(), Some("V"));
    }

    #[test]
    fn test_decode_negated_value() {
        // Bit 7 negates the result regardless of exponent sign.
        let raw = [0x25, 0x01, 0x80, 0x05];
        let (_, value) = Value::decode(&raw).unwrap();
        assert_eq!(value.value, -5.0);

        let raw = [0x25, 0x01, 0xC1, 0x05]; // negated, exponent -1
        let (_, value) = Value::decode(&raw).unwrap();
        assert!((value.value + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_decode_positive_exponent() {
        let raw = [0x01, 0x01, 0x03, 0x07]; // 7 * 10^3 Wh
        let (consumed, value) = Value::decode(&raw).unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(value.value, 7000.0);
    }

    #[test]
    fn test_decode_too_short() {
        assert!(matches!(
            Value::decode(&[]),
            Err(KmpError::ValueDecodeFailed { .. })
        ));
        assert!(matches!(
            Value::decode(&[0x02, 0x04]),
            Err(KmpError::ValueDecodeFailed { .. })
        ));
        // Header claims 4 mantissa bytes, only 2 present.
        assert!(matches!(
            Value::decode(&[0x02, 0x04, 0x00, 0x01, 0x02]),
            Err(KmpError::ValueDecodeFailed { .. })
        ));
    }

    #[test]
    fn test_display() {
        let value = Value { value: 10.0, unit: Unit(0x02) };
        assert_eq!(format!("{value}"), "10.000 kWh");
    }

    #[test]
    fn test_unknown_unit_rendering() {
        let unit = Unit(0x77);
        assert_eq!(unit.symbol(), None);
        assert_eq!(format!("{unit}"), "[unknown unit: 119 (0x77)]");

        // Decoding with an unknown unit code is never an error.
        let raw = [0x77, 0x01, 0x00, 0x01];
        let (_, value) = Value::decode(&raw).unwrap();
        assert_eq!(value.unit.code(), 0x77);
    }

    #[test]
    fn test_dimensionless_unit() {
        assert_eq!(Unit(0x00).symbol(), Some(""));
    }
}
