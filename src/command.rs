//! Known KMP command codes.
//!
//! Each command identifies one operation the meter understands; the code is
//! carried verbatim in the frame's command-id byte. Not every command has a
//! high-level wrapper in [`MeterClient`](crate::client::MeterClient) — the
//! log-readout and clock commands are provided for callers building raw
//! frames themselves.

use crate::error::{KmpError, KmpResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// KMP command codes understood by Kamstrup meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Command {
    /// Identification of the meter type and software revision (0x01).
    GetType = 0x01,
    /// Meter serial number (0x02).
    GetSerialNumber = 0x02,
    /// Set the meter clock (0x09).
    SetClock = 0x09,
    /// Read a variable set of registers (0x10).
    GetRegister = 0x10,
    /// Change the value of a given register (0x11).
    PutRegister = 0x11,
    /// The four event status bytes (0x9B).
    GetEventStatus = 0x9B,
    /// Clear the event status bytes (0x9C).
    ClearEventStatus = 0x9C,
    /// Log readout from a timestamp towards now (0xA0).
    GetLogTimePresent = 0xA0,
    /// Log readout from the last record id towards now (0xA1).
    GetLogLastPresent = 0xA1,
    /// Log readout from a record id towards now (0xA2).
    GetLogIdPresent = 0xA2,
    /// Log readout from a timestamp towards the past (0xA3).
    GetLogTimePast = 0xA3,
}

impl Command {
    /// Convert from a raw command-id byte.
    pub fn from_u8(value: u8) -> KmpResult<Self> {
        match value {
            0x01 => Ok(Command::GetType),
            0x02 => Ok(Command::GetSerialNumber),
            0x09 => Ok(Command::SetClock),
            0x10 => Ok(Command::GetRegister),
            0x11 => Ok(Command::PutRegister),
            0x9B => Ok(Command::GetEventStatus),
            0x9C => Ok(Command::ClearEventStatus),
            0xA0 => Ok(Command::GetLogTimePresent),
            0xA1 => Ok(Command::GetLogLastPresent),
            0xA2 => Ok(Command::GetLogIdPresent),
            0xA3 => Ok(Command::GetLogTimePast),
            _ => Err(KmpError::configuration(format!(
                "unknown command code: 0x{value:02X}"
            ))),
        }
    }

    /// Convert to the raw command-id byte.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Human-readable command name, also used by the packet logger.
    pub fn name(self) -> &'static str {
        match self {
            Command::GetType => "Get Type",
            Command::GetSerialNumber => "Get Serial Number",
            Command::SetClock => "Set Clock",
            Command::GetRegister => "Get Register",
            Command::PutRegister => "Put Register",
            Command::GetEventStatus => "Get Event Status",
            Command::ClearEventStatus => "Clear Event Status",
            Command::GetLogTimePresent => "Get Log (timestamp to present)",
            Command::GetLogLastPresent => "Get Log (last record to present)",
            Command::GetLogIdPresent => "Get Log (record id to present)",
            Command::GetLogTimePast => "Get Log (timestamp to past)",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), *self as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_conversion() {
        assert_eq!(Command::from_u8(0x10).unwrap(), Command::GetRegister);
        assert_eq!(Command::GetRegister.to_u8(), 0x10);
        assert_eq!(Command::from_u8(0x9B).unwrap(), Command::GetEventStatus);
        assert!(Command::from_u8(0xFF).is_err());
    }

    #[test]
    fn test_command_display() {
        let text = format!("{}", Command::GetSerialNumber);
        assert_eq!(text, "Get Serial Number (0x02)");
    }
}
