//! # KMP Error Handling
//!
//! Error types for the Kamstrup KMP protocol stack, covering transport
//! failures (serial I/O, timeouts), frame-level failures (framing, escaping,
//! checksum) and payload-level failures (value decoding, register counts).
//!
//! All fallible operations in this crate return [`KmpResult`]. Frame and
//! value errors classify every malformed input into a specific variant so
//! that callers can distinguish a garbled reply from a silent meter.
//!
//! ## Error recovery
//!
//! The library performs no internal retries; transient failures such as a
//! checksum mismatch or a read timeout are surfaced to the caller, who
//! decides whether to resend. [`KmpError::is_recoverable`] identifies the
//! conditions where a resend can plausibly succeed:
//!
//! ```rust
//! use kamstrup_kmp::{KmpError, KmpResult};
//!
//! fn handle(result: KmpResult<u32>) {
//!     match result {
//!         Ok(serial) => println!("serial number: {serial}"),
//!         Err(error) if error.is_recoverable() => {
//!             println!("transient failure, retry later: {error}");
//!         }
//!         Err(error) => println!("fatal: {error}"),
//!     }
//! }
//! ```

use thiserror::Error;

/// Result type alias for KMP operations.
pub type KmpResult<T> = Result<T, KmpError>;

/// Errors produced by the KMP protocol stack.
///
/// The frame-decode variants (`EmptyFrame`, `FrameTooShort`,
/// `InvalidFrameType`, `ChecksumInvalid`) together classify every malformed
/// byte sequence handed to [`Frame::decode`](crate::frame::Frame::decode);
/// the transport variants wrap the underlying I/O failure unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KmpError {
    /// The receive buffer held no bytes at all when the exchange completed.
    ///
    /// Typically means the meter never answered within the read timeout.
    #[error("frame is empty")]
    EmptyFrame,

    /// The frame ended before all mandatory fields were present.
    ///
    /// Covers truncated replies, a missing stop byte, a dangling escape
    /// introducer, and replies whose payload is shorter than an operation
    /// requires (serial number, event status).
    #[error("frame too short")]
    FrameTooShort,

    /// The leading direction byte was not one of the recognized values.
    #[error("invalid frame type: 0x{found:02X}")]
    InvalidFrameType { found: u8 },

    /// The embedded checksum did not match the one recomputed locally.
    #[error("checksum invalid: expected 0x{expected:04X}, actual 0x{actual:04X}")]
    ChecksumInvalid { expected: u16, actual: u16 },

    /// A register value could not be decoded from the reply payload.
    ///
    /// Inside a batched register read this is absorbed (the register is
    /// simply absent from the result); it only surfaces from direct calls
    /// to [`Value::decode`](crate::value::Value::decode).
    #[error("could not decode value: {message}")]
    ValueDecodeFailed { message: String },

    /// A single-register read returned a different number of registers.
    #[error("wrong number of registers in reply: expected {expected}, found {found}")]
    WrongRegisterCount { expected: usize, found: usize },

    /// Serial or other I/O failure reported by the transport.
    #[error("I/O error: {message}")]
    Io { message: String },

    /// The serial port could not be opened or was lost.
    #[error("connection error: {message}")]
    Connection { message: String },

    /// An operation exceeded its configured time budget.
    ///
    /// Note that a *read* timeout during frame reception is not an error:
    /// it is how end-of-reply is detected on the half-duplex link. This
    /// variant covers send failures and timeouts outside reception.
    #[error("timeout after {timeout_ms}ms: {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Invalid client or transport configuration.
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl KmpError {
    /// Create an invalid-frame-type error.
    pub fn invalid_frame_type(found: u8) -> Self {
        Self::InvalidFrameType { found }
    }

    /// Create a checksum-invalid error.
    pub fn checksum_invalid(expected: u16, actual: u16) -> Self {
        Self::ChecksumInvalid { expected, actual }
    }

    /// Create a value-decode error.
    pub fn value_decode<S: Into<String>>(message: S) -> Self {
        Self::ValueDecodeFailed { message: message.into() }
    }

    /// Create an I/O error.
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    /// Create a connection error.
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection { message: message.into() }
    }

    /// Create a timeout error.
    pub fn timeout<S: Into<String>>(operation: S, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create a configuration error.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Whether retrying the failed operation could plausibly succeed.
    ///
    /// Transport hiccups and garbled frames are transient on an optical/IR
    /// link; configuration and usage errors are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::Connection { .. }
                | Self::Timeout { .. }
                | Self::EmptyFrame
                | Self::FrameTooShort
                | Self::ChecksumInvalid { .. }
        )
    }

    /// Whether the error originated in the transport rather than the protocol.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::Connection { .. } | Self::Timeout { .. }
        )
    }

    /// Whether the error is a KMP frame/payload violation.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyFrame
                | Self::FrameTooShort
                | Self::InvalidFrameType { .. }
                | Self::ChecksumInvalid { .. }
                | Self::ValueDecodeFailed { .. }
                | Self::WrongRegisterCount { .. }
        )
    }
}

impl From<std::io::Error> for KmpError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for KmpError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::timeout("operation timeout", 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let err = KmpError::timeout("read reply", 200);
        assert!(err.is_recoverable());
        assert!(err.is_transport_error());
        assert!(!err.is_protocol_error());

        let err = KmpError::checksum_invalid(0x1234, 0x5678);
        assert!(err.is_recoverable());
        assert!(err.is_protocol_error());

        let err = KmpError::WrongRegisterCount { expected: 1, found: 0 };
        assert!(!err.is_recoverable());
        assert!(err.is_protocol_error());
    }

    #[test]
    fn test_display() {
        let err = KmpError::checksum_invalid(0x1234, 0x5678);
        let msg = format!("{err}");
        assert!(msg.contains("checksum invalid"));
        assert!(msg.contains("1234"));
        assert!(msg.contains("5678"));

        let err = KmpError::invalid_frame_type(0x55);
        assert_eq!(format!("{err}"), "invalid frame type: 0x55");
    }
}
