//! # Kamstrup KMP Protocol Library
//!
//! Async Rust implementation of the Kamstrup KMP binary protocol used by
//! Kamstrup electricity and heat meters (Kamstrup 382, Multical 601 and
//! relatives) over an optical/IR serial head.
//!
//! ## Features
//!
//! - Complete KMP framing: byte stuffing, CRC-16/CCITT checksums, ack frames
//! - Meter value decoding to `f64` with physical units
//! - Batched register reads in a single exchange
//! - Serial transport via tokio-serial with per-read timeouts
//! - Pluggable transports for testing and unusual links
//! - Communication statistics and callback-based logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kamstrup_kmp::client::MeterClient;
//! use kamstrup_kmp::registers::kamstrup_382;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = MeterClient::open("/dev/ttyUSB0", 9600)?;
//!
//!     println!("serial number: {}", client.read_serial_number().await?);
//!
//!     let values = client
//!         .read_registers(&[kamstrup_382::ENERGY_IN, kamstrup_382::VOLTAGE_P1])
//!         .await?;
//!     for (register, value) in &values {
//!         println!("0x{register:04X}: {value}");
//!     }
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod command;
pub mod error;
pub mod frame;
pub mod logging;
pub mod registers;
pub mod transport;
pub mod value;

pub use client::{MeterClient, SerialMeterClient};
pub use command::Command;
pub use error::{KmpError, KmpResult};
pub use frame::{checksum, Frame, FrameType, ACK, ESCAPE, FROM_METER, STOP, TO_METER};
pub use logging::{CallbackLogger, LogLevel, LoggingMode};
pub use transport::{KmpTransport, SerialTransport, TransportStats};
pub use value::{Unit, Value};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Factory-default baud rate for the optical head.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Broadcast-style meter address accepted by every meter on the link.
pub const DEFAULT_METER_ADDRESS: u8 = 0x3F;

/// Default per-read timeout in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 200;

/// Upper bound on an escaped reply accepted from the wire.
pub const MAX_FRAME_SIZE: usize = 1024;
