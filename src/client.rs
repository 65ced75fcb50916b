//! # KMP Meter Client
//!
//! High-level register operations over any [`KmpTransport`]. The client owns
//! the request/reply pairing, the register batching format, and the policies
//! for incomplete replies; framing and the serial session live below it in
//! the transport.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kamstrup_kmp::client::MeterClient;
//! use kamstrup_kmp::registers::kamstrup_382;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = MeterClient::open("/dev/ttyUSB0", 9600)?;
//!
//!     let serial = client.read_serial_number().await?;
//!     println!("meter serial: {serial}");
//!
//!     let values = client
//!         .read_registers(&[kamstrup_382::ENERGY_IN, kamstrup_382::VOLTAGE_P1])
//!         .await?;
//!     for (register, value) in &values {
//!         println!("0x{register:04X} = {value}");
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;

use tracing::debug;

use crate::command::Command;
use crate::error::{KmpError, KmpResult};
use crate::frame::Frame;
use crate::logging::CallbackLogger;
use crate::transport::{KmpTransport, SerialTransport, TransportStats};
use crate::value::Value;
use crate::DEFAULT_METER_ADDRESS;

/// Client over the default serial transport.
pub type SerialMeterClient = MeterClient<SerialTransport>;

/// Client for reading a Kamstrup meter over any transport.
pub struct MeterClient<T: KmpTransport> {
    transport: T,
    address: u8,
    logger: Option<CallbackLogger>,
}

impl MeterClient<SerialTransport> {
    /// Open a client on a serial port with default settings.
    pub fn open(port: &str, baud_rate: u32) -> KmpResult<Self> {
        Ok(Self::new(SerialTransport::new(port, baud_rate)?))
    }
}

impl<T: KmpTransport> MeterClient<T> {
    /// Create a client over an existing transport, addressing the default
    /// meter address 0x3F.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            address: DEFAULT_METER_ADDRESS,
            logger: None,
        }
    }

    /// Create a client for a specific meter address.
    pub fn with_address(transport: T, address: u8) -> Self {
        Self {
            transport,
            address,
            logger: None,
        }
    }

    /// Attach a logger for request/reply tracing.
    pub fn with_logger(mut self, logger: CallbackLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The meter address this client talks to.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Change the meter address for subsequent requests.
    pub fn set_address(&mut self, address: u8) {
        self.address = address;
    }

    /// Access the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Whether the underlying transport is connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Close the underlying transport.
    pub async fn close(&mut self) -> KmpResult<()> {
        self.transport.close().await
    }

    /// Transport statistics.
    pub fn get_stats(&self) -> TransportStats {
        self.transport.get_stats()
    }

    /// Run one request/reply exchange for the given command.
    async fn exchange(&mut self, command: Command, data: Vec<u8>) -> KmpResult<Frame> {
        let request = Frame::request(self.address, command, data);
        if let Some(logger) = &self.logger {
            logger.log_request(&request);
        }
        let result = self.transport.exchange(&request).await;
        if let Some(logger) = &self.logger {
            match &result {
                Ok(reply) => logger.log_response(reply),
                Err(e) => logger.error(&format!("{command} failed: {e}")),
            }
        }
        result
    }

    /// Read a batch of registers in one exchange.
    ///
    /// The reply carries back-to-back (register address, value) pairs. The
    /// meter omits registers it does not support, so the returned map may be
    /// smaller than the request; a truncated or undecodable tail ends the
    /// walk and yields the registers read up to that point rather than an
    /// error. Callers that need all-or-nothing semantics should check the
    /// map against their request.
    pub async fn read_registers(&mut self, registers: &[u16]) -> KmpResult<HashMap<u16, Value>> {
        if registers.len() > u8::MAX as usize {
            return Err(KmpError::configuration(format!(
                "too many registers in one request: {} (max {})",
                registers.len(),
                u8::MAX
            )));
        }

        let mut data = Vec::with_capacity(1 + registers.len() * 2);
        data.push(registers.len() as u8);
        for register in registers {
            data.extend_from_slice(&register.to_be_bytes());
        }

        let reply = self.exchange(Command::GetRegister, data).await?;
        let payload = &reply.data;

        let mut values = HashMap::new();
        let mut pos = 0;
        for _ in 0..registers.len() {
            if pos + 2 > payload.len() {
                break;
            }
            let register = u16::from_be_bytes([payload[pos], payload[pos + 1]]);
            pos += 2;
            match Value::decode(&payload[pos..]) {
                Ok((consumed, value)) => {
                    values.insert(register, value);
                    pos += consumed;
                }
                Err(e) => {
                    debug!("register 0x{register:04X}: undecodable value, stopping: {e}");
                    break;
                }
            }
        }

        Ok(values)
    }

    /// Read a single register, requiring exactly one value in the reply.
    pub async fn read_register(&mut self, register: u16) -> KmpResult<Value> {
        let mut values = self.read_registers(&[register]).await?;
        let found = values.len();
        match values.remove(&register) {
            Some(value) if found == 1 => Ok(value),
            _ => Err(KmpError::WrongRegisterCount { expected: 1, found }),
        }
    }

    /// Read the meter's serial number.
    pub async fn read_serial_number(&mut self) -> KmpResult<u32> {
        let reply = self.exchange(Command::GetSerialNumber, vec![]).await?;
        if reply.data.len() < 4 {
            return Err(KmpError::FrameTooShort);
        }
        Ok(u32::from_be_bytes([
            reply.data[0],
            reply.data[1],
            reply.data[2],
            reply.data[3],
        ]))
    }

    /// Read the meter's type bytes.
    ///
    /// The layout is model-specific, so the payload is returned raw.
    pub async fn read_type(&mut self) -> KmpResult<Vec<u8>> {
        let reply = self.exchange(Command::GetType, vec![]).await?;
        Ok(reply.data)
    }

    /// Read the meter's four event/info status bytes.
    pub async fn read_event_status(&mut self) -> KmpResult<[u8; 4]> {
        let reply = self.exchange(Command::GetEventStatus, vec![]).await?;
        if reply.data.len() != 4 {
            return Err(KmpError::FrameTooShort);
        }
        Ok([reply.data[0], reply.data[1], reply.data[2], reply.data[3]])
    }

    /// Clear the meter's event/info status.
    ///
    /// The meter acknowledges with a bare ack byte; anything else is a
    /// protocol violation.
    pub async fn clear_event_status(&mut self) -> KmpResult<()> {
        let reply = self.exchange(Command::ClearEventStatus, vec![]).await?;
        if reply.is_ack() {
            Ok(())
        } else {
            Err(KmpError::invalid_frame_type(reply.frame_type.to_u8()))
        }
    }
}
