//! # KMP Transport Layer
//!
//! Owns the byte stream to the meter and runs the request/reply session
//! discipline: write one encoded frame, then accumulate reply bytes until a
//! frame terminator, a bare acknowledgment byte, or a read timeout is seen.
//!
//! The link is half-duplex and the meter offers no length prefix, so the
//! read loop treats a timeout with no further data as the normal
//! end-of-reply signal rather than a failure; whatever has accumulated is
//! handed to the frame decoder, and an empty accumulation surfaces as
//! [`KmpError::EmptyFrame`] from there.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kamstrup_kmp::transport::{KmpTransport, SerialTransport};
//! use kamstrup_kmp::frame::Frame;
//! use kamstrup_kmp::command::Command;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut transport = SerialTransport::new("/dev/ttyUSB0", 9600)?;
//!
//!     let request = Frame::request(0x3F, Command::GetSerialNumber, vec![]);
//!     let reply = transport.exchange(&request).await?;
//!     println!("reply: {reply:?}");
//!
//!     let stats = transport.get_stats();
//!     println!("requests sent: {}", stats.requests_sent);
//!
//!     transport.close().await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{KmpError, KmpResult};
use crate::frame::{Frame, ACK, STOP};
use crate::MAX_FRAME_SIZE;

/// Format raw bytes as a hex string for packet logging.
fn format_hex_packet(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Log a packet with its direction.
fn log_packet(direction: &str, data: &[u8]) {
    info!("[KMP] {} {}", direction, format_hex_packet(data));
}

/// Transport abstraction for one meter session.
///
/// A transport exclusively owns its byte stream; `exchange` takes
/// `&mut self`, so at most one exchange is in flight per transport. Callers
/// needing concurrency must serialize access themselves — there is no
/// internal locking and no pipelining.
#[async_trait]
pub trait KmpTransport: Send + Sync {
    /// Send a frame and wait for the meter's reply.
    ///
    /// The complete cycle: encode, write, read until terminator/ack/timeout,
    /// decode. Transport failures and frame-decode failures both surface
    /// unchanged as the exchange's result; no retry is attempted.
    async fn exchange(&mut self, frame: &Frame) -> KmpResult<Frame>;

    /// Whether the transport believes its byte stream is open.
    ///
    /// A local check only; it does not probe the meter.
    fn is_connected(&self) -> bool;

    /// Close the byte stream and release the port.
    async fn close(&mut self) -> KmpResult<()>;

    /// Communication statistics for this transport.
    fn get_stats(&self) -> TransportStats;
}

/// Transport layer statistics.
#[derive(Debug, Clone, Default)]
pub struct TransportStats {
    pub requests_sent: u64,
    pub replies_received: u64,
    pub errors: u64,
    pub timeouts: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Write one encoded frame to `writer` and flush it out of the buffers.
///
/// A failed or stalled write fails the exchange immediately; the flush is
/// held to the same rule, since an unflushed request leaves the reply timer
/// waiting on a question the meter never received.
async fn send_frame<W>(writer: &mut W, raw: &[u8], send_timeout: Duration) -> KmpResult<()>
where
    W: AsyncWrite + Unpin,
{
    match timeout(send_timeout, writer.write_all(raw)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(KmpError::io(format!("failed to send frame: {e}"))),
        Err(_) => {
            return Err(KmpError::timeout(
                "send frame",
                send_timeout.as_millis() as u64,
            ))
        }
    }

    match timeout(send_timeout, writer.flush()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(KmpError::io(format!("failed to flush frame: {e}"))),
        Err(_) => Err(KmpError::timeout(
            "flush frame",
            send_timeout.as_millis() as u64,
        )),
    }
}

/// Read one raw reply from `reader`.
///
/// Accumulates bytes until the stop byte or the acknowledgment byte is seen
/// (kept, inclusive), or until a read times out / hits end-of-stream, which
/// completes the reply with whatever has accumulated so far — possibly
/// nothing. Only a genuine read error fails.
async fn read_reply<R>(reader: &mut R, read_timeout: Duration) -> KmpResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut reply = Vec::new();
    let mut buf = [0u8; 128];

    'readloop: loop {
        match timeout(read_timeout, reader.read(&mut buf)).await {
            Ok(Ok(0)) => break, // end of stream, reply is over
            Ok(Ok(n)) => {
                for &byte in &buf[..n] {
                    reply.push(byte);
                    if byte == STOP || byte == ACK {
                        break 'readloop;
                    }
                }
                if reply.len() > MAX_FRAME_SIZE {
                    return Err(KmpError::io("reply exceeds maximum frame size"));
                }
            }
            Ok(Err(e)) => {
                return Err(KmpError::io(format!("serial read error: {e}")));
            }
            Err(_) => break, // no more data within the timeout, reply is over
        }
    }

    Ok(reply)
}

/// Serial-port transport for the KMP protocol.
///
/// Speaks to the meter through an optical/IR head on a serial device.
/// Defaults match the meters' factory configuration: 9600 baud, 8 data
/// bits, one stop bit, no parity, 200 ms read timeout.
pub struct SerialTransport {
    /// Serial port connection.
    port: Option<tokio_serial::SerialStream>,
    /// Port name/path.
    port_name: String,
    /// Baud rate.
    baud_rate: u32,
    /// Data bits.
    data_bits: tokio_serial::DataBits,
    /// Stop bits.
    stop_bits: tokio_serial::StopBits,
    /// Parity.
    parity: tokio_serial::Parity,
    /// Read timeout: how long to wait for (more of) a reply.
    read_timeout: Duration,
    /// Transport statistics.
    stats: TransportStats,
    /// Enable packet logging for debugging.
    packet_logging: bool,
}

impl SerialTransport {
    /// Open a serial transport with default settings (8N1, 200 ms timeout).
    pub fn new(port: &str, baud_rate: u32) -> KmpResult<Self> {
        Self::new_with_config(
            port,
            baud_rate,
            tokio_serial::DataBits::Eight,
            tokio_serial::StopBits::One,
            tokio_serial::Parity::None,
            Duration::from_millis(crate::DEFAULT_READ_TIMEOUT_MS),
        )
    }

    /// Open a serial transport with full configuration.
    pub fn new_with_config(
        port: &str,
        baud_rate: u32,
        data_bits: tokio_serial::DataBits,
        stop_bits: tokio_serial::StopBits,
        parity: tokio_serial::Parity,
        read_timeout: Duration,
    ) -> KmpResult<Self> {
        let mut transport = Self {
            port: None,
            port_name: port.to_string(),
            baud_rate,
            data_bits,
            stop_bits,
            parity,
            read_timeout,
            stats: TransportStats::default(),
            packet_logging: false,
        };

        transport.connect()?;

        Ok(transport)
    }

    /// Enable or disable packet logging.
    pub fn set_packet_logging(&mut self, enabled: bool) {
        self.packet_logging = enabled;
    }

    /// The configured read timeout.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Open the serial port.
    fn connect(&mut self) -> KmpResult<()> {
        let builder = tokio_serial::new(&self.port_name, self.baud_rate)
            .data_bits(self.data_bits)
            .stop_bits(self.stop_bits)
            .parity(self.parity)
            .timeout(self.read_timeout);

        let port = tokio_serial::SerialStream::open(&builder).map_err(|e| {
            KmpError::connection(format!(
                "failed to open serial port {}: {e}",
                self.port_name
            ))
        })?;

        self.port = Some(port);

        Ok(())
    }
}

#[async_trait]
impl KmpTransport for SerialTransport {
    async fn exchange(&mut self, frame: &Frame) -> KmpResult<Frame> {
        if self.port.is_none() {
            self.connect()?;
        }

        let raw = frame.encode();
        self.stats.requests_sent += 1;
        self.stats.bytes_sent += raw.len() as u64;

        if self.packet_logging {
            log_packet("send", &raw);
        }

        let port = self
            .port
            .as_mut()
            .ok_or_else(|| KmpError::connection("serial port not open"))?;

        if let Err(e) = send_frame(port, &raw, self.read_timeout).await {
            if matches!(e, KmpError::Timeout { .. }) {
                self.stats.timeouts += 1;
            }
            self.stats.errors += 1;
            return Err(e);
        }

        let reply_raw = match read_reply(port, self.read_timeout).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.stats.errors += 1;
                return Err(e);
            }
        };

        self.stats.bytes_received += reply_raw.len() as u64;

        if self.packet_logging {
            log_packet("receive", &reply_raw);
        }

        let reply = Frame::decode(&reply_raw).map_err(|e| {
            self.stats.errors += 1;
            if matches!(e, KmpError::EmptyFrame) {
                self.stats.timeouts += 1;
                debug!("no reply from meter within {:?}", self.read_timeout);
            }
            e
        })?;

        self.stats.replies_received += 1;
        Ok(reply)
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    async fn close(&mut self) -> KmpResult<()> {
        if let Some(_port) = self.port.take() {
            // SerialStream closes the descriptor on drop.
        }
        Ok(())
    }

    fn get_stats(&self) -> TransportStats {
        self.stats.clone()
    }
}
