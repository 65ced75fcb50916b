//! # Logging Support
//!
//! Callback-based logging for meter communication. The library never prints
//! on its own; attach a [`CallbackLogger`] to route log lines wherever the
//! application wants them, or use [`CallbackLogger::console`] for quick
//! timestamped stderr-style output.
//!
//! ## Usage
//!
//! ```rust
//! use kamstrup_kmp::logging::{CallbackLogger, LogLevel, LoggingMode};
//!
//! // Simple console logger
//! let logger = CallbackLogger::console(LogLevel::Debug, LoggingMode::Both);
//!
//! // Custom callback
//! let custom = CallbackLogger::new(
//!     |level, message| println!("[{level:?}] {message}"),
//!     LogLevel::Info,
//!     LoggingMode::Interpreted,
//! );
//! ```

use std::fmt;
use std::sync::Arc;

use crate::command::Command;
use crate::frame::Frame;

/// Log severity, most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        };
        write!(f, "{s}")
    }
}

/// What gets logged for each exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// Raw hex packets only.
    Raw,
    /// Interpreted frames only (command names, register counts).
    Interpreted,
    /// Both raw packets and interpreted frames.
    Both,
}

/// Log callback signature: severity plus a formatted message.
pub type LogCallback = Arc<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Logger that forwards formatted messages to a user callback.
#[derive(Clone)]
pub struct CallbackLogger {
    callback: Option<LogCallback>,
    min_level: LogLevel,
    mode: LoggingMode,
}

impl CallbackLogger {
    /// Create a logger with a custom callback.
    pub fn new<F>(callback: F, min_level: LogLevel, mode: LoggingMode) -> Self
    where
        F: Fn(LogLevel, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Some(Arc::new(callback)),
            min_level,
            mode,
        }
    }

    /// Create a logger that prints timestamped lines to stdout.
    pub fn console(min_level: LogLevel, mode: LoggingMode) -> Self {
        Self::new(
            |level, message| {
                let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
                println!("[{timestamp}] [{level}] {message}");
            },
            min_level,
            mode,
        )
    }

    /// Create a logger that drops everything.
    pub fn disabled() -> Self {
        Self {
            callback: None,
            min_level: LogLevel::Error,
            mode: LoggingMode::Interpreted,
        }
    }

    fn should_log(&self, level: LogLevel) -> bool {
        self.callback.is_some() && level as u8 <= self.min_level as u8
    }

    /// Log a message at the given level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if self.should_log(level) {
            if let Some(callback) = &self.callback {
                callback(level, message);
            }
        }
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Log a raw packet dump if the mode asks for it.
    pub fn log_packet(&self, direction: &str, data: &[u8]) {
        if !matches!(self.mode, LoggingMode::Raw | LoggingMode::Both) {
            return;
        }
        let hex = hex::encode_upper(data);
        self.debug(&format!("{direction} packet ({} bytes): {hex}", data.len()));
    }

    /// Log an outgoing request frame in interpreted form.
    pub fn log_request(&self, frame: &Frame) {
        if matches!(self.mode, LoggingMode::Raw | LoggingMode::Both) {
            self.log_packet("TX", &frame.encode());
        }
        if !matches!(self.mode, LoggingMode::Interpreted | LoggingMode::Both) {
            return;
        }

        let command = describe_command(frame.command);
        let detail = match Command::from_u8(frame.command) {
            Ok(Command::GetRegister) if !frame.data.is_empty() => {
                format!(", {} register(s)", frame.data[0])
            }
            _ if !frame.data.is_empty() => {
                format!(", data {}", hex::encode_upper(&frame.data))
            }
            _ => String::new(),
        };
        self.info(&format!(
            "request to 0x{:02X}: {command}{detail}",
            frame.address
        ));
    }

    /// Log an incoming reply frame in interpreted form.
    pub fn log_response(&self, frame: &Frame) {
        if !matches!(self.mode, LoggingMode::Interpreted | LoggingMode::Both) {
            return;
        }

        if frame.is_ack() {
            self.info("reply: acknowledged");
            return;
        }

        let command = describe_command(frame.command);
        self.info(&format!(
            "reply from 0x{:02X}: {command}, {} data byte(s)",
            frame.address,
            frame.data.len()
        ));
    }
}

impl fmt::Debug for CallbackLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackLogger")
            .field("enabled", &self.callback.is_some())
            .field("min_level", &self.min_level)
            .field("mode", &self.mode)
            .finish()
    }
}

fn describe_command(code: u8) -> String {
    match Command::from_u8(code) {
        Ok(command) => command.to_string(),
        Err(_) => format!("Unknown (0x{code:02X})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn capture_logger(min_level: LogLevel, mode: LoggingMode) -> (CallbackLogger, Arc<Mutex<Vec<(LogLevel, String)>>>) {
        let lines: Arc<Mutex<Vec<(LogLevel, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let logger = CallbackLogger::new(
            move |level, message| {
                sink.lock().unwrap().push((level, message.to_string()));
            },
            min_level,
            mode,
        );
        (logger, lines)
    }

    #[test]
    fn test_level_filtering() {
        let (logger, lines) = capture_logger(LogLevel::Warn, LoggingMode::Both);
        logger.error("boom");
        logger.warn("careful");
        logger.info("ignored");
        logger.debug("ignored too");

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0, LogLevel::Error);
        assert_eq!(lines[1].0, LogLevel::Warn);
    }

    #[test]
    fn test_disabled_logger_is_silent() {
        let logger = CallbackLogger::disabled();
        logger.error("nobody hears this");
        logger.log_packet("TX", &[0x80, 0x0D]);
    }

    #[test]
    fn test_interpreted_request_logging() {
        let (logger, lines) = capture_logger(LogLevel::Debug, LoggingMode::Interpreted);
        let frame = Frame::request(0x3F, Command::GetRegister, vec![0x01, 0x00, 0x3C]);
        logger.log_request(&frame);

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].1.contains("Get Register"));
        // The logger renders commands exactly as Display does.
        assert!(lines[0].1.contains(&Command::GetRegister.to_string()));
        assert!(lines[0].1.contains("1 register(s)"));
    }

    #[test]
    fn test_raw_mode_skips_interpretation() {
        let (logger, lines) = capture_logger(LogLevel::Debug, LoggingMode::Raw);
        let frame = Frame::request(0x3F, Command::GetType, vec![]);
        logger.log_request(&frame);
        logger.log_response(&Frame::ack());

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].1.contains("TX packet"));
    }
}
