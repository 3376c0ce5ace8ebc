//! Error types for the driver.

use dwm_shell_protocol::ParseError;
use thiserror::Error;

use crate::session::ShellMode;

/// Errors that can occur while driving a module.
#[derive(Debug, Error)]
pub enum DriverError {
    /// I/O failure on the transport. Never retried by the driver.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Module output could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// An operation was attempted in a shell mode that does not allow it.
    #[error("cannot {operation} while shell is in {mode} mode")]
    InvalidMode {
        /// The rejected operation.
        operation: &'static str,
        /// The mode the session was in.
        mode: ShellMode,
    },

    /// Failed to open a serial port.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;
