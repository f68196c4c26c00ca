//! Transport Error Types
//!
//! Errors raised by listeners and the dispatcher's outbound path. None of them cross a
//! receive loop: control calls convert them into [`TransportStatus`](crate::TransportStatus)
//! values and the loops log them and keep going.

use nav_codec::ProtocolError;
use std::net::SocketAddr;
use thiserror::Error;

/// Main transport error type
#[derive(Error, Debug)]
pub enum TransportError {
    /// Local endpoint could not be bound or opened
    #[error("Bind error: {message} (local: {local_addr:?})")]
    Bind {
        message: String,
        local_addr: Option<SocketAddr>,
        source: Option<std::io::Error>,
    },

    /// Remote endpoint missing, unresolvable or unreachable
    #[error("Connection error: {message} (remote: {remote_addr:?})")]
    Connection {
        message: String,
        remote_addr: Option<SocketAddr>,
        source: Option<std::io::Error>,
    },

    /// Outbound write failed
    #[error("Send error: {message}")]
    Send {
        message: String,
        source: Option<std::io::Error>,
    },

    /// Inbound read failed
    #[error("Receive error: {message}")]
    Receive {
        message: String,
        source: Option<std::io::Error>,
    },

    /// Serial port could not be opened or configured
    #[error("Serial port error: {path}: {message}")]
    Serial { path: String, message: String },

    /// Encoding an outbound message failed
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// Operation attempted in a state that does not allow it
    #[error("Invalid state: {operation} requires {required}")]
    InvalidState {
        operation: &'static str,
        required: &'static str,
    },

    /// Direction switched off by `set_receiving`/`set_transmitting`
    #[error("{direction} is disabled")]
    Disabled { direction: &'static str },

    /// Listener already closed
    #[error("Listener closed")]
    Closed,

    /// Generic I/O errors
    #[error("I/O error: {message}")]
    Io {
        message: String,
        source: std::io::Error,
    },
}

/// Result type alias for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

impl TransportError {
    /// Create a bind error with its I/O cause
    pub fn bind(
        message: impl Into<String>,
        local_addr: Option<SocketAddr>,
        source: std::io::Error,
    ) -> Self {
        Self::Bind {
            message: message.into(),
            local_addr,
            source: Some(source),
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>, remote_addr: Option<SocketAddr>) -> Self {
        Self::Connection {
            message: message.into(),
            remote_addr,
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        remote_addr: Option<SocketAddr>,
        source: std::io::Error,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            remote_addr,
            source: Some(source),
        }
    }

    pub fn send_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Send {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn receive_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Receive {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn serial(path: impl Into<String>, source: serialport::Error) -> Self {
        Self::Serial {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::Configuration {
            message: message.into(),
            field: field.map(|s| s.to_string()),
        }
    }

    pub fn invalid_state(operation: &'static str, required: &'static str) -> Self {
        Self::InvalidState {
            operation,
            required,
        }
    }

    /// Short label for structured log fields
    pub fn category(&self) -> &'static str {
        match self {
            TransportError::Bind { .. } => "bind",
            TransportError::Connection { .. } => "connection",
            TransportError::Send { .. } => "send",
            TransportError::Receive { .. } => "receive",
            TransportError::Serial { .. } => "serial",
            TransportError::Protocol(_) => "protocol",
            TransportError::Configuration { .. } => "configuration",
            TransportError::InvalidState { .. } => "invalid_state",
            TransportError::Disabled { .. } => "disabled",
            TransportError::Closed => "closed",
            TransportError::Io { .. } => "io",
        }
    }
}

/// Convert standard I/O errors to transport errors
impl From<std::io::Error> for TransportError {
    fn from(error: std::io::Error) -> Self {
        TransportError::Io {
            message: error.to_string(),
            source: error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_connection_error() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)), 10110);
        let err = TransportError::connection("No route", Some(addr));

        match err {
            TransportError::Connection { remote_addr, .. } => {
                assert_eq!(remote_addr, Some(addr));
            }
            _ => panic!("Expected Connection error"),
        }
    }

    #[test]
    fn test_error_categorization() {
        let io_err = std::io::Error::from(std::io::ErrorKind::BrokenPipe);
        assert_eq!(TransportError::send_with_source("test", io_err).category(), "send");
        assert_eq!(TransportError::Closed.category(), "closed");
        assert_eq!(
            TransportError::from(ProtocolError::MissingChecksum).category(),
            "protocol"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "test");
        let transport_err = TransportError::from(io_err);

        match transport_err {
            TransportError::Io { message, .. } => {
                assert!(message.contains("test"));
            }
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_messages() {
        let err = TransportError::invalid_state("send", "a remote socket");
        assert_eq!(err.to_string(), "Invalid state: send requires a remote socket");
    }
}
