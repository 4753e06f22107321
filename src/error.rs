//! Error types for the NETCONF automation workflow.
//!
//! This module provides the error hierarchy for every stage of a run:
//! configuration, target resolution, the device session and notification.
//! Device errors are split into transport and protocol failures so the
//! outcome classifier can map them without inspecting messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the automation tool.
#[derive(Debug, Error)]
pub enum AutomationError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Target address resolution errors.
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Device session errors.
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Notification delivery errors.
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },
}

/// Errors raised while resolving the target device address.
#[derive(Debug, Error)]
pub enum InputError {
    /// The supplied text is not an IPv4 or IPv6 literal.
    #[error("Invalid IP address format: '{input}'")]
    InvalidFormat {
        /// The rejected input.
        input: String,
    },

    /// The input source reached end of input before a usable answer.
    #[error("Input closed before a target address was provided")]
    Closed,

    /// Reading from the input source failed.
    #[error("Failed to read target address: {message}")]
    ReadFailed {
        /// Description of the read failure.
        message: String,
    },
}

/// Failures surfaced by a device session.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The session could not be established or was lost.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// The session is up but an RPC failed.
    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    /// The device returned something no protocol rule accounts for.
    #[error("Unexpected device data: {message}")]
    Unexpected {
        /// Description of the unexpected condition.
        message: String,
    },
}

/// Transport-layer failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The host could not be reached.
    #[error("Host {address} is unreachable: {message}")]
    Unreachable {
        /// Target address.
        address: String,
        /// Underlying error.
        message: String,
    },

    /// The remote end refused the TCP connection.
    #[error("Connection refused by {address}:{port}")]
    ConnectionRefused {
        /// Target address.
        address: String,
        /// Target port.
        port: u16,
    },

    /// The device rejected the credentials.
    #[error("Authentication failed for user '{username}'")]
    AuthenticationFailed {
        /// Username that was rejected.
        username: String,
    },

    /// SSH or NETCONF hello exchange failed.
    #[error("Handshake failed: {message}")]
    HandshakeFailed {
        /// Description of the handshake failure.
        message: String,
    },

    /// Connecting took longer than allowed.
    #[error("Timed out after {secs}s while {operation}")]
    Timeout {
        /// Operation that timed out.
        operation: String,
        /// Timeout in seconds.
        secs: u64,
    },

    /// An established session dropped.
    #[error("Connection lost: {message}")]
    ConnectionLost {
        /// Description of the failure.
        message: String,
    },
}

/// Protocol-layer (RPC) failures.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The device answered with an `<rpc-error>`.
    #[error("RPC error ({tag}): {message}")]
    RpcError {
        /// NETCONF `error-tag`.
        tag: String,
        /// NETCONF `error-message`, or the tag when absent.
        message: String,
    },

    /// The reply could not be parsed.
    #[error("Malformed reply: {message}")]
    MalformedReply {
        /// Description of the parse failure.
        message: String,
    },

    /// Message framing was violated.
    #[error("Framing error: {message}")]
    Framing {
        /// Description of the framing violation.
        message: String,
    },

    /// An RPC did not complete in time.
    #[error("Timed out after {secs}s waiting for {operation} reply")]
    Timeout {
        /// RPC that timed out.
        operation: String,
        /// Timeout in seconds.
        secs: u64,
    },

    /// The peer closed the session mid-exchange.
    #[error("Session closed by peer")]
    SessionClosed,
}

/// Notification delivery errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The messaging API rejected the request.
    #[error("Messaging API rejected request: {status} - {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The request could not be sent.
    #[error("Network error sending notification: {message}")]
    Network {
        /// Description of the network error.
        message: String,
    },
}

/// Result type alias for automation operations.
pub type Result<T> = std::result::Result<T, AutomationError>;

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl DeviceError {
    /// Creates an unexpected-data error.
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }
}

impl TransportError {
    /// Creates a handshake error.
    #[must_use]
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::HandshakeFailed {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(operation: impl Into<String>, secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            secs,
        }
    }

    /// Maps a socket-level connect failure onto the transport taxonomy.
    /// `timeout_secs` is the connect limit reported if the socket timed out.
    #[must_use]
    pub fn from_connect_io(address: &str, port: u16, timeout_secs: u64, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::ConnectionRefused => Self::ConnectionRefused {
                address: address.to_string(),
                port,
            },
            std::io::ErrorKind::TimedOut => Self::timeout(format!("connecting to {address}:{port}"), timeout_secs),
            _ => Self::Unreachable {
                address: address.to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl ProtocolError {
    /// Creates a malformed-reply error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedReply {
            message: message.into(),
        }
    }

    /// Creates a framing error.
    #[must_use]
    pub fn framing(message: impl Into<String>) -> Self {
        Self::Framing {
            message: message.into(),
        }
    }
}

impl NotifyError {
    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refused_connect_maps_to_connection_refused() {
        let err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let mapped = TransportError::from_connect_io("10.0.0.5", 830, 30, &err);
        assert!(matches!(mapped, TransportError::ConnectionRefused { port: 830, .. }));
        assert_eq!(mapped.to_string(), "Connection refused by 10.0.0.5:830");
    }

    #[test]
    fn test_other_connect_io_maps_to_unreachable() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "no route to host");
        let mapped = TransportError::from_connect_io("10.0.0.5", 830, 30, &err);
        assert!(matches!(mapped, TransportError::Unreachable { .. }));
    }

    #[test]
    fn test_socket_timeout_reports_connect_limit() {
        let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let mapped = TransportError::from_connect_io("10.0.0.5", 830, 30, &err);
        assert!(matches!(mapped, TransportError::Timeout { secs: 30, .. }));
        assert_eq!(mapped.to_string(), "Timed out after 30s while connecting to 10.0.0.5:830");
    }

    #[test]
    fn test_device_error_display_is_transparent() {
        let err = DeviceError::from(ProtocolError::RpcError {
            tag: String::from("invalid-value"),
            message: String::from("bad hostname"),
        });
        assert_eq!(err.to_string(), "RPC error (invalid-value): bad hostname");
    }
}
