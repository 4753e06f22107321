//! Device session capability.
//!
//! The workflow talks to devices only through these traits so that the
//! NETCONF-over-SSH adapter can be swapped for mocks in tests.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::DeviceError;

use super::change_set::{ConfigChangeSet, FilterDescriptor};

/// Login credentials for a device.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The device a run operates on. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetDevice {
    address: String,
    port: u16,
    vendor_profile: String,
    #[serde(skip)]
    credentials: Credentials,
}

impl TargetDevice {
    /// Creates a target.
    #[must_use]
    pub fn new(
        address: impl Into<String>,
        port: u16,
        vendor_profile: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            address: address.into(),
            port,
            vendor_profile: vendor_profile.into(),
            credentials,
        }
    }

    /// Device address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Management port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Vendor profile passed to the session layer.
    #[must_use]
    pub fn vendor_profile(&self) -> &str {
        &self.vendor_profile
    }

    /// Login credentials.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// `address:port`, bracketing IPv6 literals.
    #[must_use]
    pub fn endpoint(&self) -> String {
        if self.address.contains(':') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

/// Result of an `edit-config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApplyResult {
    /// Whether the device answered `<ok/>`.
    pub ok: bool,
}

/// Opens sessions to devices.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    /// Establishes an authenticated session.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Transport`] if the host is unreachable, refuses
    /// the connection, rejects the credentials or fails the handshake.
    async fn connect(&self, target: &TargetDevice) -> Result<Box<dyn DeviceSession>, DeviceError>;
}

/// An open management session. Must be closed by its owner.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceSession: Send {
    /// Retrieves the configuration subset selected by `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Protocol`] if the device rejects the request.
    async fn get_config(&mut self, filter: &FilterDescriptor) -> Result<String, DeviceError>;

    /// Applies `change_set` to the running datastore.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Protocol`] if the edits are rejected.
    async fn apply_config(&mut self, change_set: &ConfigChangeSet) -> Result<ApplyResult, DeviceError>;

    /// Ends the session and releases the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the close exchange fails; the transport is
    /// released regardless.
    async fn close(&mut self) -> Result<(), DeviceError>;
}
