//! Configuration types for the automation tool.
//!
//! These structs map to `netconf-automate.yaml`. Every field has a default,
//! so an empty or missing file yields a usable configuration. Secrets are
//! never read from the file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::device::{Credentials, TargetDevice};
use crate::error::ConfigError;
use crate::notify::DEFAULT_WEBEX_API_URL;

/// Environment variable holding the device username.
pub const ENV_USERNAME: &str = "NETCONF_USERNAME";
/// Environment variable holding the device password.
pub const ENV_PASSWORD: &str = "NETCONF_PASSWORD";
/// Environment variable holding the Webex bot token.
pub const ENV_WEBEX_TOKEN: &str = "WEBEX_TOKEN";
/// Environment variable holding the Webex room id.
pub const ENV_WEBEX_ROOM_ID: &str = "WEBEX_ROOM_ID";
/// Environment override for `device.default_address`.
pub const ENV_DEFAULT_HOST: &str = "NETCONF_DEFAULT_HOST";
/// Environment override for `device.port`.
pub const ENV_PORT: &str = "NETCONF_PORT";

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AutomationConfig {
    /// Device connection settings.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Notification settings.
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Secrets loaded from the environment.
    #[serde(skip)]
    pub secrets: Secrets,
}

/// Device connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Address used when the operator enters nothing.
    pub default_address: String,
    /// NETCONF port.
    pub port: u16,
    /// Vendor profile passed to the session layer.
    pub vendor_profile: String,
    /// Check the server host key against `known_hosts`.
    pub hostkey_verify: bool,
    /// Connect and hello timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Per-RPC timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            default_address: String::from("192.168.1.10"),
            port: 830,
            vendor_profile: String::from("iosxe"),
            hostkey_verify: false,
            connect_timeout_secs: 30,
            rpc_timeout_secs: 60,
        }
    }
}

impl DeviceConfig {
    /// Connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// RPC timeout.
    #[must_use]
    pub const fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotifierConfig {
    /// Delivery backend.
    pub backend: NotifierBackend,
    /// Webex API base URL.
    pub api_url: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            backend: NotifierBackend::default(),
            api_url: DEFAULT_WEBEX_API_URL.to_string(),
        }
    }
}

/// Notification backends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifierBackend {
    /// Webex Teams messages API.
    #[default]
    Webex,
    /// Log only.
    Log,
}

/// Credentials and tokens taken from the environment.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secrets {
    /// Device username.
    pub username: Option<String>,
    /// Device password.
    pub password: Option<String>,
    /// Webex bot token.
    pub webex_token: Option<String>,
    /// Webex room id.
    pub webex_room_id: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Secrets")
            .field("username", &self.username)
            .field("password", &mask(&self.password))
            .field("webex_token", &mask(&self.webex_token))
            .field("webex_room_id", &self.webex_room_id)
            .finish()
    }
}

impl AutomationConfig {
    /// Device credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] if the username or password
    /// is not set.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let username = required(self.secrets.username.as_deref(), ENV_USERNAME)?;
        let password = required(self.secrets.password.as_deref(), ENV_PASSWORD)?;
        Ok(Credentials::new(username, password))
    }

    /// Builds the target for `address` using the device settings.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing.
    pub fn target(&self, address: &str) -> Result<TargetDevice, ConfigError> {
        Ok(TargetDevice::new(
            address,
            self.device.port,
            self.device.vendor_profile.as_str(),
            self.credentials()?,
        ))
    }

    /// Webex token and room id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] for the first one missing.
    pub fn webex_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let token = required(self.secrets.webex_token.as_deref(), ENV_WEBEX_TOKEN)?;
        let room = required(self.secrets.webex_room_id.as_deref(), ENV_WEBEX_ROOM_ID)?;
        Ok((token, room))
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, ConfigError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar {
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AutomationConfig::default();
        assert_eq!(config.device.default_address, "192.168.1.10");
        assert_eq!(config.device.port, 830);
        assert_eq!(config.device.vendor_profile, "iosxe");
        assert!(!config.device.hostkey_verify);
        assert_eq!(config.device.rpc_timeout(), Duration::from_secs(60));
        assert_eq!(config.notifier.backend, NotifierBackend::Webex);
        assert_eq!(config.notifier.api_url, DEFAULT_WEBEX_API_URL);
    }

    #[test]
    fn test_target_requires_credentials() {
        let mut config = AutomationConfig::default();
        assert!(matches!(
            config.target("10.0.0.1"),
            Err(ConfigError::MissingEnvVar { ref name }) if name == ENV_USERNAME
        ));

        config.secrets.username = Some("devnet".into());
        config.secrets.password = Some("cisco123".into());
        let target = config.target("10.0.0.1").unwrap();
        assert_eq!(target.address(), "10.0.0.1");
        assert_eq!(target.port(), 830);
        assert_eq!(target.credentials().username, "devnet");
    }

    #[test]
    fn test_secrets_debug_is_redacted() {
        let secrets = Secrets {
            password: Some("cisco123".into()),
            webex_token: Some("tok".into()),
            ..Secrets::default()
        };
        let rendered = format!("{secrets:?}");
        assert!(!rendered.contains("cisco123"));
        assert!(!rendered.contains("tok\""));
    }
}
