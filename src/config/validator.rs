//! Configuration validation.
//!
//! Errors block a run; warnings are reported by `validate --warnings`.

use reqwest::Url;
use tracing::debug;

use crate::error::{AutomationError, ConfigError, Result};
use crate::input::is_ip_literal;

use super::types::{
    AutomationConfig, DeviceConfig, ENV_PASSWORD, ENV_USERNAME, ENV_WEBEX_ROOM_ID,
    ENV_WEBEX_TOKEN, NotifierBackend, NotifierConfig, Secrets,
};

/// Vendor profile the standard change set is written for.
const SUPPORTED_PROFILE: &str = "iosxe";

/// Validator for automation configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing everything found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Whether no errors were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.into(),
        });
    }
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates `config`, failing on the first error.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found.
    pub fn validate(&self, config: &AutomationConfig) -> Result<ValidationResult> {
        let result = self.check(config);

        if let Some(first_error) = result.errors.first() {
            return Err(AutomationError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }));
        }

        debug!("Configuration validation passed");
        Ok(result)
    }

    /// Collects every error and warning for `config`.
    #[must_use]
    pub fn check(&self, config: &AutomationConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_device(&config.device, &mut result);
        Self::validate_notifier(&config.notifier, &config.secrets, &mut result);
        Self::validate_credentials(&config.secrets, &mut result);

        result
    }

    fn validate_device(device: &DeviceConfig, result: &mut ValidationResult) {
        if device.port == 0 {
            result.error("device.port", "Port must be between 1 and 65535");
        }

        if device.connect_timeout_secs == 0 {
            result.error("device.connect_timeout_secs", "Connect timeout must be positive");
        }

        if device.rpc_timeout_secs == 0 {
            result.error("device.rpc_timeout_secs", "RPC timeout must be positive");
        }

        if device.vendor_profile.trim().is_empty() {
            result.error("device.vendor_profile", "Vendor profile cannot be empty");
        } else if device.vendor_profile != SUPPORTED_PROFILE {
            result.warnings.push(format!(
                "Vendor profile '{}' is untested; the change set targets IOS-XE",
                device.vendor_profile
            ));
        }

        if device.default_address.trim().is_empty() {
            result.error("device.default_address", "Default address cannot be empty");
        } else if !is_ip_literal(&device.default_address) {
            result.warnings.push(format!(
                "Default address '{}' is not an IP literal",
                device.default_address
            ));
        }

        if !device.hostkey_verify {
            result
                .warnings
                .push(String::from("Host key verification is disabled"));
        }
    }

    fn validate_notifier(notifier: &NotifierConfig, secrets: &Secrets, result: &mut ValidationResult) {
        if notifier.backend != NotifierBackend::Webex {
            return;
        }

        match Url::parse(&notifier.api_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => result.error(
                "notifier.api_url",
                format!("API URL scheme '{}' is not http or https", url.scheme()),
            ),
            Err(e) => result.error("notifier.api_url", format!("API URL is invalid: {e}")),
        }

        if secrets.webex_token.as_deref().is_none_or(str::is_empty) {
            result.error(
                "notifier.token",
                format!("{ENV_WEBEX_TOKEN} is required for the webex backend"),
            );
        }

        if secrets.webex_room_id.as_deref().is_none_or(str::is_empty) {
            result.error(
                "notifier.room_id",
                format!("{ENV_WEBEX_ROOM_ID} is required for the webex backend"),
            );
        }
    }

    fn validate_credentials(secrets: &Secrets, result: &mut ValidationResult) {
        if secrets.username.as_deref().is_none_or(str::is_empty) {
            result.warnings.push(format!("{ENV_USERNAME} is not set"));
        }
        if secrets.password.as_deref().is_none_or(str::is_empty) {
            result.warnings.push(format!("{ENV_PASSWORD} is not set"));
        }
    }
}
