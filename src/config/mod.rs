//! Configuration module for the automation tool.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `netconf-automate.yaml`
//! - Environment overrides and secrets (with `.env` support)
//! - Validation of configuration values

mod parser;
mod types;
mod validator;

pub use parser::{ConfigParser, DEFAULT_CONFIG_FILES, find_config_file, user_config_file};
pub use types::{
    AutomationConfig, DeviceConfig, ENV_DEFAULT_HOST, ENV_PASSWORD, ENV_PORT, ENV_USERNAME,
    ENV_WEBEX_ROOM_ID, ENV_WEBEX_TOKEN, NotifierBackend, NotifierConfig, Secrets,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
