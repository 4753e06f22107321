//! Configuration parser for loading configuration files and the environment.
//!
//! Precedence, lowest first: built-in defaults, the YAML file, environment
//! overrides. Secrets come only from the environment.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{AutomationError, ConfigError, Result};

use super::types::{
    AutomationConfig, ENV_DEFAULT_HOST, ENV_PASSWORD, ENV_PORT, ENV_USERNAME, ENV_WEBEX_ROOM_ID,
    ENV_WEBEX_TOKEN,
};

/// Configuration parser.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Directory holding `.env`.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory searched for `.env`.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or invalid.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<AutomationConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(AutomationError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AutomationError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string. Blank input yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<AutomationConfig> {
        debug!("Parsing YAML configuration");

        if content.trim().is_empty() {
            return Ok(AutomationConfig::default());
        }

        let config: AutomationConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            AutomationError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed configuration: default device {}:{}",
            config.device.default_address, config.device.port
        );
        Ok(config)
    }

    /// Loads `path` if given, otherwise the nearest configuration file above
    /// the working directory, then the user-level file, otherwise defaults.
    /// Applies the process environment on top.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing, any file is invalid
    /// or an environment override is malformed.
    pub fn load(&self, path: Option<&Path>) -> Result<AutomationConfig> {
        let mut config = match path {
            Some(path) => self.load_file(path)?,
            None => match std::env::current_dir()
                .ok()
                .and_then(|cwd| find_config_file(cwd).ok())
                .or_else(user_config_file)
            {
                Some(found) => self.load_file(found)?,
                None => {
                    info!("No configuration file found, using defaults");
                    AutomationConfig::default()
                }
            },
        };

        Self::apply_env(&mut config, |name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Applies overrides and secrets from `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if `NETCONF_PORT` is not a valid port number.
    pub fn apply_env<F>(config: &mut AutomationConfig, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_DEFAULT_HOST) {
            debug!("Overriding device.default_address from environment");
            config.device.default_address = host;
        }

        if let Some(port) = lookup(ENV_PORT) {
            debug!("Overriding device.port from environment");
            config.device.port = port.trim().parse().map_err(|_| {
                ConfigError::validation(format!("{ENV_PORT} must be a port number, got '{port}'"), "device.port")
            })?;
        }

        config.secrets.username = lookup(ENV_USERNAME);
        config.secrets.password = lookup(ENV_PASSWORD);
        config.secrets.webex_token = lookup(ENV_WEBEX_TOKEN);
        config.secrets.webex_room_id = lookup(ENV_WEBEX_ROOM_ID);

        Ok(())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                AutomationError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["netconf-automate.yaml", "netconf-automate.yml"];

/// `<config dir>/netconf-automate/netconf-automate.yaml`, if it exists.
#[must_use]
pub fn user_config_file() -> Option<PathBuf> {
    let path = dirs::config_dir()?
        .join("netconf-automate")
        .join(DEFAULT_CONFIG_FILES[0]);
    path.exists().then_some(path)
}

/// Finds the configuration file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(AutomationError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotifierBackend;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let yaml = r"
device:
  default_address: 10.10.20.48
notifier:
  backend: log
";
        let config = ConfigParser::new().parse_yaml(yaml, None).unwrap();
        assert_eq!(config.device.default_address, "10.10.20.48");
        assert_eq!(config.device.port, 830);
        assert_eq!(config.device.rpc_timeout_secs, 60);
        assert_eq!(config.notifier.backend, NotifierBackend::Log);
    }

    #[test]
    fn test_parse_empty_yields_defaults() {
        let config = ConfigParser::new().parse_yaml("  \n", None).unwrap();
        assert_eq!(config, AutomationConfig::default());
    }

    #[test]
    fn test_parse_rejects_bad_types() {
        let result = ConfigParser::new().parse_yaml("device:\n  port: not-a-number\n", None);
        assert!(matches!(
            result,
            Err(AutomationError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_env_overrides_and_secrets() {
        let mut config = AutomationConfig::default();
        ConfigParser::apply_env(
            &mut config,
            env(&[
                ("NETCONF_DEFAULT_HOST", "172.16.0.1"),
                ("NETCONF_PORT", " 2830 "),
                ("NETCONF_USERNAME", "devnet"),
                ("NETCONF_PASSWORD", "cisco123"),
                ("WEBEX_TOKEN", "tok"),
            ]),
        )
        .unwrap();

        assert_eq!(config.device.default_address, "172.16.0.1");
        assert_eq!(config.device.port, 2830);
        assert_eq!(config.secrets.username.as_deref(), Some("devnet"));
        assert_eq!(config.secrets.webex_token.as_deref(), Some("tok"));
        assert!(config.secrets.webex_room_id.is_none());
    }

    #[test]
    fn test_env_rejects_bad_port() {
        let mut config = AutomationConfig::default();
        let result = ConfigParser::apply_env(&mut config, env(&[("NETCONF_PORT", "70000")]));
        assert!(matches!(
            result,
            Err(AutomationError::Config(ConfigError::ValidationError { .. }))
        ));
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("netconf-automate.yaml"), "device: {}\n").unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("netconf-automate.yaml"));
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigParser::new().load_file(dir.path().join("absent.yaml"));
        assert!(matches!(
            result,
            Err(AutomationError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_load_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netconf-automate.yaml");
        std::fs::write(&path, "device:\n  port: 10830\n  hostkey_verify: true\n").unwrap();

        let config = ConfigParser::new().load_file(&path).unwrap();
        assert_eq!(config.device.port, 10830);
        assert!(config.device.hostkey_verify);
    }
}
