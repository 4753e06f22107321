//! NETCONF over SSH (RFC 6242) using `russh`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::Disconnect;
use russh::client::{self, Handle};
use russh_keys::key::PublicKey;
use tracing::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::error::{DeviceError, TransportError};

use super::change_set::{ConfigChangeSet, FilterDescriptor};
use super::netconf::{NetconfSession, SessionOptions};
use super::session::{ApplyResult, DeviceConnector, DeviceSession, TargetDevice};

const NETCONF_SUBSYSTEM: &str = "netconf";

/// Accepts or rejects the server host key.
struct HostKeyPolicy {
    host: String,
    port: u16,
    verify: bool,
}

#[async_trait]
impl client::Handler for HostKeyPolicy {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        if !self.verify {
            return Ok(true);
        }

        match russh_keys::check_known_hosts(&self.host, self.port, server_public_key) {
            Ok(known) => {
                if !known {
                    warn!("Host key for {}:{} is not in known_hosts", self.host, self.port);
                }
                Ok(known)
            }
            Err(e) => {
                warn!("Host key check for {}:{} failed: {e}", self.host, self.port);
                Ok(false)
            }
        }
    }
}

/// Opens NETCONF sessions over SSH.
#[derive(Debug, Clone)]
pub struct SshConnector {
    connect_timeout: Duration,
    hostkey_verify: bool,
    session_options: SessionOptions,
}

impl SshConnector {
    /// Creates a connector from the device settings.
    #[must_use]
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            hostkey_verify: config.hostkey_verify,
            session_options: SessionOptions {
                hello_timeout: config.connect_timeout(),
                rpc_timeout: config.rpc_timeout(),
            },
        }
    }

    async fn open(&self, target: &TargetDevice) -> Result<SshNetconfSession, TransportError> {
        let address = target.address();
        let port = target.port();
        let secs = self.connect_timeout.as_secs();
        let credentials = target.credentials();

        let config = Arc::new(client::Config {
            inactivity_timeout: None,
            ..Default::default()
        });
        let policy = HostKeyPolicy {
            host: address.to_string(),
            port,
            verify: self.hostkey_verify,
        };

        let mut handle = client::connect(config, (address, port), policy)
            .await
            .map_err(|e| map_ssh_error(address, port, secs, e))?;

        let authenticated = handle
            .authenticate_password(credentials.username.as_str(), credentials.password.as_str())
            .await
            .map_err(|e| map_ssh_error(address, port, secs, e))?;
        if !authenticated {
            return Err(TransportError::AuthenticationFailed {
                username: credentials.username.clone(),
            });
        }
        debug!("Authenticated to {} as '{}'", target.endpoint(), credentials.username);

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| TransportError::handshake(format!("failed to open channel: {e}")))?;
        channel
            .request_subsystem(true, NETCONF_SUBSYSTEM)
            .await
            .map_err(|e| TransportError::handshake(format!("netconf subsystem refused: {e}")))?;

        let netconf = NetconfSession::establish(channel.into_stream(), self.session_options).await?;

        Ok(SshNetconfSession {
            netconf,
            handle: Some(handle),
        })
    }
}

#[async_trait]
impl DeviceConnector for SshConnector {
    async fn connect(&self, target: &TargetDevice) -> Result<Box<dyn DeviceSession>, DeviceError> {
        info!("Connecting to {} (profile {})", target.endpoint(), target.vendor_profile());

        let secs = self.connect_timeout.as_secs();
        let session = tokio::time::timeout(self.connect_timeout, self.open(target))
            .await
            .map_err(|_| TransportError::timeout(format!("connecting to {}", target.endpoint()), secs))??;

        info!(
            "NETCONF session {:?} open on {} ({} capabilities)",
            session.netconf.session_id(),
            target.endpoint(),
            session.netconf.capabilities().len()
        );
        Ok(Box::new(session))
    }
}

fn map_ssh_error(address: &str, port: u16, timeout_secs: u64, err: russh::Error) -> TransportError {
    match err {
        russh::Error::IO(io) => TransportError::from_connect_io(address, port, timeout_secs, &io),
        russh::Error::UnknownKey => TransportError::handshake("server host key rejected"),
        other => TransportError::handshake(other.to_string()),
    }
}

/// A NETCONF session plus the SSH connection carrying it.
struct SshNetconfSession {
    netconf: NetconfSession,
    handle: Option<Handle<HostKeyPolicy>>,
}

#[async_trait]
impl DeviceSession for SshNetconfSession {
    async fn get_config(&mut self, filter: &FilterDescriptor) -> Result<String, DeviceError> {
        self.netconf.get(filter).await
    }

    async fn apply_config(&mut self, change_set: &ConfigChangeSet) -> Result<ApplyResult, DeviceError> {
        self.netconf.edit_config(&change_set.to_payload()).await
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        let result = self.netconf.close_session().await;

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.disconnect(Disconnect::ByApplication, "", "en").await {
                debug!("SSH disconnect failed: {e}");
            }
        }

        result
    }
}
