//! NETCONF client session over an arbitrary byte stream.
//!
//! The session owns the stream, negotiates framing during the hello
//! exchange and runs one RPC at a time. Transport setup (SSH, TLS, a test
//! pipe) happens before [`NetconfSession::establish`] is called.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

use crate::device::change_set::{ConfigChangeSet, FilterDescriptor};
use crate::device::session::{ApplyResult, DeviceSession};
use crate::error::{DeviceError, ProtocolError, TransportError};

use super::framing::{FrameDecoder, Framing, encode};
use super::message::{self, CAP_BASE_1_0, CAP_BASE_1_1, RpcReply, ServerHello};

/// Read buffer size for the transport.
const READ_CHUNK: usize = 8192;

/// Datastore targeted by `edit-config`.
const RUNNING: &str = "running";

/// A duplex byte stream a session can run over.
pub trait NetconfTransport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> NetconfTransport for T {}

/// Timeouts applied by the session.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Limit for the hello exchange.
    pub hello_timeout: Duration,
    /// Limit for each RPC round trip.
    pub rpc_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            hello_timeout: Duration::from_secs(30),
            rpc_timeout: Duration::from_secs(60),
        }
    }
}

/// An established NETCONF session.
pub struct NetconfSession {
    stream: Box<dyn NetconfTransport>,
    decoder: FrameDecoder,
    framing: Framing,
    next_message_id: u64,
    options: SessionOptions,
    session_id: Option<u32>,
    capabilities: Vec<String>,
    closed: bool,
}

impl std::fmt::Debug for NetconfSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetconfSession")
            .field("session_id", &self.session_id)
            .field("framing", &self.framing)
            .field("next_message_id", &self.next_message_id)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl NetconfSession {
    /// Runs the hello exchange over `stream`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::HandshakeFailed`] if the server hello is
    /// missing, malformed or lacks a base capability, and
    /// [`TransportError::Timeout`] if it does not arrive in time.
    pub async fn establish<S>(stream: S, options: SessionOptions) -> Result<Self, TransportError>
    where
        S: NetconfTransport + 'static,
    {
        let mut session = Self {
            stream: Box::new(stream),
            decoder: FrameDecoder::new(),
            framing: Framing::EndOfMessage,
            next_message_id: 1,
            options,
            session_id: None,
            capabilities: Vec::new(),
            closed: false,
        };

        let secs = options.hello_timeout.as_secs();
        let hello = tokio::time::timeout(options.hello_timeout, session.exchange_hello())
            .await
            .map_err(|_| TransportError::timeout("waiting for server hello", secs))??;

        if !hello.supports(CAP_BASE_1_0) && !hello.supports(CAP_BASE_1_1) {
            return Err(TransportError::handshake(
                "server hello advertises no NETCONF base capability",
            ));
        }
        if hello.session_id.is_none() {
            warn!("Server hello carried no session-id");
        }

        if hello.supports(CAP_BASE_1_1) {
            session.framing = Framing::Chunked;
        }
        session.session_id = hello.session_id;
        session.capabilities = hello.capabilities;

        debug!(
            "NETCONF session {:?} established ({} capabilities, {:?} framing)",
            session.session_id,
            session.capabilities.len(),
            session.framing
        );

        Ok(session)
    }

    /// Server-assigned session identifier.
    #[must_use]
    pub const fn session_id(&self) -> Option<u32> {
        self.session_id
    }

    /// Negotiated framing.
    #[must_use]
    pub const fn framing(&self) -> Framing {
        self.framing
    }

    /// Capabilities advertised by the server.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    async fn exchange_hello(&mut self) -> Result<ServerHello, TransportError> {
        let hello = encode(Framing::EndOfMessage, &message::client_hello());
        self.stream
            .write_all(&hello)
            .await
            .map_err(|e| TransportError::handshake(format!("failed to send hello: {e}")))?;
        self.stream
            .flush()
            .await
            .map_err(|e| TransportError::handshake(format!("failed to send hello: {e}")))?;

        let reply = self.read_message().await.map_err(|e| match e {
            DeviceError::Transport(t) => t,
            other => TransportError::handshake(other.to_string()),
        })?;

        ServerHello::parse(&reply).map_err(|e| TransportError::handshake(e.to_string()))
    }

    async fn read_message(&mut self) -> Result<String, DeviceError> {
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(message) = self.decoder.next_message(self.framing)? {
                trace!("Received NETCONF message ({} bytes)", message.len());
                return Ok(message);
            }

            let read = self.stream.read(&mut chunk).await.map_err(|e| {
                TransportError::ConnectionLost {
                    message: format!("read failed: {e}"),
                }
            })?;

            if read == 0 {
                return Err(ProtocolError::SessionClosed.into());
            }
            self.decoder.push(&chunk[..read]);
        }
    }

    async fn send_message(&mut self, message: &str) -> Result<(), DeviceError> {
        let frame = encode(self.framing, message);
        self.stream.write_all(&frame).await.map_err(|e| {
            TransportError::ConnectionLost {
                message: format!("write failed: {e}"),
            }
        })?;
        self.stream.flush().await.map_err(|e| {
            TransportError::ConnectionLost {
                message: format!("flush failed: {e}"),
            }
        })?;
        Ok(())
    }

    /// Sends one RPC and waits for its reply.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Timeout`] if no reply arrives within the RPC
    /// timeout, [`ProtocolError::RpcError`] for fatal `<rpc-error>` entries
    /// and [`ProtocolError::MalformedReply`] for unparsable replies.
    pub async fn rpc(&mut self, operation: &str, body: &str) -> Result<RpcReply, DeviceError> {
        if self.closed {
            return Err(ProtocolError::SessionClosed.into());
        }

        let message_id = self.next_message_id;
        self.next_message_id += 1;

        debug!("Sending <{operation}> (message-id {message_id})");
        let request = message::rpc(message_id, body);

        let timeout = self.options.rpc_timeout;
        let raw = tokio::time::timeout(timeout, async {
            self.send_message(&request).await?;
            self.read_message().await
        })
        .await
        .map_err(|_| ProtocolError::Timeout {
            operation: operation.to_string(),
            secs: timeout.as_secs(),
        })??;

        let reply = RpcReply::parse(&raw)?;
        let expected = message_id.to_string();
        if reply.message_id.as_deref().is_some_and(|id| id != expected) {
            return Err(ProtocolError::malformed(format!(
                "reply message-id {:?} does not match request {expected}",
                reply.message_id
            ))
            .into());
        }

        Ok(reply.into_result()?)
    }

    /// Runs `<get>` with `filter` and returns the `<data>` element.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the request fails, or
    /// [`DeviceError::Unexpected`] if the reply carries no data.
    pub async fn get(&mut self, filter: &FilterDescriptor) -> Result<String, DeviceError> {
        let reply = self.rpc("get", &message::get(filter.as_str())).await?;
        reply
            .data
            .ok_or_else(|| DeviceError::unexpected("get reply carried no <data> element"))
    }

    /// Runs `<edit-config>` against the running datastore.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the device rejects the edit.
    pub async fn edit_config(&mut self, config: &str) -> Result<ApplyResult, DeviceError> {
        let reply = self
            .rpc("edit-config", &message::edit_config(RUNNING, config))
            .await?;
        Ok(ApplyResult { ok: reply.ok })
    }

    /// Sends `<close-session>` and shuts the stream down.
    ///
    /// Calling this more than once is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the close RPC's failure; the stream is shut down regardless.
    pub async fn close_session(&mut self) -> Result<(), DeviceError> {
        if self.closed {
            return Ok(());
        }

        let result = self.rpc("close-session", message::close_session()).await.map(|_| ());
        self.closed = true;

        if let Err(e) = self.stream.shutdown().await {
            debug!("Stream shutdown after close-session failed: {e}");
        }

        result
    }
}

#[async_trait]
impl DeviceSession for NetconfSession {
    async fn get_config(&mut self, filter: &FilterDescriptor) -> Result<String, DeviceError> {
        self.get(filter).await
    }

    async fn apply_config(&mut self, change_set: &ConfigChangeSet) -> Result<ApplyResult, DeviceError> {
        self.edit_config(&change_set.to_payload()).await
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        self.close_session().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::DuplexStream;

    fn server_hello(with_base_11: bool) -> String {
        let extra = if with_base_11 {
            format!("<capability>{CAP_BASE_1_1}</capability>")
        } else {
            String::new()
        };
        format!(
            "<hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\"><capabilities>\
             <capability>{CAP_BASE_1_0}</capability>{extra}</capabilities>\
             <session-id>17</session-id></hello>"
        )
    }

    async fn read_frame(stream: &mut DuplexStream, decoder: &mut FrameDecoder, framing: Framing) -> Option<String> {
        let mut buf = [0u8; 1024];
        loop {
            if let Some(msg) = decoder.next_message(framing).unwrap() {
                return Some(msg);
            }
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                return None;
            }
            decoder.push(&buf[..n]);
        }
    }

    fn request_id(request: &str) -> String {
        let start = request.find("message-id=\"").unwrap() + "message-id=\"".len();
        let end = start + request[start..].find('"').unwrap();
        request[start..end].to_string()
    }

    /// Plays a device: sends `hello`, then answers each request with the
    /// next reply template (`{id}` is replaced by the request's message-id).
    /// Returns every message the client sent.
    async fn fake_device(
        mut stream: DuplexStream,
        hello: String,
        replies: Vec<&'static str>,
    ) -> Vec<String> {
        let mut decoder = FrameDecoder::new();
        let mut received = Vec::new();

        stream.write_all(&encode(Framing::EndOfMessage, &hello)).await.unwrap();
        let client_hello = read_frame(&mut stream, &mut decoder, Framing::EndOfMessage)
            .await
            .unwrap();
        let framing = if client_hello.contains(CAP_BASE_1_1) && hello.contains(CAP_BASE_1_1) {
            Framing::Chunked
        } else {
            Framing::EndOfMessage
        };
        received.push(client_hello);

        for reply in replies {
            let Some(request) = read_frame(&mut stream, &mut decoder, framing).await else {
                break;
            };
            let body = reply.replace("{id}", &request_id(&request));
            stream.write_all(&encode(framing, &body)).await.unwrap();
            received.push(request);
        }

        received
    }

    fn options() -> SessionOptions {
        SessionOptions {
            hello_timeout: Duration::from_secs(5),
            rpc_timeout: Duration::from_secs(5),
        }
    }

    const DATA_REPLY: &str = r#"<rpc-reply message-id="{id}" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><data><native xmlns="http://cisco.com/ns/yang/Cisco-IOS-XE-native"><hostname>R1</hostname></native></data></rpc-reply>"#;
    const OK_REPLY: &str = r#"<rpc-reply message-id="{id}" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><ok/></rpc-reply>"#;
    const ERROR_REPLY: &str = r#"<rpc-reply message-id="{id}"><rpc-error><error-type>application</error-type><error-tag>invalid-value</error-tag><error-severity>error</error-severity><error-message>bad description</error-message></rpc-error></rpc-reply>"#;

    #[tokio::test]
    async fn test_hello_exchange_on_scripted_stream() {
        let stream = tokio_test::io::Builder::new()
            .write(&encode(Framing::EndOfMessage, &message::client_hello()))
            .read(&encode(Framing::EndOfMessage, &server_hello(false)))
            .build();

        let session = NetconfSession::establish(stream, options()).await.unwrap();
        assert_eq!(session.framing(), Framing::EndOfMessage);
        assert_eq!(session.session_id(), Some(17));
    }

    #[tokio::test]
    async fn test_negotiates_chunked_framing() {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let device = tokio::spawn(fake_device(server, server_hello(true), vec![DATA_REPLY, OK_REPLY]));

        let mut session = NetconfSession::establish(client, options()).await.unwrap();
        assert_eq!(session.framing(), Framing::Chunked);
        assert_eq!(session.session_id(), Some(17));
        assert!(session.capabilities().iter().any(|c| c == CAP_BASE_1_1));

        let data = session.get(&ConfigChangeSet::standard().filter()).await.unwrap();
        assert!(data.contains("<hostname>R1</hostname>"));

        session.close_session().await.unwrap();
        let received = device.await.unwrap();

        assert_eq!(received.len(), 3);
        assert!(received[1].contains("message-id=\"1\""));
        assert!(received[1].contains("<filter type=\"subtree\">"));
        assert!(received[2].contains("message-id=\"2\""));
        assert!(received[2].contains("<close-session/>"));
    }

    #[tokio::test]
    async fn test_base_10_server_keeps_end_of_message_framing() {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let device = tokio::spawn(fake_device(server, server_hello(false), vec![OK_REPLY]));

        let mut session = NetconfSession::establish(client, options()).await.unwrap();
        assert_eq!(session.framing(), Framing::EndOfMessage);

        let result = session
            .apply_config(&ConfigChangeSet::standard())
            .await
            .unwrap();
        assert!(result.ok);

        let received = device.await.unwrap();
        assert!(received[1].contains("<edit-config>"));
        assert!(received[1].contains("<target><running/></target>"));
        assert!(received[1].contains("<hostname>R1-NIM-UPDATED</hostname>"));
    }

    #[tokio::test]
    async fn test_rejected_edit_is_protocol_error() {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let _device = tokio::spawn(fake_device(server, server_hello(true), vec![ERROR_REPLY]));

        let mut session = NetconfSession::establish(client, options()).await.unwrap();
        let err = session
            .apply_config(&ConfigChangeSet::standard())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeviceError::Protocol(ProtocolError::RpcError { ref tag, .. }) if tag == "invalid-value"
        ));
    }

    #[tokio::test]
    async fn test_get_without_data_is_unexpected() {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let _device = tokio::spawn(fake_device(server, server_hello(true), vec![OK_REPLY]));

        let mut session = NetconfSession::establish(client, options()).await.unwrap();
        let err = session.get(&ConfigChangeSet::standard().filter()).await.unwrap_err();
        assert!(matches!(err, DeviceError::Unexpected { .. }));
    }

    #[tokio::test]
    async fn test_rpc_timeout_is_protocol_timeout() {
        let (client, mut server) = tokio::io::duplex(64 * 1024);
        server
            .write_all(&encode(Framing::EndOfMessage, &server_hello(false)))
            .await
            .unwrap();

        let mut session = NetconfSession::establish(
            client,
            SessionOptions {
                hello_timeout: Duration::from_secs(5),
                rpc_timeout: Duration::from_millis(100),
            },
        )
        .await
        .unwrap();

        let err = session.get(&ConfigChangeSet::standard().filter()).await.unwrap_err();
        assert!(matches!(
            err,
            DeviceError::Protocol(ProtocolError::Timeout { ref operation, .. }) if operation == "get"
        ));
        drop(server);
    }

    #[tokio::test]
    async fn test_garbage_hello_is_handshake_failure() {
        let (client, mut server) = tokio::io::duplex(64 * 1024);
        server
            .write_all(&encode(Framing::EndOfMessage, "SSH-2.0-not-netconf"))
            .await
            .unwrap();

        let err = NetconfSession::establish(client, options()).await.unwrap_err();
        assert!(matches!(err, TransportError::HandshakeFailed { .. }));
    }

    #[tokio::test]
    async fn test_peer_hangup_during_rpc() {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let device = tokio::spawn(fake_device(server, server_hello(false), vec![]));

        let mut session = NetconfSession::establish(client, options()).await.unwrap();
        device.await.unwrap();

        let err = session.get(&ConfigChangeSet::standard().filter()).await.unwrap_err();
        assert!(matches!(
            err,
            DeviceError::Protocol(ProtocolError::SessionClosed)
                | DeviceError::Transport(TransportError::ConnectionLost { .. })
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let device = tokio::spawn(fake_device(server, server_hello(true), vec![OK_REPLY]));

        let mut session = NetconfSession::establish(client, options()).await.unwrap();
        session.close().await.unwrap();
        session.close().await.unwrap();

        let received = device.await.unwrap();
        assert_eq!(received.iter().filter(|m| m.contains("<close-session/>")).count(), 1);
    }
}
