//! NETCONF message documents: hellos, RPC envelopes and reply parsing.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::ProtocolError;

/// NETCONF base namespace.
pub const BASE_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// `base:1.0` capability URI.
pub const CAP_BASE_1_0: &str = "urn:ietf:params:netconf:base:1.0";

/// `base:1.1` capability URI.
pub const CAP_BASE_1_1: &str = "urn:ietf:params:netconf:base:1.1";

/// Builds the client `<hello>` advertising both base versions.
#[must_use]
pub fn client_hello() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <hello xmlns=\"{BASE_NS}\">\n  <capabilities>\n    \
         <capability>{CAP_BASE_1_0}</capability>\n    \
         <capability>{CAP_BASE_1_1}</capability>\n  \
         </capabilities>\n</hello>"
    )
}

/// Wraps an operation in an `<rpc>` envelope.
#[must_use]
pub fn rpc(message_id: u64, operation: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <rpc message-id=\"{message_id}\" xmlns=\"{BASE_NS}\">\n{operation}\n</rpc>"
    )
}

/// `<get>` with a subtree filter.
#[must_use]
pub fn get(filter: &str) -> String {
    format!("<get>\n{filter}\n</get>")
}

/// `<edit-config>` against `target`.
#[must_use]
pub fn edit_config(target: &str, config: &str) -> String {
    format!("<edit-config>\n<target><{target}/></target>\n{config}\n</edit-config>")
}

/// `<close-session>`.
#[must_use]
pub const fn close_session() -> &'static str {
    "<close-session/>"
}

/// The server side of the hello exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerHello {
    /// Session identifier assigned by the server.
    pub session_id: Option<u32>,
    /// Advertised capability URIs.
    pub capabilities: Vec<String>,
}

impl ServerHello {
    /// Parses a server `<hello>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a well-formed hello.
    pub fn parse(xml: &str) -> Result<Self, ProtocolError> {
        let mut reader = Reader::from_str(xml);
        let mut path: Vec<String> = Vec::new();
        let mut hello = Self::default();
        let mut saw_root = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = local_name(&e);
                    if path.is_empty() {
                        check_root(&name, "hello")?;
                        saw_root = true;
                    }
                    path.push(name);
                }
                Ok(Event::Empty(e)) => {
                    if path.is_empty() {
                        check_root(&local_name(&e), "hello")?;
                        saw_root = true;
                    }
                }
                Ok(Event::End(_)) => {
                    path.pop();
                }
                Ok(Event::Text(t)) => {
                    let text = t
                        .unescape()
                        .map_err(|e| ProtocolError::malformed(format!("bad hello text: {e}")))?;
                    let text = text.trim();
                    match path.last().map(String::as_str) {
                        Some("capability") if !text.is_empty() => {
                            hello.capabilities.push(text.to_string());
                        }
                        Some("session-id") if !text.is_empty() => {
                            hello.session_id = Some(text.parse().map_err(|_| {
                                ProtocolError::malformed(format!("invalid session-id '{text}'"))
                            })?);
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(ProtocolError::malformed(format!("invalid hello XML: {e}")));
                }
            }
        }

        if !saw_root {
            return Err(ProtocolError::malformed("empty hello"));
        }

        Ok(hello)
    }

    /// Returns true if the server advertised `capability`.
    #[must_use]
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

/// One `<rpc-error>` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcErrorInfo {
    /// `error-type` (transport, rpc, protocol, application).
    pub error_type: Option<String>,
    /// `error-tag`.
    pub tag: Option<String>,
    /// `error-severity` (error or warning).
    pub severity: Option<String>,
    /// `error-message`.
    pub message: Option<String>,
}

impl RpcErrorInfo {
    /// Returns true unless the device marked this entry as a warning.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.severity.as_deref() != Some("warning")
    }
}

/// A parsed `<rpc-reply>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcReply {
    /// Echoed `message-id`.
    pub message_id: Option<String>,
    /// Whether the reply contained `<ok/>`.
    pub ok: bool,
    /// The complete `<data>` element, tags included.
    pub data: Option<String>,
    /// Reported errors and warnings.
    pub errors: Vec<RpcErrorInfo>,
}

impl RpcReply {
    /// Parses an `<rpc-reply>` document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a well-formed reply.
    pub fn parse(xml: &str) -> Result<Self, ProtocolError> {
        let mut reader = Reader::from_str(xml);
        let mut path: Vec<String> = Vec::new();
        let mut reply = Self::default();
        let mut current_error: Option<RpcErrorInfo> = None;
        let mut data_start: Option<usize> = None;
        let mut saw_root = false;

        loop {
            let before = position(&reader);
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = local_name(&e);
                    match path.len() {
                        0 => {
                            check_root(&name, "rpc-reply")?;
                            saw_root = true;
                            reply.message_id = message_id(&e)?;
                        }
                        1 if name == "data" => data_start = Some(before),
                        1 if name == "rpc-error" => current_error = Some(RpcErrorInfo::default()),
                        _ => {}
                    }
                    path.push(name);
                }
                Ok(Event::Empty(e)) => {
                    let name = local_name(&e);
                    match path.len() {
                        0 => {
                            check_root(&name, "rpc-reply")?;
                            saw_root = true;
                            reply.message_id = message_id(&e)?;
                        }
                        1 if name == "ok" => reply.ok = true,
                        1 if name == "data" => {
                            reply.data = Some(slice(xml, before, position(&reader))?);
                        }
                        _ => {}
                    }
                }
                Ok(Event::End(_)) => {
                    let closed = path.pop();
                    if path.len() == 1 {
                        match closed.as_deref() {
                            Some("data") => {
                                let start = data_start.take().ok_or_else(|| {
                                    ProtocolError::malformed("unbalanced <data> element")
                                })?;
                                reply.data = Some(slice(xml, start, position(&reader))?);
                            }
                            Some("rpc-error") => {
                                if let Some(error) = current_error.take() {
                                    reply.errors.push(error);
                                }
                            }
                            _ => {}
                        }
                    }
                }
                Ok(Event::Text(t)) => {
                    let Some(error) = current_error.as_mut() else {
                        continue;
                    };
                    let text = t
                        .unescape()
                        .map_err(|e| ProtocolError::malformed(format!("bad error text: {e}")))?;
                    let text = text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    let value = Some(text.to_string());
                    match path.last().map(String::as_str) {
                        Some("error-type") => error.error_type = value,
                        Some("error-tag") => error.tag = value,
                        Some("error-severity") => error.severity = value,
                        Some("error-message") => error.message = value,
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(ProtocolError::malformed(format!("invalid rpc-reply XML: {e}")));
                }
            }
        }

        if !saw_root {
            return Err(ProtocolError::malformed("empty rpc-reply"));
        }
        if !path.is_empty() {
            return Err(ProtocolError::malformed("truncated rpc-reply"));
        }

        Ok(reply)
    }

    /// Converts fatal `<rpc-error>` entries into an error.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::RpcError`] for the first fatal entry.
    pub fn into_result(self) -> Result<Self, ProtocolError> {
        if let Some(fatal) = self.errors.iter().find(|e| e.is_fatal()) {
            let tag = fatal.tag.clone().unwrap_or_else(|| String::from("unknown"));
            let message = fatal.message.clone().unwrap_or_else(|| tag.clone());
            return Err(ProtocolError::RpcError { tag, message });
        }
        Ok(self)
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn check_root(name: &str, expected: &str) -> Result<(), ProtocolError> {
    if name == expected {
        Ok(())
    } else {
        Err(ProtocolError::malformed(format!(
            "expected <{expected}> root element, found <{name}>"
        )))
    }
}

fn message_id(e: &BytesStart<'_>) -> Result<Option<String>, ProtocolError> {
    let attribute = e
        .try_get_attribute("message-id")
        .map_err(|err| ProtocolError::malformed(format!("bad rpc-reply attributes: {err}")))?;

    attribute
        .map(|a| {
            a.unescape_value()
                .map(std::borrow::Cow::into_owned)
                .map_err(|err| ProtocolError::malformed(format!("bad message-id: {err}")))
        })
        .transpose()
}

fn position(reader: &Reader<&[u8]>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}

fn slice(xml: &str, start: usize, end: usize) -> Result<String, ProtocolError> {
    xml.get(start..end)
        .map(str::to_string)
        .ok_or_else(|| ProtocolError::malformed("element boundaries out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER_HELLO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <capabilities>
    <capability>urn:ietf:params:netconf:base:1.0</capability>
    <capability>urn:ietf:params:netconf:base:1.1</capability>
    <capability>http://cisco.com/ns/yang/Cisco-IOS-XE-native?module=Cisco-IOS-XE-native&amp;revision=2019-11-01</capability>
  </capabilities>
  <session-id>4711</session-id>
</hello>"#;

    #[test]
    fn test_parse_server_hello() {
        let hello = ServerHello::parse(SERVER_HELLO).unwrap();

        assert_eq!(hello.session_id, Some(4711));
        assert_eq!(hello.capabilities.len(), 3);
        assert!(hello.supports(CAP_BASE_1_1));
        assert!(hello.capabilities[2].contains("&revision="));
    }

    #[test]
    fn test_hello_with_wrong_root_rejected() {
        let result = ServerHello::parse("<rpc-reply/>");
        assert!(matches!(result, Err(ProtocolError::MalformedReply { .. })));
    }

    #[test]
    fn test_client_hello_advertises_both_bases() {
        let hello = ServerHello::parse(&client_hello()).unwrap();
        assert!(hello.supports(CAP_BASE_1_0));
        assert!(hello.supports(CAP_BASE_1_1));
        assert_eq!(hello.session_id, None);
    }

    #[test]
    fn test_parse_ok_reply() {
        let reply = RpcReply::parse(
            r#"<rpc-reply message-id="7" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><ok/></rpc-reply>"#,
        )
        .unwrap();

        assert!(reply.ok);
        assert_eq!(reply.message_id.as_deref(), Some("7"));
        assert!(reply.data.is_none());
        assert!(reply.into_result().is_ok());
    }

    #[test]
    fn test_parse_data_reply_keeps_element() {
        let xml = r#"<rpc-reply message-id="2" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <data><native xmlns="http://cisco.com/ns/yang/Cisco-IOS-XE-native"><hostname>R1</hostname></native></data>
</rpc-reply>"#;
        let reply = RpcReply::parse(xml).unwrap();

        assert_eq!(
            reply.data.as_deref(),
            Some(r#"<data><native xmlns="http://cisco.com/ns/yang/Cisco-IOS-XE-native"><hostname>R1</hostname></native></data>"#)
        );
        assert!(!reply.ok);
    }

    #[test]
    fn test_parse_empty_data_element() {
        let reply = RpcReply::parse(r#"<rpc-reply message-id="3"><data/></rpc-reply>"#).unwrap();
        assert_eq!(reply.data.as_deref(), Some("<data/>"));
    }

    #[test]
    fn test_rpc_error_becomes_protocol_error() {
        let xml = r#"<rpc-reply message-id="5" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <rpc-error>
    <error-type>application</error-type>
    <error-tag>invalid-value</error-tag>
    <error-severity>error</error-severity>
    <error-message xml:lang="en">inconsistent value: Device refused one or more commands</error-message>
  </rpc-error>
</rpc-reply>"#;
        let reply = RpcReply::parse(xml).unwrap();
        assert_eq!(reply.errors.len(), 1);

        match reply.into_result() {
            Err(ProtocolError::RpcError { tag, message }) => {
                assert_eq!(tag, "invalid-value");
                assert!(message.starts_with("inconsistent value"));
            }
            other => panic!("expected RpcError, got {other:?}"),
        }
    }

    #[test]
    fn test_warnings_are_not_fatal() {
        let xml = r#"<rpc-reply message-id="6"><rpc-error><error-tag>partial-operation</error-tag><error-severity>warning</error-severity></rpc-error><ok/></rpc-reply>"#;
        let reply = RpcReply::parse(xml).unwrap().into_result().unwrap();
        assert!(reply.ok);
        assert_eq!(reply.errors.len(), 1);
    }

    #[test]
    fn test_truncated_reply_rejected() {
        let result = RpcReply::parse(r#"<rpc-reply message-id="9"><data><native>"#);
        assert!(matches!(result, Err(ProtocolError::MalformedReply { .. })));
    }

    #[test]
    fn test_rpc_envelope() {
        let envelope = rpc(42, &get("<filter/>"));
        assert!(envelope.contains(r#"<rpc message-id="42" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">"#));
        assert!(envelope.contains("<get>\n<filter/>\n</get>"));
        assert!(edit_config("running", "<config/>").contains("<target><running/></target>"));
    }
}
