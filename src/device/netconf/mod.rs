//! NETCONF protocol adapter.
//!
//! This module provides the protocol side of device sessions:
//! - RFC 6242 message framing (end-of-message and chunked)
//! - Hello, `<get>`, `<edit-config>` and `<close-session>` documents
//! - Reply parsing with `<rpc-error>` extraction
//! - A session type that runs over any async byte stream

mod framing;
mod message;
mod session;

pub use framing::{END_OF_MESSAGE, FrameDecoder, Framing, encode};
pub use message::{
    BASE_NS, CAP_BASE_1_0, CAP_BASE_1_1, RpcErrorInfo, RpcReply, ServerHello,
};
pub use session::{NetconfSession, NetconfTransport, SessionOptions};
