//! NETCONF message framing (RFC 6242).
//!
//! Hellos always use end-of-message framing. Once both peers advertise
//! `base:1.1` the session switches to chunked framing.

use crate::error::ProtocolError;

/// End-of-message delimiter for `base:1.0`.
pub const END_OF_MESSAGE: &[u8] = b"]]>]]>";

/// Largest chunk size permitted by RFC 6242.
const MAX_CHUNK_SIZE: u64 = 4_294_967_295;

/// Longest chunk-size header (`MAX_CHUNK_SIZE` has ten digits).
const MAX_CHUNK_DIGITS: usize = 10;

/// Framing mechanism in use on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `]]>]]>` after every message.
    EndOfMessage,
    /// `\n#<len>\n` chunks terminated by `\n##\n`.
    Chunked,
}

/// Wraps one message for the wire.
#[must_use]
pub fn encode(framing: Framing, message: &str) -> Vec<u8> {
    match framing {
        Framing::EndOfMessage => {
            let mut out = Vec::with_capacity(message.len() + END_OF_MESSAGE.len());
            out.extend_from_slice(message.as_bytes());
            out.extend_from_slice(END_OF_MESSAGE);
            out
        }
        Framing::Chunked => {
            let mut out = format!("\n#{}\n", message.len()).into_bytes();
            out.extend_from_slice(message.as_bytes());
            out.extend_from_slice(b"\n##\n");
            out
        }
    }
}

/// Incremental decoder accumulating bytes until a full message is present.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Appends bytes read from the transport.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes held but not yet consumed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Extracts the next complete message, if one is buffered.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Framing`] on a chunk header violation or
    /// non-UTF-8 content.
    pub fn next_message(&mut self, framing: Framing) -> Result<Option<String>, ProtocolError> {
        let frame = match framing {
            Framing::EndOfMessage => self.take_end_of_message(),
            Framing::Chunked => self.take_chunked()?,
        };

        frame
            .map(|bytes| {
                String::from_utf8(bytes)
                    .map_err(|e| ProtocolError::framing(format!("message is not UTF-8: {e}")))
            })
            .transpose()
    }

    fn take_end_of_message(&mut self) -> Option<Vec<u8>> {
        let pos = self
            .buffer
            .windows(END_OF_MESSAGE.len())
            .position(|w| w == END_OF_MESSAGE)?;

        let mut message: Vec<u8> = self.buffer.drain(..pos + END_OF_MESSAGE.len()).collect();
        message.truncate(pos);
        Some(message)
    }

    fn take_chunked(&mut self) -> Result<Option<Vec<u8>>, ProtocolError> {
        let buf = &self.buffer;
        let mut cursor = 0;
        let mut message = Vec::new();

        loop {
            // Every header starts with "\n#".
            if buf.len() < cursor + 3 {
                return Ok(None);
            }
            if buf[cursor] != b'\n' || buf[cursor + 1] != b'#' {
                return Err(ProtocolError::framing("expected chunk header"));
            }

            if buf[cursor + 2] == b'#' {
                if buf.len() < cursor + 4 {
                    return Ok(None);
                }
                if buf[cursor + 3] != b'\n' {
                    return Err(ProtocolError::framing("malformed end-of-chunks marker"));
                }
                self.buffer.drain(..cursor + 4);
                return Ok(Some(message));
            }

            let digits_start = cursor + 2;
            let Some(newline) = buf[digits_start..].iter().position(|b| *b == b'\n') else {
                if buf.len() - digits_start > MAX_CHUNK_DIGITS {
                    return Err(ProtocolError::framing("chunk size header too long"));
                }
                return Ok(None);
            };

            let digits = &buf[digits_start..digits_start + newline];
            let size = parse_chunk_size(digits)?;
            let data_start = digits_start + newline + 1;
            let data_end = data_start + size;

            if buf.len() < data_end {
                return Ok(None);
            }

            message.extend_from_slice(&buf[data_start..data_end]);
            cursor = data_end;
        }
    }
}

fn parse_chunk_size(digits: &[u8]) -> Result<usize, ProtocolError> {
    if digits.is_empty() || digits.len() > MAX_CHUNK_DIGITS || digits[0] == b'0' {
        return Err(ProtocolError::framing("invalid chunk size"));
    }
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(ProtocolError::framing("chunk size is not numeric"));
    }

    let size = digits
        .iter()
        .fold(0u64, |acc, d| acc * 10 + u64::from(d - b'0'));

    if size > MAX_CHUNK_SIZE {
        return Err(ProtocolError::framing("chunk size exceeds limit"));
    }

    usize::try_from(size).map_err(|_| ProtocolError::framing("chunk size exceeds platform limit"))
}
