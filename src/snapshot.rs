//! Configuration snapshots.
//!
//! This module turns the raw `<data>` element returned by a device into
//! stable, human-readable text and checks it for the change marker:
//! - Pretty-printing with a fixed indent and whitespace-only text dropped
//! - A content digest for detecting whether the configuration changed
//! - Marker verification on the post-change snapshot

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

/// Rendered text used when a snapshot cannot be formatted.
pub const NOT_AVAILABLE: &str = "N/A";

/// Why a snapshot could not be rendered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// The input held no element at all.
    #[error("snapshot is empty")]
    Empty,

    /// The input is not well-formed XML.
    #[error("snapshot is not well-formed XML: {message}")]
    Malformed {
        /// Parser message.
        message: String,
    },
}

impl SnapshotError {
    fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Pretty-prints configuration data.
#[derive(Debug, Default)]
pub struct SnapshotFormatter;

impl SnapshotFormatter {
    /// Renders `raw` with two-space indentation, or [`NOT_AVAILABLE`] if it
    /// cannot be parsed.
    #[must_use]
    pub fn format(raw: &str) -> String {
        match Self::try_format(raw) {
            Ok(rendered) => rendered,
            Err(e) => {
                debug!("Snapshot not rendered: {e}");
                NOT_AVAILABLE.to_string()
            }
        }
    }

    /// Renders `raw`, reporting why it could not be parsed.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Empty`] when no element is present and
    /// [`SnapshotError::Malformed`] for anything a parser rejects, including
    /// unclosed elements and text outside the root.
    pub fn try_format(raw: &str) -> Result<String, SnapshotError> {
        let mut reader = Reader::from_str(raw);
        reader.config_mut().trim_text(true);

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        let mut depth = 0usize;
        let mut elements = 0usize;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| SnapshotError::malformed(e.to_string()))?;

            match event {
                Event::Eof => break,
                Event::Decl(_) | Event::DocType(_) | Event::PI(_) => continue,
                Event::Start(_) => {
                    depth += 1;
                    elements += 1;
                }
                Event::Empty(_) => elements += 1,
                Event::End(_) => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| SnapshotError::malformed("unexpected closing tag"))?;
                }
                Event::Text(_) | Event::CData(_) if depth == 0 => {
                    return Err(SnapshotError::malformed("text outside the root element"));
                }
                _ => {}
            }

            writer
                .write_event(event)
                .map_err(|e| SnapshotError::malformed(e.to_string()))?;
        }

        if depth != 0 {
            return Err(SnapshotError::malformed("unclosed element"));
        }
        if elements == 0 {
            return Err(SnapshotError::Empty);
        }

        String::from_utf8(writer.into_inner()).map_err(|e| SnapshotError::malformed(e.to_string()))
    }
}

/// A point-in-time view of the filtered configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSnapshot {
    #[serde(skip)]
    raw: String,
    rendered: String,
    captured_at: DateTime<Utc>,
    digest: String,
}

impl ConfigSnapshot {
    /// Formats `raw` and stamps it with the current time.
    #[must_use]
    pub fn capture(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let rendered = SnapshotFormatter::format(&raw);

        let mut hasher = Sha256::new();
        hasher.update(rendered.as_bytes());
        let digest = hex::encode(hasher.finalize());

        Self {
            raw,
            rendered,
            captured_at: Utc::now(),
            digest,
        }
    }

    /// Data as received from the device.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Pretty-printed text, or [`NOT_AVAILABLE`].
    #[must_use]
    pub fn rendered(&self) -> &str {
        &self.rendered
    }

    /// Capture time.
    #[must_use]
    pub const fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// SHA-256 hex digest of the rendered text.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Whether the data could be rendered.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.rendered != NOT_AVAILABLE
    }

    /// Whether `other` holds different content.
    #[must_use]
    pub fn differs_from(&self, other: &Self) -> bool {
        self.digest != other.digest
    }
}

/// Checks that `rendered` contains `marker` verbatim.
#[must_use]
pub fn verify(rendered: &str, marker: &str) -> bool {
    rendered.contains(marker)
}
