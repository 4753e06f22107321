//! Outcome classification and notification payloads.

use std::fmt;

use serde::Serialize;

use crate::device::{ConfigChangeSet, TargetDevice};
use crate::error::DeviceError;

/// Detail recorded when the post-change snapshot lacks the marker.
pub const VERIFICATION_MISMATCH: &str = "verification mismatch, manual intervention required.";

const ALERT_HEADER: &str = "**NETCONF AUTOMATION ALERT**";

/// Overall result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    /// Changes applied and verified.
    Success,
    /// Something went wrong.
    Failure,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Which layer a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCategory {
    /// No error was raised (success, or verification mismatch).
    None,
    /// Connect, authentication or handshake failure.
    Transport,
    /// Rejected or malformed RPC.
    Protocol,
    /// Anything else.
    Application,
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "NONE",
            Self::Transport => "TRANSPORT",
            Self::Protocol => "PROTOCOL",
            Self::Application => "APPLICATION",
        };
        write!(f, "{label}")
    }
}

/// The single outcome of a run.
///
/// Only the constructors below create outcomes, so a success never carries
/// a category and a caught error always does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowOutcome {
    status: OutcomeStatus,
    category: FailureCategory,
    detail: String,
}

impl WorkflowOutcome {
    /// Verified success.
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: OutcomeStatus::Success,
            category: FailureCategory::None,
            detail: String::new(),
        }
    }

    /// Changes applied but the marker is missing.
    #[must_use]
    pub fn unverified() -> Self {
        Self {
            status: OutcomeStatus::Failure,
            category: FailureCategory::None,
            detail: VERIFICATION_MISMATCH.to_string(),
        }
    }

    fn failed(category: FailureCategory, detail: String) -> Self {
        let category = match category {
            FailureCategory::None => FailureCategory::Application,
            other => other,
        };
        Self {
            status: OutcomeStatus::Failure,
            category,
            detail,
        }
    }

    /// Run status.
    #[must_use]
    pub const fn status(&self) -> OutcomeStatus {
        self.status
    }

    /// Failure category.
    #[must_use]
    pub const fn category(&self) -> FailureCategory {
        self.category
    }

    /// Human-readable detail; empty on success.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Whether the run succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

impl fmt::Display for WorkflowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, self.category) {
            (OutcomeStatus::Success, _) => write!(f, "SUCCESS"),
            (OutcomeStatus::Failure, FailureCategory::None) => {
                write!(f, "FAILURE ({})", self.detail)
            }
            (OutcomeStatus::Failure, category) => {
                write!(f, "FAILURE [{category}] {}", self.detail)
            }
        }
    }
}

/// Maps the verification result to an outcome.
#[must_use]
pub fn classify(verified: bool) -> WorkflowOutcome {
    if verified {
        WorkflowOutcome::success()
    } else {
        WorkflowOutcome::unverified()
    }
}

/// Maps a device failure to an outcome.
#[must_use]
pub fn classify_failure(err: &DeviceError) -> WorkflowOutcome {
    match err {
        DeviceError::Transport(e) => WorkflowOutcome::failed(
            FailureCategory::Transport,
            format!("NETCONF SSH Connection Error: {e}"),
        ),
        DeviceError::Protocol(e) => WorkflowOutcome::failed(
            FailureCategory::Protocol,
            format!("NETCONF Operation Error: {e}"),
        ),
        DeviceError::Unexpected { .. } => WorkflowOutcome::failed(
            FailureCategory::Application,
            format!("An unexpected error occurred: {err}"),
        ),
    }
}

/// A notification ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    /// Device address.
    pub address: String,
    /// Device port.
    pub port: u16,
    /// Outcome being reported.
    pub outcome: WorkflowOutcome,
    /// Markdown body.
    pub markdown: String,
}

impl NotificationPayload {
    /// Renders the alert for `outcome` on `target`.
    #[must_use]
    pub fn build(target: &TargetDevice, outcome: &WorkflowOutcome, change_set: &ConfigChangeSet) -> Self {
        let address = target.address();
        let device_line = format!("**Device:** `{address}`");

        let markdown = match (outcome.status(), outcome.category()) {
            (OutcomeStatus::Success, _) => {
                let hostname = change_set.hostname().unwrap_or(change_set.expected_marker());
                format!(
                    "{ALERT_HEADER}\n\n{device_line} (Hostname: `{hostname}`)\n\
                     **Status:** SUCCESS ✅. Configuration successfully updated by L1 automation.\n\
                     **Changes:** {}",
                    change_set.summary()
                )
            }
            (OutcomeStatus::Failure, FailureCategory::None) => format!(
                "{ALERT_HEADER}\n\n{device_line}\n\
                 **Status:** FAILURE ❌. Configuration failed to verify. Manual intervention required."
            ),
            (OutcomeStatus::Failure, category) => {
                let heading = match category {
                    FailureCategory::Transport => format!(
                        "**Connection Error** (Check IP, Port {}, and Firewall).",
                        target.port()
                    ),
                    FailureCategory::Protocol => {
                        String::from("**Protocol Error** (Check XML payload/Credentials).")
                    }
                    FailureCategory::Application | FailureCategory::None => {
                        String::from("**Application Error**.")
                    }
                };
                format!(
                    "{ALERT_HEADER}\n\n{device_line}\n**Status:** FAILURE ❌. {heading}\n\
                     **Details:** `{}`",
                    outcome.detail()
                )
            }
        };

        Self {
            address: address.to_string(),
            port: target.port(),
            outcome: outcome.clone(),
            markdown,
        }
    }
}
