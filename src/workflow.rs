//! Workflow orchestrator for a configuration change.
//!
//! This module runs the single forward path of a change: connect, snapshot
//! before, apply, snapshot after, verify, then notify. Device failures never
//! escape; they end the path early and become the run's outcome.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::device::{ApplyResult, ConfigChangeSet, DeviceConnector, DeviceSession, TargetDevice};
use crate::error::DeviceError;
use crate::notify::Notifier;
use crate::outcome::{NotificationPayload, WorkflowOutcome, classify, classify_failure};
use crate::snapshot::{ConfigSnapshot, verify};

/// Stages a run passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    /// Not started.
    Idle,
    /// Opening the device session.
    Connecting,
    /// Reading the configuration before the change.
    SnapshotBefore,
    /// Sending the change set.
    Applying,
    /// Reading the configuration after the change.
    SnapshotAfter,
    /// Checking for the marker.
    Verifying,
    /// Verified.
    Succeeded,
    /// Stopped by a failure or a missing marker.
    Failed,
    /// Notification attempted.
    Notified,
    /// Finished.
    Done,
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::SnapshotBefore => "snapshot-before",
            Self::Applying => "applying",
            Self::SnapshotAfter => "snapshot-after",
            Self::Verifying => "verifying",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Notified => "notified",
            Self::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// Result of the notification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationStatus {
    /// The notifier accepted the payload.
    Delivered,
    /// Delivery failed; the outcome is unaffected.
    Failed {
        /// Delivery error.
        error: String,
    },
}

/// Everything known about a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// Target device.
    pub target: TargetDevice,
    /// Run outcome.
    pub outcome: WorkflowOutcome,
    /// Configuration before the change.
    pub before: Option<ConfigSnapshot>,
    /// Configuration after the change.
    pub after: Option<ConfigSnapshot>,
    /// `edit-config` result.
    pub applied: Option<ApplyResult>,
    /// Stages entered, in order.
    pub stages: Vec<WorkflowStage>,
    /// Notification result.
    pub notification: NotificationStatus,
    /// Host the run was started from.
    pub initiated_from: String,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// Finish time.
    pub finished_at: DateTime<Utc>,
}

impl WorkflowReport {
    /// Whether the running configuration changed, when both snapshots exist.
    #[must_use]
    pub fn config_changed(&self) -> Option<bool> {
        match (&self.before, &self.after) {
            (Some(before), Some(after)) => Some(before.differs_from(after)),
            _ => None,
        }
    }
}

/// Data gathered while the device session is open.
#[derive(Debug, Default)]
struct Progress {
    stages: Vec<WorkflowStage>,
    before: Option<ConfigSnapshot>,
    after: Option<ConfigSnapshot>,
    applied: Option<ApplyResult>,
}

impl Progress {
    fn enter(&mut self, stage: WorkflowStage) {
        info!("Workflow stage: {stage}");
        self.stages.push(stage);
    }
}

/// Runs configuration changes against devices.
pub struct WorkflowOrchestrator<'a, C: DeviceConnector, N: Notifier> {
    /// Session factory.
    connector: &'a C,
    /// Notification backend.
    notifier: &'a N,
    /// Changes to apply.
    change_set: &'a ConfigChangeSet,
}

impl<'a, C: DeviceConnector, N: Notifier> WorkflowOrchestrator<'a, C, N> {
    /// Creates an orchestrator.
    #[must_use]
    pub const fn new(connector: &'a C, notifier: &'a N, change_set: &'a ConfigChangeSet) -> Self {
        Self {
            connector,
            notifier,
            change_set,
        }
    }

    /// Runs the full workflow against `target`.
    ///
    /// Never fails: device errors become the report's outcome and
    /// notification errors are recorded in the report.
    pub async fn run(&self, target: &TargetDevice) -> WorkflowReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("Starting run {run_id} against {}", target.endpoint());

        let mut progress = Progress::default();
        progress.enter(WorkflowStage::Idle);

        let outcome = match self.execute(target, &mut progress).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Workflow stopped: {e}");
                classify_failure(&e)
            }
        };

        if outcome.is_success() {
            info!("Configuration verified on {}", target.address());
            progress.enter(WorkflowStage::Succeeded);
        } else {
            warn!("Run failed: {outcome}");
            progress.enter(WorkflowStage::Failed);
        }

        let payload = NotificationPayload::build(target, &outcome, self.change_set);
        let notification = match self.notifier.notify(&payload).await {
            Ok(()) => {
                info!("Notification sent");
                NotificationStatus::Delivered
            }
            Err(e) => {
                error!("Failed to send notification: {e}");
                NotificationStatus::Failed {
                    error: e.to_string(),
                }
            }
        };
        progress.enter(WorkflowStage::Notified);
        progress.enter(WorkflowStage::Done);

        WorkflowReport {
            run_id,
            target: target.clone(),
            outcome,
            before: progress.before,
            after: progress.after,
            applied: progress.applied,
            stages: progress.stages,
            notification,
            initiated_from: local_hostname(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Reads the current configuration without changing or notifying.
    ///
    /// # Errors
    ///
    /// Returns the device error if connecting or reading fails.
    pub async fn capture_snapshot(&self, target: &TargetDevice) -> Result<ConfigSnapshot, DeviceError> {
        info!("Capturing configuration from {}", target.endpoint());

        let mut session = self.connector.connect(target).await?;
        let result = session.get_config(&self.change_set.filter()).await;
        close_session(session.as_mut()).await;

        Ok(ConfigSnapshot::capture(result?))
    }

    async fn execute(
        &self,
        target: &TargetDevice,
        progress: &mut Progress,
    ) -> Result<WorkflowOutcome, DeviceError> {
        progress.enter(WorkflowStage::Connecting);
        let mut session = self.connector.connect(target).await?;
        info!("Connected to {}", target.endpoint());

        let result = self.apply_and_verify(session.as_mut(), progress).await;
        close_session(session.as_mut()).await;

        result
    }

    async fn apply_and_verify(
        &self,
        session: &mut dyn DeviceSession,
        progress: &mut Progress,
    ) -> Result<WorkflowOutcome, DeviceError> {
        let filter = self.change_set.filter();

        progress.enter(WorkflowStage::SnapshotBefore);
        let before = ConfigSnapshot::capture(session.get_config(&filter).await?);
        debug!("Configuration before change:\n{}", before.rendered());
        progress.before = Some(before);

        progress.enter(WorkflowStage::Applying);
        info!("Applying {} edits", self.change_set.edit_count());
        let applied = session.apply_config(self.change_set).await?;
        if !applied.ok {
            warn!("edit-config reply carried no <ok/>, verifying anyway");
        }
        progress.applied = Some(applied);

        progress.enter(WorkflowStage::SnapshotAfter);
        let after = ConfigSnapshot::capture(session.get_config(&filter).await?);
        debug!("Configuration after change:\n{}", after.rendered());

        progress.enter(WorkflowStage::Verifying);
        let verified = verify(after.rendered(), self.change_set.expected_marker());
        progress.after = Some(after);

        Ok(classify(verified))
    }
}

fn local_hostname() -> String {
    hostname::get().map_or_else(|_| String::from("unknown"), |h| h.to_string_lossy().to_string())
}

async fn close_session(session: &mut dyn DeviceSession) {
    match session.close().await {
        Ok(()) => debug!("Device session closed"),
        Err(e) => warn!("Failed to close device session: {e}"),
    }
}
