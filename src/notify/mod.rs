//! Notification delivery.
//!
//! The workflow reports every finished run through a [`Notifier`]. Two
//! backends exist: the Webex Teams messages API and a log-only notifier.

mod webex;

use async_trait::async_trait;
use tracing::info;

use crate::error::NotifyError;
use crate::outcome::NotificationPayload;

pub use webex::{DEFAULT_WEBEX_API_URL, WebexNotifier};

/// Delivers notification payloads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends `payload`.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails. Callers log it and carry on.
    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError>;
}

#[async_trait]
impl Notifier for Box<dyn Notifier> {
    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        self.as_ref().notify(payload).await
    }
}

/// Writes the notification to the log instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        info!(
            "Notification for {}:{} ({}):\n{}",
            payload.address, payload.port, payload.outcome, payload.markdown
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ConfigChangeSet, Credentials, TargetDevice};
    use crate::outcome::classify;

    fn payload() -> NotificationPayload {
        let target = TargetDevice::new("10.1.1.1", 830, "iosxe", Credentials::default());
        NotificationPayload::build(&target, &classify(true), &ConfigChangeSet::standard())
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        assert!(LogNotifier.notify(&payload()).await.is_ok());
    }

    #[tokio::test]
    async fn test_boxed_notifier_delegates() {
        let mut mock = MockNotifier::new();
        mock.expect_notify()
            .withf(|p| p.address == "10.1.1.1")
            .times(1)
            .returning(|_| Ok(()));

        let boxed: Box<dyn Notifier> = Box::new(mock);
        assert!(boxed.notify(&payload()).await.is_ok());
    }
}
