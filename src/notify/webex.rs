//! Webex Teams messages API notifier.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::NotifyError;
use crate::outcome::NotificationPayload;

use super::Notifier;

/// Public Webex API base URL.
pub const DEFAULT_WEBEX_API_URL: &str = "https://api.webex.com/v1";

/// Request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageRequest<'a> {
    room_id: &'a str,
    markdown: &'a str,
}

/// Posts markdown messages to a Webex room.
#[derive(Clone)]
pub struct WebexNotifier {
    client: Client,
    api_url: String,
    token: String,
    room_id: String,
}

impl std::fmt::Debug for WebexNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebexNotifier")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .field("room_id", &self.room_id)
            .finish_non_exhaustive()
    }
}

impl WebexNotifier {
    /// Creates a notifier posting to `{api_url}/messages`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_url: &str, token: &str, room_id: &str) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| NotifyError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            room_id: room_id.to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.api_url)
    }
}

#[async_trait]
impl Notifier for WebexNotifier {
    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        let request = MessageRequest {
            room_id: &self.room_id,
            markdown: &payload.markdown,
        };
        trace!("Posting Webex message: {}", payload.markdown);

        let response = self
            .client
            .post(self.messages_url())
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&request)
            .send()
            .await
            .map_err(|e| NotifyError::network(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        debug!("Webex notification accepted ({status})");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ConfigChangeSet, Credentials, TargetDevice};
    use crate::outcome::classify;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload() -> NotificationPayload {
        let target = TargetDevice::new("192.168.1.10", 830, "iosxe", Credentials::default());
        NotificationPayload::build(&target, &classify(true), &ConfigChangeSet::standard())
    }

    #[tokio::test]
    async fn test_posts_markdown_to_room() {
        let server = MockServer::start().await;
        let payload = payload();

        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header_eq("authorization", "Bearer secret-token"))
            .and(body_partial_json(json!({
                "roomId": "room-42",
                "markdown": payload.markdown,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg-1" })))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebexNotifier::new(&format!("{}/", server.uri()), "secret-token", "room-42").unwrap();
        notifier.notify(&payload).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_request_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let notifier = WebexNotifier::new(&server.uri(), "bad", "room-42").unwrap();
        let err = notifier.notify(&payload()).await.unwrap_err();

        assert!(matches!(
            err,
            NotifyError::Rejected { status: 401, ref message } if message == "invalid token"
        ));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_network_error() {
        let notifier = WebexNotifier::new("http://127.0.0.1:1", "t", "r").unwrap();
        let err = notifier.notify(&payload()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Network { .. }));
    }

    #[test]
    fn test_debug_redacts_token() {
        let notifier = WebexNotifier::new(DEFAULT_WEBEX_API_URL, "secret-token", "room").unwrap();
        assert!(!format!("{notifier:?}").contains("secret-token"));
    }
}
