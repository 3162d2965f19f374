//! Webhook notification

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::gazette::error::CrawlError;

/// Body posted to the webhook when a matching edition is found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Link to the edition
    pub url: String,

    /// Text sent along with the link
    #[serde(rename = "rawDoc")]
    pub raw_doc: String,
}

/// Delivers a [`WebhookPayload`]
pub trait Notifier: Send + Sync {
    /// Deliver `payload` once; any non-2xx answer is a failure
    fn send(&self, payload: &WebhookPayload) -> impl Future<Output = Result<(), CrawlError>> + Send;
}

/// [`Notifier`] posting JSON to a fixed endpoint
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    endpoint: String,
}

impl WebhookNotifier {
    /// Create a notifier for `endpoint` whose requests give up after `timeout`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CrawlError::Notify(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl Notifier for WebhookNotifier {
    #[instrument(skip(self, payload), fields(url = %payload.url), level = "debug")]
    async fn send(&self, payload: &WebhookPayload) -> Result<(), CrawlError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| CrawlError::Notify(format!("failed to send webhook request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Notify(format!(
                "webhook returned non-success status: {}",
                status.as_u16()
            )));
        }

        debug!(status = status.as_u16(), "Webhook accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gazette::GazetteConfig;
    use mockito::{Matcher, Server};
    use std::time::Instant;

    fn payload() -> WebhookPayload {
        WebhookPayload {
            url: "https://dom.example/dom/edicao/1500".to_string(),
            raw_doc: "DOM Nº 1500".to_string(),
        }
    }

    #[test]
    fn test_payload_wire_format() {
        let json = serde_json::to_value(payload()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "url": "https://dom.example/dom/edicao/1500",
                "rawDoc": "DOM Nº 1500",
            })
        );
    }

    #[tokio::test]
    async fn test_send_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/webhook")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::to_value(payload()).unwrap()))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let notifier =
            WebhookNotifier::new(format!("{}/webhook", server.url()), Duration::from_secs(5))
                .unwrap();
        notifier.send(&payload()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_server_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/webhook")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let notifier =
            WebhookNotifier::new(format!("{}/webhook", server.url()), Duration::from_secs(5))
                .unwrap();
        let result = notifier.send(&payload()).await;

        match result {
            Err(CrawlError::Notify(message)) => assert!(message.contains("500")),
            other => panic!("Expected notify error, got {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = GazetteConfig::builder()
            .webhook_url(format!("http://{}/webhook", addr))
            .request_timeout_secs(1)
            .build();
        let notifier = WebhookNotifier::new(config.webhook_url.clone(), config.request_timeout()).unwrap();

        let started = Instant::now();
        let result = notifier.send(&payload()).await;

        assert!(matches!(result, Err(CrawlError::Notify(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
        server.abort();
    }

    #[tokio::test]
    async fn test_send_unreachable() {
        let notifier =
            WebhookNotifier::new("http://127.0.0.1:9/webhook", Duration::from_secs(5)).unwrap();
        let result = notifier.send(&payload()).await;
        assert!(matches!(result, Err(CrawlError::Notify(_))));
    }
}
