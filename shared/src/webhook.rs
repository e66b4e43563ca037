use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Rendered notification payload. The sink consumes a plain
/// `{"text": ...}` JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub text: String,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("webhook returned HTTP {0}")]
    Status(StatusCode),
    #[error("failed to reach webhook: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    /// One POST, no retry. Only HTTP 200 counts as delivered; anything else
    /// is surfaced to the caller.
    pub async fn deliver(&self, message: &Message) -> Result<(), DeliveryError> {
        debug!("Posting report to {}", self.url);
        let response = self.client.post(&self.url).json(message).send().await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(DeliveryError::Status(status)),
        }
    }
}
