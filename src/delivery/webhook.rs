use crate::config::WebhookConfig;
use crate::error::{AppError, Result};
use crate::models::EnrichmentResult;
use reqwest::Client;
use std::time::Duration;

/// Posts enrichment results to caller-supplied callbacks
#[derive(Clone)]
pub struct WebhookSender {
    pub(crate) client: Client,
    pub(crate) timeout_secs: u64,
}

impl WebhookSender {
    /// Create a new webhook sender; a zero timeout leaves requests unbounded
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self> {
        let mut builder = Client::builder().user_agent(user_agent);
        if timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }

        let client = builder
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &WebhookConfig) -> Result<Self> {
        Self::new(config.timeout_secs, &config.user_agent)
    }

    /// POST one result as `{"Report", "Errors"}`; any non-2xx status is a failure
    pub async fn send(&self, url: &str, result: &EnrichmentResult) -> Result<()> {
        let response = self
            .client
            .post(url)
            .json(result)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(format!(
                        "Webhook request timed out after {} seconds",
                        self.timeout_secs
                    ))
                } else if e.is_connect() {
                    AppError::Network(format!("Failed to connect to webhook URL: {}", e))
                } else {
                    AppError::Network(format!("Webhook request failed: {}", e))
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Network(format!(
                "Webhook returned non-success status {}: {}",
                status,
                if body.is_empty() {
                    "No response body"
                } else {
                    &body
                }
            )));
        }

        Ok(())
    }
}
