//! Paddle payment provider adapter.
//!
//! Implements the `BillingProvider` trait for Paddle's subscription
//! API. Webhook verification lives in the domain
//! (`PaddleWebhookVerifier`); this adapter only covers the outbound
//! calls: scheduling a cancellation at period end and undoing one.
//!
//! # Security
//!
//! - API key handled via `secrecy::SecretString`

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::foundation::AccountId;
use crate::ports::{BillingProvider, ProviderError};

/// Statuses worth retrying before giving up on a call.
const RETRYABLE_STATUS: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Attempts per outbound call, including the first.
const MAX_ATTEMPTS: u32 = 3;

/// Base delay between attempts, doubled each retry.
const RETRY_BASE_DELAY_MS: u64 = 250;

/// Paddle API configuration.
#[derive(Clone)]
pub struct PaddleConfig {
    /// Paddle secret API key.
    api_key: SecretString,

    /// Base URL for the Paddle API (default: https://api.paddle.com).
    api_base_url: String,
}

impl PaddleConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: "https://api.paddle.com".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Paddle billing provider adapter.
pub struct PaddleClient {
    config: PaddleConfig,
    http_client: reqwest::Client,
}

impl PaddleClient {
    pub fn new(config: PaddleConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn is_retryable_status(status: reqwest::StatusCode) -> bool {
        RETRYABLE_STATUS.contains(&status.as_u16())
    }

    /// POSTs a subscription action, retrying transient failures with
    /// exponential backoff.
    async fn post_with_retry(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<(), ProviderError> {
        let mut last_error = ProviderError::transient("no attempts made");

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = RETRY_BASE_DELAY_MS * (1 << (attempt - 1));
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }

            let response = self
                .http_client
                .post(url)
                .bearer_auth(self.config.api_key.expose_secret())
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(url, attempt, error = %e, "Paddle request failed");
                    last_error = ProviderError::transient(format!("Network error: {}", e));
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(());
            }

            let error_text = response.text().await.unwrap_or_default();
            if Self::is_retryable_status(status) {
                tracing::warn!(url, attempt, %status, "Paddle returned retryable status");
                last_error = ProviderError::transient(format!(
                    "Paddle API error ({}): {}",
                    status, error_text
                ))
                .with_provider_code(status.as_u16().to_string());
                continue;
            }

            tracing::error!(url, %status, error = %error_text, "Paddle call rejected");
            return Err(ProviderError::permanent(format!(
                "Paddle API error ({}): {}",
                status, error_text
            ))
            .with_provider_code(status.as_u16().to_string()));
        }

        Err(last_error)
    }
}

#[async_trait]
impl BillingProvider for PaddleClient {
    async fn cancel_subscription(&self, account_id: &AccountId) -> Result<(), ProviderError> {
        let url = format!(
            "{}/subscriptions/{}/cancel",
            self.config.api_base_url,
            account_id.as_str()
        );
        self.post_with_retry(
            &url,
            serde_json::json!({"effective_from": "next_billing_period"}),
        )
        .await
    }

    async fn resume_subscription(&self, account_id: &AccountId) -> Result<(), ProviderError> {
        let url = format!(
            "{}/subscriptions/{}/resume",
            self.config.api_base_url,
            account_id.as_str()
        );
        self.post_with_retry(
            &url,
            serde_json::json!({"effective_from": "immediately"}),
        )
        .await
    }
}
