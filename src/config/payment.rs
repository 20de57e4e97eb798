//! Payment configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Payment configuration (Paddle)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Paddle API key for outbound calls
    pub paddle_api_key: String,

    /// Paddle webhook signing secret
    pub paddle_webhook_secret: String,

    /// Override for the Paddle API base URL (sandbox/testing)
    pub paddle_api_base_url: Option<String>,
}

impl PaymentConfig {
    /// Check if pointed at the Paddle sandbox
    pub fn is_sandbox(&self) -> bool {
        self.paddle_api_base_url
            .as_deref()
            .map(|url| url.contains("sandbox"))
            .unwrap_or(false)
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.paddle_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PADDLE_API_KEY"));
        }
        if self.paddle_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("PADDLE_WEBHOOK_SECRET"));
        }

        // Verify key prefixes for safety
        if !self.paddle_api_key.starts_with("pdl_") {
            return Err(ValidationError::InvalidPaddleKey);
        }

        Ok(())
    }
}
