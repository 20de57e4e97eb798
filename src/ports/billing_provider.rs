//! BillingProvider port - outbound calls to the payment provider.
//!
//! The webhook flow is inbound only; this port covers the small
//! outbound surface the system needs: asking the provider to schedule
//! or undo a subscription cancellation when a merchant requests it
//! through us instead of the provider's own portal.

use async_trait::async_trait;

use crate::domain::foundation::{AccountId, DomainError, ErrorCode};

/// Port for the outbound payment provider API.
///
/// Operations are idempotent on the provider side and safe to retry.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Asks the provider to cancel the account's subscription at the
    /// end of the current period.
    async fn cancel_subscription(&self, account_id: &AccountId) -> Result<(), ProviderError>;

    /// Asks the provider to undo a scheduled cancellation while the
    /// period is still running.
    async fn resume_subscription(&self, account_id: &AccountId) -> Result<(), ProviderError>;
}

/// Error from an outbound provider call.
#[derive(Debug, Clone)]
pub struct ProviderError {
    /// Human-readable message.
    pub message: String,

    /// Provider's error code, when the response carried one.
    pub provider_code: Option<String>,

    /// Whether the call may succeed on retry.
    pub retryable: bool,
}

impl ProviderError {
    /// Creates a transient error (network failure, 5xx, rate limit).
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            provider_code: None,
            retryable: true,
        }
    }

    /// Creates a permanent error (4xx the provider will keep returning).
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            provider_code: None,
            retryable: false,
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.provider_code {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<ProviderError> for DomainError {
    fn from(err: ProviderError) -> Self {
        let code = if err.retryable {
            ErrorCode::DownstreamUnavailable
        } else {
            ErrorCode::ProviderError
        };
        let mut domain_err = DomainError::new(code, err.message);
        if let Some(provider_code) = err.provider_code {
            domain_err = domain_err.with_detail("provider_code", provider_code);
        }
        domain_err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billing_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn BillingProvider) {}
    }

    #[test]
    fn transient_errors_are_retryable() {
        assert!(ProviderError::transient("timeout").retryable);
        assert!(!ProviderError::permanent("no such subscription").retryable);
    }

    #[test]
    fn display_includes_provider_code() {
        let err = ProviderError::permanent("rejected").with_provider_code("subscription_locked");
        assert_eq!(err.to_string(), "rejected (subscription_locked)");
    }

    #[test]
    fn conversion_maps_retryability_to_error_code() {
        let transient: DomainError = ProviderError::transient("down").into();
        assert_eq!(transient.code, ErrorCode::DownstreamUnavailable);

        let permanent: DomainError = ProviderError::permanent("bad request").into();
        assert_eq!(permanent.code, ErrorCode::ProviderError);
    }
}
