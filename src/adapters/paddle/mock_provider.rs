//! Mock billing provider for tests and local development.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::AccountId;
use crate::ports::{BillingProvider, ProviderError};

/// In-process BillingProvider that records calls instead of making them.
#[derive(Default)]
pub struct MockBillingProvider {
    cancel_calls: AtomicU32,
    resume_calls: AtomicU32,
    failure: Mutex<Option<ProviderError>>,
}

impl MockBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call return the given error.
    pub fn failing_with(self, error: ProviderError) -> Self {
        *self.failure.lock().unwrap() = Some(error);
        self
    }

    pub fn cancel_call_count(&self) -> u32 {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    pub fn resume_call_count(&self) -> u32 {
        self.resume_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), ProviderError> {
        match self.failure.lock().unwrap().as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BillingProvider for MockBillingProvider {
    async fn cancel_subscription(&self, _account_id: &AccountId) -> Result<(), ProviderError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()
    }

    async fn resume_subscription(&self, _account_id: &AccountId) -> Result<(), ProviderError> {
        self.resume_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls() {
        let provider = MockBillingProvider::new();
        let account = AccountId::new("acct-1").unwrap();

        provider.cancel_subscription(&account).await.unwrap();
        provider.cancel_subscription(&account).await.unwrap();
        provider.resume_subscription(&account).await.unwrap();

        assert_eq!(provider.cancel_call_count(), 2);
        assert_eq!(provider.resume_call_count(), 1);
    }

    #[tokio::test]
    async fn failing_provider_returns_configured_error() {
        let provider =
            MockBillingProvider::new().failing_with(ProviderError::transient("unreachable"));
        let account = AccountId::new("acct-1").unwrap();

        let err = provider.cancel_subscription(&account).await.unwrap_err();
        assert!(err.retryable);
        assert_eq!(provider.cancel_call_count(), 1);
    }
}
