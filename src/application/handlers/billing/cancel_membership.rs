//! CancelMembershipHandler / ResumeMembershipHandler - user-initiated
//! subscription changes.
//!
//! Both call the provider first and only then touch local state, so a
//! provider failure leaves nothing to undo. The webhook flow stays the
//! source of truth; these writes just make the change visible without
//! waiting for the provider's confirmation event.

use std::sync::Arc;

use crate::domain::billing::Membership;
use crate::domain::foundation::{AccountId, DomainError, Timestamp};
use crate::ports::{BillingProvider, BillingStore};

#[derive(Debug, Clone)]
pub struct CancelMembershipCommand {
    pub account_id: AccountId,
}

#[derive(Debug, Clone)]
pub struct ResumeMembershipCommand {
    pub account_id: AccountId,
}

/// Handler for scheduling a cancellation at period end.
pub struct CancelMembershipHandler {
    store: Arc<dyn BillingStore>,
    provider: Arc<dyn BillingProvider>,
}

impl CancelMembershipHandler {
    pub fn new(store: Arc<dyn BillingStore>, provider: Arc<dyn BillingProvider>) -> Self {
        Self { store, provider }
    }

    pub async fn handle(&self, cmd: CancelMembershipCommand) -> Result<Membership, DomainError> {
        let now = Timestamp::now();
        let mut membership = self.store.load_snapshot(&cmd.account_id).await?.membership;
        membership.schedule_cancel(now)?;

        self.provider.cancel_subscription(&cmd.account_id).await?;
        self.store.update_membership(&membership).await?;
        Ok(membership)
    }
}

/// Handler for undoing a scheduled cancellation.
pub struct ResumeMembershipHandler {
    store: Arc<dyn BillingStore>,
    provider: Arc<dyn BillingProvider>,
}

impl ResumeMembershipHandler {
    pub fn new(store: Arc<dyn BillingStore>, provider: Arc<dyn BillingProvider>) -> Self {
        Self { store, provider }
    }

    pub async fn handle(&self, cmd: ResumeMembershipCommand) -> Result<Membership, DomainError> {
        let now = Timestamp::now();
        let mut membership = self.store.load_snapshot(&cmd.account_id).await?.membership;
        membership.resume(now)?;

        self.provider.resume_subscription(&cmd.account_id).await?;
        self.store.update_membership(&membership).await?;
        Ok(membership)
    }
}
