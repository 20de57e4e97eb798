//! GetMembershipHandler - read model for an account's membership.

use std::sync::Arc;

use crate::domain::billing::{LevelFeatures, Membership, MembershipLevel, MembershipState};
use crate::domain::foundation::{AccountId, DomainError, Timestamp};
use crate::ports::BillingStore;

/// Query for one account's membership.
#[derive(Debug, Clone)]
pub struct GetMembershipQuery {
    pub account_id: AccountId,
}

/// Membership as clients see it: the derived state, never raw rows.
#[derive(Debug, Clone)]
pub struct MembershipView {
    pub account_id: AccountId,
    pub level: MembershipLevel,
    pub state: MembershipState,
    pub expires_at: Option<Timestamp>,
    pub days_remaining: u32,
    pub cancel_at_period_end: bool,
    pub features: &'static LevelFeatures,
}

impl MembershipView {
    fn project(membership: Membership, now: Timestamp) -> Self {
        let state = membership.state(now);
        // A lapsed paid row reads as free until the sweep catches it.
        let level = match state {
            MembershipState::Free => MembershipLevel::Free,
            _ => membership.level,
        };
        Self {
            days_remaining: membership.days_remaining(now),
            expires_at: membership.expires_at,
            cancel_at_period_end: membership.cancel_at_period_end,
            features: level.features(),
            account_id: membership.account_id,
            level,
            state,
        }
    }
}

/// Handler for membership reads.
pub struct GetMembershipHandler {
    store: Arc<dyn BillingStore>,
}

impl GetMembershipHandler {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    /// Accounts with no membership row read as free rather than 404;
    /// every account has a membership, most just never paid.
    pub async fn handle(&self, query: GetMembershipQuery) -> Result<MembershipView, DomainError> {
        let snapshot = self.store.load_snapshot(&query.account_id).await?;
        Ok(MembershipView::project(snapshot.membership, Timestamp::now()))
    }
}
