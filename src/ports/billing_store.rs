//! BillingStore port - atomic storage for events, memberships, and wallets.
//!
//! The store owns the exactly-once guarantee: the event-id claim and
//! every ledger effect of that event go through `commit` as ONE storage
//! transaction. There is no separate "mark processed" step that could
//! be lost after the effects land.
//!
//! ## Why one port instead of three repositories
//!
//! The provider redelivers events freely (timeouts, 5xx responses, lost
//! acks). Splitting the event record and the ledger writes across
//! repositories would leave a window where effects are committed but
//! the dedup marker is not, and a redelivery would double-apply them.

use async_trait::async_trait;

use crate::domain::billing::{
    BillingEvent, Membership, RefundShortfall, WalletBalance, WalletTransaction,
};
use crate::domain::foundation::{AccountId, DomainError, EventId, Timestamp};

/// Current billing state of one account.
///
/// Accounts with no rows yet get synthesized defaults at version 0;
/// the first commit inserts them.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub membership: Membership,
    pub wallet: WalletBalance,
}

/// Ledger writes to apply atomically together with the event claim.
///
/// The `membership` and `wallet` values carry the `version` of the
/// snapshot they were computed from; the store applies them only if
/// that version still holds, bumping it on success.
#[derive(Debug, Clone, Default)]
pub struct CommitWrites {
    pub membership: Option<Membership>,
    pub wallet_transaction: Option<WalletTransaction>,
    pub wallet: Option<WalletBalance>,
    pub shortfall: Option<RefundShortfall>,
}

impl CommitWrites {
    /// No ledger effects; only the event record is written.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.membership.is_none()
            && self.wallet_transaction.is_none()
            && self.wallet.is_none()
            && self.shortfall.is_none()
    }
}

/// Result of an atomic commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitResult {
    /// The event claim and all writes landed.
    Applied,
    /// Another delivery already settled this event id; nothing was
    /// written.
    DuplicateEvent,
}

/// Result of a version-checked sweep downgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DowngradeResult {
    Downgraded,
    /// A concurrent writer moved the row first; left untouched.
    Skipped,
}

/// Port for the billing storage backend.
///
/// Implementations must use database constraints (PRIMARY KEY on
/// event_id, version columns) rather than application locks; several
/// gateway workers may reconcile concurrently.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Finds a recorded event by its provider id.
    ///
    /// Returns `None` if the event has never been seen.
    async fn find_event(&self, event_id: &EventId) -> Result<Option<BillingEvent>, DomainError>;

    /// Loads the account's membership and wallet, synthesizing
    /// version-0 defaults for rows that don't exist yet.
    async fn load_snapshot(&self, account_id: &AccountId) -> Result<AccountSnapshot, DomainError>;

    /// Atomically claims the event id and applies the writes.
    ///
    /// - Returns `DuplicateEvent` when the event id is already settled
    ///   (outcome applied or duplicate); nothing is written.
    /// - An existing record with outcome `failed` does NOT count as
    ///   settled: the commit replaces it, so redelivery can succeed
    ///   after the original cause is fixed.
    /// - Returns a `StorageConflict` error when a version check fails;
    ///   the caller reloads the snapshot and retries.
    async fn commit(
        &self,
        event: &BillingEvent,
        writes: CommitWrites,
    ) -> Result<CommitResult, DomainError>;

    /// Version-checked membership write outside event processing
    /// (cancel / resume requests).
    ///
    /// Returns a `StorageConflict` error when the row's version no
    /// longer matches.
    async fn update_membership(&self, membership: &Membership) -> Result<(), DomainError>;

    /// Paid memberships whose expiry is at or before `now`, oldest
    /// first, up to `limit` rows.
    async fn expired_memberships(
        &self,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<Membership>, DomainError>;

    /// Applies a sweep downgrade if the row's version still matches.
    ///
    /// Unlike `update_membership` this never fails on a version
    /// mismatch; the row was won by a concurrent upgrade and the sweep
    /// simply moves on.
    async fn commit_downgrade(&self, membership: &Membership)
        -> Result<DowngradeResult, DomainError>;

    /// Recent wallet ledger entries for an account, newest first.
    async fn wallet_transactions(
        &self,
        account_id: &AccountId,
        limit: i64,
    ) -> Result<Vec<WalletTransaction>, DomainError>;

    /// Outstanding refund shortfalls, newest first.
    async fn refund_shortfalls(&self, limit: i64) -> Result<Vec<RefundShortfall>, DomainError>;
}
