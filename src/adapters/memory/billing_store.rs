//! In-memory implementation of BillingStore.
//!
//! Backs local development and the test suites. One mutex guards all
//! tables so a commit is atomic exactly like the Postgres transaction
//! it stands in for, including the version checks.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::billing::{
    BillingEvent, EventOutcome, Membership, RefundShortfall, WalletBalance, WalletTransaction,
};
use crate::domain::foundation::{AccountId, DomainError, EventId, Timestamp};
use crate::ports::{
    AccountSnapshot, BillingStore, CommitResult, CommitWrites, DowngradeResult,
};

#[derive(Default)]
struct Tables {
    events: HashMap<EventId, BillingEvent>,
    memberships: HashMap<AccountId, Membership>,
    wallets: HashMap<AccountId, WalletBalance>,
    transactions: Vec<WalletTransaction>,
    shortfalls: Vec<RefundShortfall>,
}

/// In-memory BillingStore with the same commit semantics as Postgres.
pub struct InMemoryBillingStore {
    tables: Mutex<Tables>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Number of recorded events. Test helper.
    pub async fn event_count(&self) -> usize {
        self.tables.lock().await.events.len()
    }
}

impl Default for InMemoryBillingStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies a version-checked membership upsert, mirroring
/// `INSERT ... ON CONFLICT DO UPDATE ... WHERE version = expected`.
fn put_membership(tables: &mut Tables, membership: &Membership) -> Result<(), DomainError> {
    let current_version = tables
        .memberships
        .get(&membership.account_id)
        .map(|m| m.version)
        .unwrap_or(0);
    if current_version != membership.version {
        return Err(DomainError::conflict(format!(
            "membership for {} moved from version {} to {}",
            membership.account_id, membership.version, current_version
        )));
    }
    let mut stored = membership.clone();
    stored.version += 1;
    tables.memberships.insert(stored.account_id.clone(), stored);
    Ok(())
}

fn put_wallet(tables: &mut Tables, wallet: &WalletBalance) -> Result<(), DomainError> {
    let current_version = tables
        .wallets
        .get(&wallet.account_id)
        .map(|w| w.version)
        .unwrap_or(0);
    if current_version != wallet.version {
        return Err(DomainError::conflict(format!(
            "wallet for {} moved from version {} to {}",
            wallet.account_id, wallet.version, current_version
        )));
    }
    let mut stored = wallet.clone();
    stored.version += 1;
    tables.wallets.insert(stored.account_id.clone(), stored);
    Ok(())
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn find_event(&self, event_id: &EventId) -> Result<Option<BillingEvent>, DomainError> {
        let tables = self.tables.lock().await;
        Ok(tables.events.get(event_id).cloned())
    }

    async fn load_snapshot(&self, account_id: &AccountId) -> Result<AccountSnapshot, DomainError> {
        let tables = self.tables.lock().await;
        Ok(AccountSnapshot {
            membership: tables
                .memberships
                .get(account_id)
                .cloned()
                .unwrap_or_else(|| Membership::free(account_id.clone())),
            wallet: tables
                .wallets
                .get(account_id)
                .cloned()
                .unwrap_or_else(|| WalletBalance::zero(account_id.clone())),
        })
    }

    async fn commit(
        &self,
        event: &BillingEvent,
        writes: CommitWrites,
    ) -> Result<CommitResult, DomainError> {
        let mut tables = self.tables.lock().await;

        // Event-id claim. Failed records are replaceable.
        if let Some(existing) = tables.events.get(&event.event_id) {
            if existing.outcome != Some(EventOutcome::Failed) {
                return Ok(CommitResult::DuplicateEvent);
            }
        }

        // Version checks before any mutation so a conflict leaves the
        // store untouched, like a rolled-back transaction.
        if let Some(membership) = &writes.membership {
            let current = tables
                .memberships
                .get(&membership.account_id)
                .map(|m| m.version)
                .unwrap_or(0);
            if current != membership.version {
                return Err(DomainError::conflict(format!(
                    "membership for {} moved from version {} to {}",
                    membership.account_id, membership.version, current
                )));
            }
        }
        if let Some(wallet) = &writes.wallet {
            let current = tables
                .wallets
                .get(&wallet.account_id)
                .map(|w| w.version)
                .unwrap_or(0);
            if current != wallet.version {
                return Err(DomainError::conflict(format!(
                    "wallet for {} moved from version {} to {}",
                    wallet.account_id, wallet.version, current
                )));
            }
        }

        tables.events.insert(event.event_id.clone(), event.clone());
        if let Some(membership) = &writes.membership {
            put_membership(&mut tables, membership)?;
        }
        if let Some(wallet) = &writes.wallet {
            put_wallet(&mut tables, wallet)?;
        }
        if let Some(tx) = writes.wallet_transaction {
            tables.transactions.push(tx);
        }
        if let Some(shortfall) = writes.shortfall {
            tables.shortfalls.push(shortfall);
        }
        Ok(CommitResult::Applied)
    }

    async fn update_membership(&self, membership: &Membership) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().await;
        put_membership(&mut tables, membership)
    }

    async fn expired_memberships(
        &self,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<Membership>, DomainError> {
        let tables = self.tables.lock().await;
        let mut expired: Vec<Membership> = tables
            .memberships
            .values()
            .filter(|m| m.level.is_paid() && m.is_expired(now))
            .cloned()
            .collect();
        expired.sort_by_key(|m| m.expires_at);
        expired.truncate(limit.max(0) as usize);
        Ok(expired)
    }

    async fn commit_downgrade(
        &self,
        membership: &Membership,
    ) -> Result<DowngradeResult, DomainError> {
        let mut tables = self.tables.lock().await;
        let current_version = tables
            .memberships
            .get(&membership.account_id)
            .map(|m| m.version)
            .unwrap_or(0);
        if current_version != membership.version {
            return Ok(DowngradeResult::Skipped);
        }
        let mut stored = membership.clone();
        stored.version += 1;
        tables.memberships.insert(stored.account_id.clone(), stored);
        Ok(DowngradeResult::Downgraded)
    }

    async fn wallet_transactions(
        &self,
        account_id: &AccountId,
        limit: i64,
    ) -> Result<Vec<WalletTransaction>, DomainError> {
        let tables = self.tables.lock().await;
        let mut entries: Vec<WalletTransaction> = tables
            .transactions
            .iter()
            .filter(|tx| &tx.account_id == account_id)
            .cloned()
            .collect();
        entries.reverse();
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn refund_shortfalls(&self, limit: i64) -> Result<Vec<RefundShortfall>, DomainError> {
        let tables = self.tables.lock().await;
        let mut entries: Vec<RefundShortfall> = tables.shortfalls.clone();
        entries.reverse();
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }
}
