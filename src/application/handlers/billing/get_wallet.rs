//! GetWalletHandler - read model for an account's wallet.

use std::sync::Arc;

use crate::domain::billing::{WalletBalance, WalletTransaction};
use crate::domain::foundation::{AccountId, DomainError};
use crate::ports::BillingStore;

/// How many ledger entries a wallet read returns at most.
const TRANSACTION_PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone)]
pub struct GetWalletQuery {
    pub account_id: AccountId,
}

#[derive(Debug, Clone)]
pub struct WalletView {
    pub balance: WalletBalance,
    /// Recent ledger entries, newest first.
    pub transactions: Vec<WalletTransaction>,
}

pub struct GetWalletHandler {
    store: Arc<dyn BillingStore>,
}

impl GetWalletHandler {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, query: GetWalletQuery) -> Result<WalletView, DomainError> {
        let snapshot = self.store.load_snapshot(&query.account_id).await?;
        let transactions = self
            .store
            .wallet_transactions(&query.account_id, TRANSACTION_PAGE_SIZE)
            .await?;
        Ok(WalletView {
            balance: snapshot.wallet,
            transactions,
        })
    }
}
