//! Wallet ledger entities.
//!
//! The wallet is an append-only log of signed transactions plus a
//! materialized balance. The balance must always equal the sum of the
//! log; it exists so reads and the refund clamp don't scan the log.
//!
//! All monetary values are i64 cents.

use crate::domain::foundation::{
    AccountId, DomainError, ErrorCode, EventId, Timestamp, TransactionId,
};
use serde::{Deserialize, Serialize};

/// Why a wallet transaction exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionReason {
    /// Prepaid credit purchased through the provider.
    CreditPurchase,
    /// Debit reversing a refunded credit purchase.
    RefundDebit,
    /// Administrative adjustment (either sign).
    AdminAdjustment,
}

impl TransactionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditPurchase => "credit_purchase",
            Self::RefundDebit => "refund_debit",
            Self::AdminAdjustment => "admin_adjustment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "credit_purchase" => Some(Self::CreditPurchase),
            "refund_debit" => Some(Self::RefundDebit),
            "admin_adjustment" => Some(Self::AdminAdjustment),
            _ => None,
        }
    }
}

/// One immutable entry in the wallet ledger.
///
/// Positive amounts credit the wallet, negative amounts debit it.
/// Every entry points back at the billing event that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    /// The billing event this entry settles.
    pub source_event_id: EventId,
    /// Signed amount in cents. Never zero.
    pub amount_cents: i64,
    pub reason: TransactionReason,
    pub created_at: Timestamp,
}

impl WalletTransaction {
    /// Creates a credit entry. Amount must be positive.
    pub fn credit(
        account_id: AccountId,
        source_event_id: EventId,
        amount_cents: i64,
        reason: TransactionReason,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if amount_cents <= 0 {
            return Err(DomainError::validation(
                "amount_cents",
                format!("Credit must be positive, got {}", amount_cents),
            ));
        }
        Ok(Self {
            id: TransactionId::new(),
            account_id,
            source_event_id,
            amount_cents,
            reason,
            created_at: now,
        })
    }

    /// Creates a debit entry. Amount is the positive number of cents to
    /// remove; the stored amount is negative.
    pub fn debit(
        account_id: AccountId,
        source_event_id: EventId,
        amount_cents: i64,
        reason: TransactionReason,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if amount_cents <= 0 {
            return Err(DomainError::validation(
                "amount_cents",
                format!("Debit must be positive, got {}", amount_cents),
            ));
        }
        Ok(Self {
            id: TransactionId::new(),
            account_id,
            source_event_id,
            amount_cents: -amount_cents,
            reason,
            created_at: now,
        })
    }
}

/// Materialized wallet balance for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub account_id: AccountId,
    /// Current balance in cents. Never negative.
    pub balance_cents: i64,
    /// Number of ledger entries behind this balance.
    pub transaction_count: i64,
    /// Optimistic-lock version, bumped by the store on every commit.
    pub version: i64,
    pub updated_at: Timestamp,
}

impl WalletBalance {
    /// Creates the zero balance for an account with no ledger history.
    pub fn zero(account_id: AccountId) -> Self {
        Self {
            account_id,
            balance_cents: 0,
            transaction_count: 0,
            version: 0,
            updated_at: Timestamp::now(),
        }
    }

    /// Folds one ledger entry into the balance.
    ///
    /// Rejects any entry that would take the balance negative; callers
    /// clamp refund debits before reaching here.
    pub fn apply(&mut self, tx: &WalletTransaction) -> Result<(), DomainError> {
        let new_balance = self.balance_cents + tx.amount_cents;
        if new_balance < 0 {
            return Err(DomainError::new(
                ErrorCode::InsufficientBalance,
                format!(
                    "Entry of {} cents would take balance {} negative",
                    tx.amount_cents, self.balance_cents
                ),
            )
            .with_detail("account_id", self.account_id.to_string()));
        }
        self.balance_cents = new_balance;
        self.transaction_count += 1;
        self.updated_at = tx.created_at;
        Ok(())
    }
}

/// Record of a refund that could not be fully debited.
///
/// Persisted in the same commit as the clamped debit so operators can
/// settle the difference out of band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundShortfall {
    pub account_id: AccountId,
    pub source_event_id: EventId,
    /// What the provider refunded.
    pub requested_cents: i64,
    /// What the wallet could cover.
    pub debited_cents: i64,
    pub created_at: Timestamp,
}

impl RefundShortfall {
    /// Cents the wallet could not cover.
    pub fn missing_cents(&self) -> i64 {
        self.requested_cents - self.debited_cents
    }
}

/// Clamps a refund debit at the available balance.
///
/// Returns the cents to actually debit and the cents left uncovered.
pub fn clamp_refund_debit(balance_cents: i64, requested_cents: i64) -> (i64, i64) {
    let debit = requested_cents.min(balance_cents).max(0);
    (debit, requested_cents - debit)
}
