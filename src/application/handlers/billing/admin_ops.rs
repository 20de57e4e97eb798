//! Administrative force operations.
//!
//! Support tooling needs to set state directly when the provider and
//! our ledger disagree. Every force op still flows through the
//! reconciler's atomic commit, leaving an `adm_`-prefixed synthetic
//! event in the store as the audit trail.

use std::sync::Arc;

use crate::domain::billing::{
    ExpirySweeper, Membership, MembershipLevel, Reconciler, SweepReport, WalletBalance,
};
use crate::domain::foundation::{AccountId, DomainError, Timestamp};

#[derive(Debug, Clone)]
pub struct ForceCreditCommand {
    pub account_id: AccountId,
    /// Signed adjustment; negative debits the wallet.
    pub amount_cents: i64,
}

#[derive(Debug, Clone)]
pub struct ForceMembershipLevelCommand {
    pub account_id: AccountId,
    pub level: MembershipLevel,
    pub period_days: i64,
}

pub struct ForceCreditHandler {
    reconciler: Arc<Reconciler>,
}

impl ForceCreditHandler {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self { reconciler }
    }

    pub async fn handle(&self, cmd: ForceCreditCommand) -> Result<WalletBalance, DomainError> {
        self.reconciler
            .force_credit(&cmd.account_id, cmd.amount_cents)
            .await
    }
}

pub struct ForceMembershipLevelHandler {
    reconciler: Arc<Reconciler>,
}

impl ForceMembershipLevelHandler {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self { reconciler }
    }

    pub async fn handle(
        &self,
        cmd: ForceMembershipLevelCommand,
    ) -> Result<Membership, DomainError> {
        self.reconciler
            .force_membership_level(&cmd.account_id, cmd.level, cmd.period_days)
            .await
    }
}

/// Handler for an on-demand sweep pass, used by the admin API in
/// addition to the background interval.
pub struct SweepExpiredHandler {
    sweeper: Arc<ExpirySweeper>,
}

impl SweepExpiredHandler {
    pub fn new(sweeper: Arc<ExpirySweeper>) -> Self {
        Self { sweeper }
    }

    pub async fn handle(&self) -> Result<SweepReport, DomainError> {
        self.sweeper.sweep(Timestamp::now()).await
    }
}
