//! CreditWalletHandler - wallet top-ups for paying members.

use std::sync::Arc;

use crate::domain::billing::{MembershipState, Reconciler, WalletBalance};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, Timestamp};
use crate::ports::BillingStore;

#[derive(Debug, Clone)]
pub struct CreditWalletCommand {
    pub account_id: AccountId,
    pub amount_cents: i64,
}

/// Handler for wallet top-ups.
///
/// Top-ups are a member perk: free accounts are turned away with
/// `MEMBERSHIP_REQUIRED` before any money moves.
pub struct CreditWalletHandler {
    store: Arc<dyn BillingStore>,
    reconciler: Arc<Reconciler>,
}

impl CreditWalletHandler {
    pub fn new(store: Arc<dyn BillingStore>, reconciler: Arc<Reconciler>) -> Self {
        Self { store, reconciler }
    }

    pub async fn handle(&self, cmd: CreditWalletCommand) -> Result<WalletBalance, DomainError> {
        let snapshot = self.store.load_snapshot(&cmd.account_id).await?;
        if snapshot.membership.state(Timestamp::now()) == MembershipState::Free {
            return Err(DomainError::new(
                ErrorCode::MembershipRequired,
                "Wallet top-ups require an active membership",
            ));
        }

        self.reconciler
            .credit_wallet(&cmd.account_id, cmd.amount_cents)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::{BillingEventBuilder, MembershipLevel};
    use serde_json::json;

    fn account() -> AccountId {
        AccountId::new("acct-1").unwrap()
    }

    fn setup() -> (Arc<InMemoryBillingStore>, Arc<Reconciler>, CreditWalletHandler) {
        let store = Arc::new(InMemoryBillingStore::new());
        let reconciler = Arc::new(Reconciler::new(store.clone()));
        let handler = CreditWalletHandler::new(store.clone(), reconciler.clone());
        (store, reconciler, handler)
    }

    async fn activate(reconciler: &Reconciler) {
        let event = BillingEventBuilder::new()
            .event_id("evt_up")
            .event_type("subscription_created")
            .account_id("acct-1")
            .payload(json!({"level": 1, "period_days": 30}))
            .build();
        reconciler.process(event).await.unwrap();
    }

    #[tokio::test]
    async fn member_can_top_up() {
        let (_, reconciler, handler) = setup();
        activate(&reconciler).await;

        let wallet = handler
            .handle(CreditWalletCommand {
                account_id: account(),
                amount_cents: 2500,
            })
            .await
            .unwrap();

        assert_eq!(wallet.balance_cents, 2500);
    }

    #[tokio::test]
    async fn free_account_is_rejected() {
        let (store, _, handler) = setup();

        let err = handler
            .handle(CreditWalletCommand {
                account_id: account(),
                amount_cents: 2500,
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::MembershipRequired);
        let snapshot = store.load_snapshot(&account()).await.unwrap();
        assert_eq!(snapshot.wallet.balance_cents, 0);
    }

    #[tokio::test]
    async fn lapsed_membership_counts_as_free() {
        let (store, _, handler) = setup();
        let mut membership = crate::domain::billing::Membership::free(account());
        membership
            .apply_upgrade(MembershipLevel::Premium, 30, Timestamp::now().add_days(-90))
            .unwrap();
        store.update_membership(&membership).await.unwrap();

        let err = handler
            .handle(CreditWalletCommand {
                account_id: account(),
                amount_cents: 100,
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::MembershipRequired);
    }
}
