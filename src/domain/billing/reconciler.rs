//! Reconciler - turns verified billing events into committed ledger state.
//!
//! ## Design
//!
//! Processing is split into three phases:
//! 1. Classify the event into an effect (pure, no storage)
//! 2. Load the account snapshot and compute the writes (pure)
//! 3. Commit the event claim and the writes as one storage transaction
//!
//! ## Race Condition Handling
//!
//! Two concurrent deliveries of the same event both reach commit; the
//! first claim wins the event-id constraint and the loser gets
//! `DuplicateEvent` with nothing written. Two deliveries for the same
//! account but different events race on the row versions instead: the
//! loser's version check fails and it recomputes from a fresh snapshot,
//! up to a bounded number of attempts.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::foundation::{AccountId, DomainError, EventId, Timestamp};
use crate::ports::{AccountSnapshot, BillingStore, CommitResult, CommitWrites};

use super::{
    clamp_refund_debit, BillingEvent, BillingEventType, EventOutcome, Membership, MembershipLevel,
    ReconcileError, RefundShortfall, RefundTarget, TransactionReason, WalletBalance,
    WalletTransaction,
};

/// Attempts before giving up on optimistic-lock races.
const MAX_CONFLICT_RETRIES: u32 = 3;

/// Outcome of reconciling one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationResult {
    /// Effects were committed by this delivery.
    Applied,
    /// The event was already settled; this delivery was a no-op.
    Duplicate,
}

/// The single ledger effect an event classifies into.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Effect {
    Upgrade {
        level: MembershipLevel,
        period_days: i64,
    },
    ScheduleCancel,
    ForceDowngrade,
    RefundCredit {
        amount_cents: i64,
    },
    CreditWallet {
        amount_cents: i64,
    },
}

/// Reconciles billing events against the store, exactly once per event
/// id.
pub struct Reconciler {
    store: Arc<dyn BillingStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    /// Processes one verified event delivery.
    ///
    /// # Returns
    ///
    /// - `Ok(Applied)` - this delivery committed the effects
    /// - `Ok(Duplicate)` - the event id was already settled
    /// - `Err(_)` - processing failed; the event is recorded with
    ///   outcome `failed` where possible and the gateway's 5xx asks the
    ///   provider to redeliver
    pub async fn process(
        &self,
        event: BillingEvent,
    ) -> Result<ReconciliationResult, ReconcileError> {
        // Fast duplicate check. Records with outcome `failed` are not
        // settled; a redelivery gets to try again.
        if let Some(existing) = self
            .store
            .find_event(&event.event_id)
            .await
            .map_err(store_error)?
        {
            if existing.outcome != Some(EventOutcome::Failed) {
                debug!(event_id = %event.event_id, "duplicate event, skipping");
                return Ok(ReconciliationResult::Duplicate);
            }
        }

        let effect = match classify(&event) {
            Ok(effect) => effect,
            Err(err) => {
                self.record_failure(&event).await;
                return Err(err);
            }
        };

        for attempt in 0..MAX_CONFLICT_RETRIES {
            let now = Timestamp::now();
            let snapshot = self
                .store
                .load_snapshot(&event.account_id)
                .await
                .map_err(store_error)?;

            let writes = match compute_writes(&effect, snapshot, &event, now) {
                Ok(writes) => writes,
                Err(err) => {
                    self.record_failure(&event).await;
                    return Err(err);
                }
            };

            let mut record = event.clone();
            record.outcome = Some(EventOutcome::Applied);
            record.processed_at = Some(now);

            match self.store.commit(&record, writes).await {
                Ok(CommitResult::Applied) => return Ok(ReconciliationResult::Applied),
                Ok(CommitResult::DuplicateEvent) => {
                    debug!(event_id = %event.event_id, "lost claim race, already settled");
                    return Ok(ReconciliationResult::Duplicate);
                }
                Err(err) if err.is_conflict() => {
                    debug!(
                        event_id = %event.event_id,
                        attempt,
                        "version conflict, reloading snapshot"
                    );
                    continue;
                }
                Err(err) => return Err(store_error(err)),
            }
        }

        Err(ReconcileError::StorageConflict(format!(
            "gave up on event {} after {} attempts",
            event.event_id, MAX_CONFLICT_RETRIES
        )))
    }

    /// Administratively sets an exact membership level, bypassing the
    /// max-rule, with a synthetic audit event in the store.
    pub async fn force_membership_level(
        &self,
        account_id: &AccountId,
        level: MembershipLevel,
        period_days: i64,
    ) -> Result<Membership, DomainError> {
        let payload = serde_json::json!({
            "action": "set_level",
            "level": level.rank(),
            "period_days": period_days,
        });
        self.commit_synthetic(account_id, payload, move |snapshot, now, _event_id| {
            let mut membership = snapshot.membership;
            membership.set_level(level, period_days, now)?;
            Ok((
                CommitWrites {
                    membership: Some(membership.clone()),
                    ..CommitWrites::none()
                },
                membership,
            ))
        })
        .await
    }

    /// Administratively adjusts the wallet by a signed amount, with a
    /// synthetic audit event in the store.
    ///
    /// Debits beyond the balance are rejected; the wallet never goes
    /// negative.
    pub async fn force_credit(
        &self,
        account_id: &AccountId,
        amount_cents: i64,
    ) -> Result<WalletBalance, DomainError> {
        if amount_cents == 0 {
            return Err(DomainError::validation(
                "amount_cents",
                "Adjustment must be non-zero",
            ));
        }
        let payload = serde_json::json!({
            "action": "credit",
            "amount_cents": amount_cents,
        });
        self.commit_synthetic(account_id, payload, move |snapshot, now, event_id| {
            let tx = if amount_cents > 0 {
                WalletTransaction::credit(
                    snapshot.wallet.account_id.clone(),
                    event_id,
                    amount_cents,
                    TransactionReason::AdminAdjustment,
                    now,
                )?
            } else {
                WalletTransaction::debit(
                    snapshot.wallet.account_id.clone(),
                    event_id,
                    -amount_cents,
                    TransactionReason::AdminAdjustment,
                    now,
                )?
            };
            let mut wallet = snapshot.wallet;
            wallet.apply(&tx)?;
            Ok((
                CommitWrites {
                    wallet_transaction: Some(tx),
                    wallet: Some(wallet.clone()),
                    ..CommitWrites::none()
                },
                wallet,
            ))
        })
        .await
    }

    /// Credits the wallet with a purchased top-up outside the webhook
    /// flow, with a synthetic audit event in the store.
    pub async fn credit_wallet(
        &self,
        account_id: &AccountId,
        amount_cents: i64,
    ) -> Result<WalletBalance, DomainError> {
        if amount_cents <= 0 {
            return Err(DomainError::validation(
                "amount_cents",
                format!("Credit must be positive, got {}", amount_cents),
            ));
        }
        let payload = serde_json::json!({
            "action": "wallet_topup",
            "amount_cents": amount_cents,
        });
        self.commit_synthetic(account_id, payload, move |snapshot, now, event_id| {
            let tx = WalletTransaction::credit(
                snapshot.wallet.account_id.clone(),
                event_id,
                amount_cents,
                TransactionReason::CreditPurchase,
                now,
            )?;
            let mut wallet = snapshot.wallet;
            wallet.apply(&tx)?;
            Ok((
                CommitWrites {
                    wallet_transaction: Some(tx),
                    wallet: Some(wallet.clone()),
                    ..CommitWrites::none()
                },
                wallet,
            ))
        })
        .await
    }

    /// Commits writes derived from a snapshot together with a fresh
    /// synthetic event, retrying on version conflicts.
    async fn commit_synthetic<T, F>(
        &self,
        account_id: &AccountId,
        payload: serde_json::Value,
        compute: F,
    ) -> Result<T, DomainError>
    where
        F: Fn(AccountSnapshot, Timestamp, EventId) -> Result<(CommitWrites, T), DomainError>,
    {
        for _attempt in 0..MAX_CONFLICT_RETRIES {
            let now = Timestamp::now();
            let event_id = EventId::synthetic_admin();
            let snapshot = self.store.load_snapshot(account_id).await?;
            let (writes, result) = compute(snapshot, now, event_id.clone())?;

            let mut event = BillingEvent::received(
                event_id,
                BillingEventType::AdminAdjustment.as_str(),
                account_id.clone(),
                payload.clone(),
                now,
            );
            event.outcome = Some(EventOutcome::Applied);
            event.processed_at = Some(now);

            match self.store.commit(&event, writes).await {
                // A fresh synthetic id can never be a duplicate.
                Ok(_) => return Ok(result),
                Err(err) if err.is_conflict() => continue,
                Err(err) => return Err(err),
            }
        }
        Err(DomainError::conflict(format!(
            "gave up on adjustment for {} after {} attempts",
            account_id, MAX_CONFLICT_RETRIES
        )))
    }

    /// Best-effort record of a failed event so operators can inspect
    /// it. The processing error is what the caller reports; a storage
    /// error here only gets logged.
    async fn record_failure(&self, event: &BillingEvent) {
        let mut record = event.clone();
        record.outcome = Some(EventOutcome::Failed);
        record.processed_at = Some(Timestamp::now());
        if let Err(err) = self.store.commit(&record, CommitWrites::none()).await {
            warn!(event_id = %event.event_id, error = %err, "could not record failed event");
        }
    }
}

/// Classifies an event into its single ledger effect. Pure.
fn classify(event: &BillingEvent) -> Result<Effect, ReconcileError> {
    let event_type = event
        .parsed_type()
        .ok_or_else(|| ReconcileError::UnknownEventType(event.event_type.clone()))?;

    match event_type {
        BillingEventType::SubscriptionCreated => {
            let level = event.level().ok_or(ReconcileError::MissingField("level"))?;
            let period_days = event
                .period_days()
                .ok_or(ReconcileError::MissingField("period_days"))?;
            Ok(Effect::Upgrade { level, period_days })
        }
        BillingEventType::SubscriptionCancelled => Ok(Effect::ScheduleCancel),
        BillingEventType::SubscriptionExpired => Ok(Effect::ForceDowngrade),
        BillingEventType::PaymentRefunded => match event.refund_target() {
            Some(RefundTarget::Subscription) => Ok(Effect::ForceDowngrade),
            Some(RefundTarget::Credit) => {
                let amount_cents = event
                    .amount_cents()
                    .ok_or(ReconcileError::MissingField("amount_cents"))?;
                Ok(Effect::RefundCredit { amount_cents })
            }
            // A refund we cannot attribute is not guessed at.
            None => Err(ReconcileError::UnknownEventType(
                "payment_refunded with unrecognized purchase_type".to_string(),
            )),
        },
        BillingEventType::CreditPurchased => {
            let amount_cents = event
                .amount_cents()
                .ok_or(ReconcileError::MissingField("amount_cents"))?;
            Ok(Effect::CreditWallet { amount_cents })
        }
        // Synthetic events are committed directly, never classified.
        BillingEventType::AdminAdjustment => Err(ReconcileError::UnknownEventType(
            event.event_type.clone(),
        )),
    }
}

/// Computes the ledger writes for an effect against a snapshot. Pure.
fn compute_writes(
    effect: &Effect,
    snapshot: AccountSnapshot,
    event: &BillingEvent,
    now: Timestamp,
) -> Result<CommitWrites, ReconcileError> {
    match effect {
        Effect::Upgrade { level, period_days } => {
            let mut membership = snapshot.membership;
            membership
                .apply_upgrade(*level, *period_days, now)
                .map_err(|e| ReconcileError::ParseError(e.to_string()))?;
            Ok(CommitWrites {
                membership: Some(membership),
                ..CommitWrites::none()
            })
        }

        Effect::ScheduleCancel => {
            let mut membership = snapshot.membership;
            // Cancelling an account that is already free (never paid,
            // lapsed, or refunded out of order) is a no-op, not a
            // failure: the end state is what the provider asked for.
            match membership.schedule_cancel(now) {
                Ok(()) => Ok(CommitWrites {
                    membership: Some(membership),
                    ..CommitWrites::none()
                }),
                Err(_) => Ok(CommitWrites::none()),
            }
        }

        Effect::ForceDowngrade => {
            let mut membership = snapshot.membership;
            if membership.force_downgrade(now) {
                Ok(CommitWrites {
                    membership: Some(membership),
                    ..CommitWrites::none()
                })
            } else {
                // Already free; only the event record is written.
                Ok(CommitWrites::none())
            }
        }

        Effect::RefundCredit { amount_cents } => {
            if *amount_cents <= 0 {
                return Err(ReconcileError::ParseError(format!(
                    "refund amount must be positive, got {}",
                    amount_cents
                )));
            }
            let mut wallet = snapshot.wallet;
            let (debit_cents, missing_cents) =
                clamp_refund_debit(wallet.balance_cents, *amount_cents);

            let shortfall = if missing_cents > 0 {
                warn!(
                    account_id = %wallet.account_id,
                    event_id = %event.event_id,
                    requested_cents = amount_cents,
                    debited_cents = debit_cents,
                    "refund exceeds wallet balance, clamping"
                );
                Some(RefundShortfall {
                    account_id: wallet.account_id.clone(),
                    source_event_id: event.event_id.clone(),
                    requested_cents: *amount_cents,
                    debited_cents: debit_cents,
                    created_at: now,
                })
            } else {
                None
            };

            let wallet_transaction = if debit_cents > 0 {
                let tx = WalletTransaction::debit(
                    wallet.account_id.clone(),
                    event.event_id.clone(),
                    debit_cents,
                    TransactionReason::RefundDebit,
                    now,
                )
                .map_err(|e| ReconcileError::ParseError(e.to_string()))?;
                wallet
                    .apply(&tx)
                    .map_err(|e| ReconcileError::Database(e.to_string()))?;
                Some(tx)
            } else {
                None
            };

            Ok(CommitWrites {
                wallet: wallet_transaction.is_some().then(|| wallet.clone()),
                wallet_transaction,
                shortfall,
                ..CommitWrites::none()
            })
        }

        Effect::CreditWallet { amount_cents } => {
            if *amount_cents <= 0 {
                return Err(ReconcileError::ParseError(format!(
                    "credit amount must be positive, got {}",
                    amount_cents
                )));
            }
            let mut wallet = snapshot.wallet;
            let tx = WalletTransaction::credit(
                wallet.account_id.clone(),
                event.event_id.clone(),
                *amount_cents,
                TransactionReason::CreditPurchase,
                now,
            )
            .map_err(|e| ReconcileError::ParseError(e.to_string()))?;
            wallet
                .apply(&tx)
                .map_err(|e| ReconcileError::Database(e.to_string()))?;
            Ok(CommitWrites {
                wallet_transaction: Some(tx),
                wallet: Some(wallet),
                ..CommitWrites::none()
            })
        }
    }
}

fn store_error(err: DomainError) -> ReconcileError {
    if err.is_conflict() {
        ReconcileError::StorageConflict(err.to_string())
    } else {
        ReconcileError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::BillingEventBuilder;
    use serde_json::json;

    fn reconciler() -> (Arc<InMemoryBillingStore>, Reconciler) {
        let store = Arc::new(InMemoryBillingStore::new());
        let reconciler = Reconciler::new(store.clone());
        (store, reconciler)
    }

    fn account() -> AccountId {
        AccountId::new("acct-1").unwrap()
    }

    fn upgrade_event(event_id: &str, level: u8, period_days: i64) -> BillingEvent {
        BillingEventBuilder::new()
            .event_id(event_id)
            .event_type("subscription_created")
            .account_id("acct-1")
            .payload(json!({"level": level, "period_days": period_days}))
            .build()
    }

    fn credit_event(event_id: &str, amount_cents: i64) -> BillingEvent {
        BillingEventBuilder::new()
            .event_id(event_id)
            .event_type("credit_purchased")
            .account_id("acct-1")
            .payload(json!({"amount_cents": amount_cents}))
            .build()
    }

    fn refund_event(event_id: &str, purchase_type: &str, amount_cents: i64) -> BillingEvent {
        BillingEventBuilder::new()
            .event_id(event_id)
            .event_type("payment_refunded")
            .account_id("acct-1")
            .payload(json!({"purchase_type": purchase_type, "amount_cents": amount_cents}))
            .build()
    }

    // ══════════════════════════════════════════════════════════════
    // Classification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn classify_subscription_created() {
        let effect = classify(&upgrade_event("evt_1", 2, 30)).unwrap();
        assert_eq!(
            effect,
            Effect::Upgrade {
                level: MembershipLevel::Premium,
                period_days: 30
            }
        );
    }

    #[test]
    fn classify_rejects_unknown_type() {
        let event = BillingEventBuilder::new().event_type("invoice.paid").build();
        assert!(matches!(
            classify(&event),
            Err(ReconcileError::UnknownEventType(_))
        ));
    }

    #[test]
    fn classify_upgrade_without_level_fails() {
        let event = BillingEventBuilder::new()
            .event_type("subscription_created")
            .payload(json!({"period_days": 30}))
            .build();
        assert!(matches!(
            classify(&event),
            Err(ReconcileError::MissingField("level"))
        ));
    }

    #[test]
    fn classify_refund_without_target_fails() {
        let event = BillingEventBuilder::new()
            .event_type("payment_refunded")
            .payload(json!({"amount_cents": 500}))
            .build();
        assert!(matches!(
            classify(&event),
            Err(ReconcileError::UnknownEventType(_))
        ));
    }

    #[test]
    fn classify_subscription_refund_downgrades() {
        let effect = classify(&refund_event("evt_r", "subscription", 999)).unwrap();
        assert_eq!(effect, Effect::ForceDowngrade);
    }

    // ══════════════════════════════════════════════════════════════
    // Processing Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn upgrade_event_activates_membership() {
        let (store, reconciler) = reconciler();

        let result = reconciler.process(upgrade_event("evt_1", 1, 30)).await.unwrap();
        assert_eq!(result, ReconciliationResult::Applied);

        let snapshot = store.load_snapshot(&account()).await.unwrap();
        assert_eq!(snapshot.membership.level, MembershipLevel::Basic);
        assert!(snapshot.membership.expires_at.is_some());
    }

    #[tokio::test]
    async fn duplicate_delivery_is_a_noop() {
        let (store, reconciler) = reconciler();

        reconciler.process(credit_event("evt_c", 5000)).await.unwrap();
        let result = reconciler.process(credit_event("evt_c", 5000)).await.unwrap();
        assert_eq!(result, ReconciliationResult::Duplicate);

        let snapshot = store.load_snapshot(&account()).await.unwrap();
        assert_eq!(snapshot.wallet.balance_cents, 5000);
        assert_eq!(snapshot.wallet.transaction_count, 1);
    }

    #[tokio::test]
    async fn unknown_event_is_recorded_failed_and_can_be_retried() {
        let (store, reconciler) = reconciler();
        let event = BillingEventBuilder::new()
            .event_id("evt_u")
            .event_type("mystery_event")
            .account_id("acct-1")
            .build();

        let err = reconciler.process(event.clone()).await.unwrap_err();
        assert!(matches!(err, ReconcileError::UnknownEventType(_)));

        let recorded = store
            .find_event(&EventId::new("evt_u").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(recorded.outcome, Some(EventOutcome::Failed));

        // A redelivery is not short-circuited as a duplicate.
        let err = reconciler.process(event).await.unwrap_err();
        assert!(matches!(err, ReconcileError::UnknownEventType(_)));
    }

    #[tokio::test]
    async fn subscription_refund_downgrades_immediately() {
        let (store, reconciler) = reconciler();
        reconciler.process(upgrade_event("evt_1", 3, 30)).await.unwrap();

        reconciler
            .process(refund_event("evt_2", "subscription", 2900))
            .await
            .unwrap();

        let snapshot = store.load_snapshot(&account()).await.unwrap();
        assert_eq!(snapshot.membership.level, MembershipLevel::Free);
        assert_eq!(snapshot.membership.expires_at, None);
    }

    #[tokio::test]
    async fn credit_refund_debits_wallet() {
        let (store, reconciler) = reconciler();
        reconciler.process(credit_event("evt_1", 5000)).await.unwrap();

        reconciler
            .process(refund_event("evt_2", "credit", 2000))
            .await
            .unwrap();

        let snapshot = store.load_snapshot(&account()).await.unwrap();
        assert_eq!(snapshot.wallet.balance_cents, 3000);
    }

    #[tokio::test]
    async fn oversized_refund_clamps_and_records_shortfall() {
        let (store, reconciler) = reconciler();
        reconciler.process(credit_event("evt_1", 1500)).await.unwrap();

        let result = reconciler
            .process(refund_event("evt_2", "credit", 2000))
            .await
            .unwrap();
        assert_eq!(result, ReconciliationResult::Applied);

        let snapshot = store.load_snapshot(&account()).await.unwrap();
        assert_eq!(snapshot.wallet.balance_cents, 0);

        let shortfalls = store.refund_shortfalls(10).await.unwrap();
        assert_eq!(shortfalls.len(), 1);
        assert_eq!(shortfalls[0].requested_cents, 2000);
        assert_eq!(shortfalls[0].debited_cents, 1500);
        assert_eq!(shortfalls[0].missing_cents(), 500);
    }

    #[tokio::test]
    async fn refund_on_empty_wallet_writes_no_transaction() {
        let (store, reconciler) = reconciler();

        reconciler
            .process(refund_event("evt_1", "credit", 2000))
            .await
            .unwrap();

        let snapshot = store.load_snapshot(&account()).await.unwrap();
        assert_eq!(snapshot.wallet.balance_cents, 0);
        assert_eq!(snapshot.wallet.transaction_count, 0);
        assert_eq!(store.refund_shortfalls(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancel_for_free_account_applies_as_noop() {
        let (store, reconciler) = reconciler();
        let event = BillingEventBuilder::new()
            .event_id("evt_cancel")
            .event_type("subscription_cancelled")
            .account_id("acct-1")
            .build();

        let result = reconciler.process(event).await.unwrap();
        assert_eq!(result, ReconciliationResult::Applied);

        let snapshot = store.load_snapshot(&account()).await.unwrap();
        assert!(!snapshot.membership.cancel_at_period_end);
    }

    #[tokio::test]
    async fn cancel_schedules_period_end_for_active_account() {
        let (store, reconciler) = reconciler();
        reconciler.process(upgrade_event("evt_1", 2, 30)).await.unwrap();

        let event = BillingEventBuilder::new()
            .event_id("evt_cancel")
            .event_type("subscription_cancelled")
            .account_id("acct-1")
            .build();
        reconciler.process(event).await.unwrap();

        let snapshot = store.load_snapshot(&account()).await.unwrap();
        assert!(snapshot.membership.cancel_at_period_end);
        assert_eq!(snapshot.membership.level, MembershipLevel::Premium);
    }

    #[tokio::test]
    async fn expired_event_on_free_account_is_applied() {
        let (_, reconciler) = reconciler();
        let event = BillingEventBuilder::new()
            .event_id("evt_exp")
            .event_type("subscription_expired")
            .account_id("acct-1")
            .build();

        let result = reconciler.process(event).await.unwrap();
        assert_eq!(result, ReconciliationResult::Applied);
    }

    // ══════════════════════════════════════════════════════════════
    // Administrative Operations
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn force_membership_level_sets_exact_level() {
        let (store, reconciler) = reconciler();
        reconciler.process(upgrade_event("evt_1", 3, 30)).await.unwrap();

        let membership = reconciler
            .force_membership_level(&account(), MembershipLevel::Basic, 30)
            .await
            .unwrap();
        assert_eq!(membership.level, MembershipLevel::Basic);

        // The adjustment left a synthetic audit event behind.
        let snapshot = store.load_snapshot(&account()).await.unwrap();
        assert_eq!(snapshot.membership.level, MembershipLevel::Basic);
    }

    #[tokio::test]
    async fn force_credit_applies_signed_adjustment() {
        let (_, reconciler) = reconciler();

        let wallet = reconciler.force_credit(&account(), 1000).await.unwrap();
        assert_eq!(wallet.balance_cents, 1000);

        let wallet = reconciler.force_credit(&account(), -300).await.unwrap();
        assert_eq!(wallet.balance_cents, 700);
    }

    #[tokio::test]
    async fn force_credit_rejects_overdraw() {
        let (_, reconciler) = reconciler();
        reconciler.force_credit(&account(), 500).await.unwrap();

        let err = reconciler.force_credit(&account(), -800).await.unwrap_err();
        assert_eq!(
            err.code,
            crate::domain::foundation::ErrorCode::InsufficientBalance
        );
    }

    #[tokio::test]
    async fn credit_wallet_rejects_non_positive_amount() {
        let (_, reconciler) = reconciler();
        assert!(reconciler.credit_wallet(&account(), 0).await.is_err());
        assert!(reconciler.credit_wallet(&account(), -100).await.is_err());
    }
}
