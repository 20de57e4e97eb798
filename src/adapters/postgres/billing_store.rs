//! PostgreSQL implementation of BillingStore.
//!
//! The commit contract maps onto one database transaction:
//!
//! - the event claim is an upsert against the `billing_events` primary
//!   key whose `DO UPDATE` only matches rows with outcome `failed`, so
//!   zero rows affected means another delivery already settled the id
//! - membership and wallet rows are upserted with
//!   `WHERE version = $expected`, so zero rows affected means an
//!   optimistic-lock loss and the transaction rolls back untouched
//!
//! Schema lives in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::billing::{
    BillingEvent, EventOutcome, Membership, MembershipLevel, RefundShortfall, TransactionReason,
    WalletBalance, WalletTransaction,
};
use crate::domain::foundation::{
    AccountId, DomainError, ErrorCode, EventId, Timestamp, TransactionId,
};
use crate::ports::{
    AccountSnapshot, BillingStore, CommitResult, CommitWrites, DowngradeResult,
};

/// PostgreSQL implementation of the BillingStore port.
pub struct PostgresBillingStore {
    pool: PgPool,
}

impl PostgresBillingStore {
    /// Creates a new PostgresBillingStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a billing event.
#[derive(Debug, sqlx::FromRow)]
struct BillingEventRow {
    event_id: String,
    event_type: String,
    account_id: String,
    payload: serde_json::Value,
    received_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    outcome: Option<String>,
}

impl TryFrom<BillingEventRow> for BillingEvent {
    type Error = DomainError;

    fn try_from(row: BillingEventRow) -> Result<Self, Self::Error> {
        let outcome = row
            .outcome
            .as_deref()
            .map(|s| {
                EventOutcome::parse(s).ok_or_else(|| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Invalid outcome value: {}", s),
                    )
                })
            })
            .transpose()?;

        Ok(BillingEvent {
            event_id: EventId::new(row.event_id).map_err(invalid_column("event_id"))?,
            event_type: row.event_type,
            account_id: AccountId::new(row.account_id).map_err(invalid_column("account_id"))?,
            payload: row.payload,
            received_at: Timestamp::from_datetime(row.received_at),
            processed_at: row.processed_at.map(Timestamp::from_datetime),
            outcome,
        })
    }
}

/// Database row representation of a membership.
#[derive(Debug, sqlx::FromRow)]
struct MembershipRow {
    account_id: String,
    level: String,
    expires_at: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
    cancel_requested_at: Option<DateTime<Utc>>,
    version: i64,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MembershipRow> for Membership {
    type Error = DomainError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        Ok(Membership {
            account_id: AccountId::new(row.account_id).map_err(invalid_column("account_id"))?,
            level: parse_level(&row.level)?,
            expires_at: row.expires_at.map(Timestamp::from_datetime),
            cancel_at_period_end: row.cancel_at_period_end,
            cancel_requested_at: row.cancel_requested_at.map(Timestamp::from_datetime),
            version: row.version,
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Database row representation of a wallet balance.
#[derive(Debug, sqlx::FromRow)]
struct WalletRow {
    account_id: String,
    balance_cents: i64,
    transaction_count: i64,
    version: i64,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WalletRow> for WalletBalance {
    type Error = DomainError;

    fn try_from(row: WalletRow) -> Result<Self, Self::Error> {
        Ok(WalletBalance {
            account_id: AccountId::new(row.account_id).map_err(invalid_column("account_id"))?,
            balance_cents: row.balance_cents,
            transaction_count: row.transaction_count,
            version: row.version,
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Database row representation of a wallet ledger entry.
#[derive(Debug, sqlx::FromRow)]
struct WalletTransactionRow {
    id: Uuid,
    account_id: String,
    source_event_id: String,
    amount_cents: i64,
    reason: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<WalletTransactionRow> for WalletTransaction {
    type Error = DomainError;

    fn try_from(row: WalletTransactionRow) -> Result<Self, Self::Error> {
        Ok(WalletTransaction {
            id: TransactionId::from_uuid(row.id),
            account_id: AccountId::new(row.account_id).map_err(invalid_column("account_id"))?,
            source_event_id: EventId::new(row.source_event_id)
                .map_err(invalid_column("source_event_id"))?,
            amount_cents: row.amount_cents,
            reason: parse_reason(&row.reason)?,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

/// Database row representation of a refund shortfall.
#[derive(Debug, sqlx::FromRow)]
struct RefundShortfallRow {
    account_id: String,
    source_event_id: String,
    requested_cents: i64,
    debited_cents: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<RefundShortfallRow> for RefundShortfall {
    type Error = DomainError;

    fn try_from(row: RefundShortfallRow) -> Result<Self, Self::Error> {
        Ok(RefundShortfall {
            account_id: AccountId::new(row.account_id).map_err(invalid_column("account_id"))?,
            source_event_id: EventId::new(row.source_event_id)
                .map_err(invalid_column("source_event_id"))?,
            requested_cents: row.requested_cents,
            debited_cents: row.debited_cents,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn parse_level(s: &str) -> Result<MembershipLevel, DomainError> {
    match s.to_lowercase().as_str() {
        "free" => Ok(MembershipLevel::Free),
        "basic" => Ok(MembershipLevel::Basic),
        "premium" => Ok(MembershipLevel::Premium),
        "max" => Ok(MembershipLevel::Max),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid level value: {}", s),
        )),
    }
}

fn level_to_string(level: MembershipLevel) -> &'static str {
    match level {
        MembershipLevel::Free => "free",
        MembershipLevel::Basic => "basic",
        MembershipLevel::Premium => "premium",
        MembershipLevel::Max => "max",
    }
}

fn parse_reason(s: &str) -> Result<TransactionReason, DomainError> {
    TransactionReason::parse(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid reason value: {}", s),
        )
    })
}

fn invalid_column(column: &'static str) -> impl Fn(crate::domain::foundation::ValidationError) -> DomainError {
    move |e| DomainError::new(ErrorCode::DatabaseError, format!("Invalid {}: {}", column, e))
}

fn db_error(context: &str) -> impl Fn(sqlx::Error) -> DomainError + '_ {
    move |e| DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

/// Claims the event id inside the transaction.
///
/// Returns false when the id is already settled (the `DO UPDATE` only
/// matches failed records, so a settled row yields zero affected rows).
async fn claim_event(
    tx: &mut Transaction<'_, Postgres>,
    event: &BillingEvent,
) -> Result<bool, DomainError> {
    let result = sqlx::query(
        r#"
        INSERT INTO billing_events (
            event_id, event_type, account_id, payload, received_at, processed_at, outcome
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (event_id) DO UPDATE SET
            event_type = EXCLUDED.event_type,
            account_id = EXCLUDED.account_id,
            payload = EXCLUDED.payload,
            received_at = EXCLUDED.received_at,
            processed_at = EXCLUDED.processed_at,
            outcome = EXCLUDED.outcome
        WHERE billing_events.outcome = 'failed'
        "#,
    )
    .bind(event.event_id.as_str())
    .bind(&event.event_type)
    .bind(event.account_id.as_str())
    .bind(&event.payload)
    .bind(event.received_at.as_datetime())
    .bind(event.processed_at.map(|t| *t.as_datetime()))
    .bind(event.outcome.map(|o| o.as_str()))
    .execute(&mut **tx)
    .await
    .map_err(db_error("Failed to claim event"))?;

    Ok(result.rows_affected() > 0)
}

/// Version-checked membership upsert. Returns false on version loss.
async fn upsert_membership(
    tx: &mut Transaction<'_, Postgres>,
    membership: &Membership,
) -> Result<bool, DomainError> {
    let result = sqlx::query(
        r#"
        INSERT INTO memberships (
            account_id, level, expires_at, cancel_at_period_end,
            cancel_requested_at, version, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6 + 1, $7)
        ON CONFLICT (account_id) DO UPDATE SET
            level = EXCLUDED.level,
            expires_at = EXCLUDED.expires_at,
            cancel_at_period_end = EXCLUDED.cancel_at_period_end,
            cancel_requested_at = EXCLUDED.cancel_requested_at,
            version = memberships.version + 1,
            updated_at = EXCLUDED.updated_at
        WHERE memberships.version = $6
        "#,
    )
    .bind(membership.account_id.as_str())
    .bind(level_to_string(membership.level))
    .bind(membership.expires_at.map(|t| *t.as_datetime()))
    .bind(membership.cancel_at_period_end)
    .bind(membership.cancel_requested_at.map(|t| *t.as_datetime()))
    .bind(membership.version)
    .bind(membership.updated_at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(db_error("Failed to upsert membership"))?;

    Ok(result.rows_affected() > 0)
}

/// Version-checked wallet upsert. Returns false on version loss.
async fn upsert_wallet(
    tx: &mut Transaction<'_, Postgres>,
    wallet: &WalletBalance,
) -> Result<bool, DomainError> {
    let result = sqlx::query(
        r#"
        INSERT INTO wallets (
            account_id, balance_cents, transaction_count, version, updated_at
        ) VALUES ($1, $2, $3, $4 + 1, $5)
        ON CONFLICT (account_id) DO UPDATE SET
            balance_cents = EXCLUDED.balance_cents,
            transaction_count = EXCLUDED.transaction_count,
            version = wallets.version + 1,
            updated_at = EXCLUDED.updated_at
        WHERE wallets.version = $4
        "#,
    )
    .bind(wallet.account_id.as_str())
    .bind(wallet.balance_cents)
    .bind(wallet.transaction_count)
    .bind(wallet.version)
    .bind(wallet.updated_at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(db_error("Failed to upsert wallet"))?;

    Ok(result.rows_affected() > 0)
}

#[async_trait]
impl BillingStore for PostgresBillingStore {
    async fn find_event(&self, event_id: &EventId) -> Result<Option<BillingEvent>, DomainError> {
        let row: Option<BillingEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, account_id, payload, received_at, processed_at, outcome
            FROM billing_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find event"))?;

        row.map(BillingEvent::try_from).transpose()
    }

    async fn load_snapshot(&self, account_id: &AccountId) -> Result<AccountSnapshot, DomainError> {
        let membership_row: Option<MembershipRow> = sqlx::query_as(
            r#"
            SELECT account_id, level, expires_at, cancel_at_period_end,
                   cancel_requested_at, version, updated_at
            FROM memberships
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to load membership"))?;

        let wallet_row: Option<WalletRow> = sqlx::query_as(
            r#"
            SELECT account_id, balance_cents, transaction_count, version, updated_at
            FROM wallets
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to load wallet"))?;

        Ok(AccountSnapshot {
            membership: membership_row
                .map(Membership::try_from)
                .transpose()?
                .unwrap_or_else(|| Membership::free(account_id.clone())),
            wallet: wallet_row
                .map(WalletBalance::try_from)
                .transpose()?
                .unwrap_or_else(|| WalletBalance::zero(account_id.clone())),
        })
    }

    async fn commit(
        &self,
        event: &BillingEvent,
        writes: CommitWrites,
    ) -> Result<CommitResult, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        if !claim_event(&mut tx, event).await? {
            // Dropping the transaction rolls it back.
            return Ok(CommitResult::DuplicateEvent);
        }

        if let Some(membership) = &writes.membership {
            if !upsert_membership(&mut tx, membership).await? {
                return Err(DomainError::conflict(format!(
                    "membership for {} changed since snapshot version {}",
                    membership.account_id, membership.version
                )));
            }
        }

        if let Some(wallet) = &writes.wallet {
            if !upsert_wallet(&mut tx, wallet).await? {
                return Err(DomainError::conflict(format!(
                    "wallet for {} changed since snapshot version {}",
                    wallet.account_id, wallet.version
                )));
            }
        }

        if let Some(entry) = &writes.wallet_transaction {
            sqlx::query(
                r#"
                INSERT INTO wallet_transactions (
                    id, account_id, source_event_id, amount_cents, reason, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(entry.id.as_uuid())
            .bind(entry.account_id.as_str())
            .bind(entry.source_event_id.as_str())
            .bind(entry.amount_cents)
            .bind(entry.reason.as_str())
            .bind(entry.created_at.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to insert wallet transaction"))?;
        }

        if let Some(shortfall) = &writes.shortfall {
            sqlx::query(
                r#"
                INSERT INTO refund_shortfalls (
                    account_id, source_event_id, requested_cents, debited_cents, created_at
                ) VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(shortfall.account_id.as_str())
            .bind(shortfall.source_event_id.as_str())
            .bind(shortfall.requested_cents)
            .bind(shortfall.debited_cents)
            .bind(shortfall.created_at.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to insert refund shortfall"))?;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;
        Ok(CommitResult::Applied)
    }

    async fn update_membership(&self, membership: &Membership) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        if !upsert_membership(&mut tx, membership).await? {
            return Err(DomainError::conflict(format!(
                "membership for {} changed since snapshot version {}",
                membership.account_id, membership.version
            )));
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;
        Ok(())
    }

    async fn expired_memberships(
        &self,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<Membership>, DomainError> {
        let rows: Vec<MembershipRow> = sqlx::query_as(
            r#"
            SELECT account_id, level, expires_at, cancel_at_period_end,
                   cancel_requested_at, version, updated_at
            FROM memberships
            WHERE level <> 'free'
              AND expires_at IS NOT NULL
              AND expires_at <= $1
            ORDER BY expires_at ASC
            LIMIT $2
            "#,
        )
        .bind(now.as_datetime())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to find expired memberships"))?;

        rows.into_iter().map(Membership::try_from).collect()
    }

    async fn commit_downgrade(
        &self,
        membership: &Membership,
    ) -> Result<DowngradeResult, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE memberships SET
                level = $3,
                expires_at = $4,
                cancel_at_period_end = $5,
                cancel_requested_at = $6,
                version = version + 1,
                updated_at = $7
            WHERE account_id = $1 AND version = $2
            "#,
        )
        .bind(membership.account_id.as_str())
        .bind(membership.version)
        .bind(level_to_string(membership.level))
        .bind(membership.expires_at.map(|t| *t.as_datetime()))
        .bind(membership.cancel_at_period_end)
        .bind(membership.cancel_requested_at.map(|t| *t.as_datetime()))
        .bind(membership.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to apply sweep downgrade"))?;

        if result.rows_affected() > 0 {
            Ok(DowngradeResult::Downgraded)
        } else {
            Ok(DowngradeResult::Skipped)
        }
    }

    async fn wallet_transactions(
        &self,
        account_id: &AccountId,
        limit: i64,
    ) -> Result<Vec<WalletTransaction>, DomainError> {
        let rows: Vec<WalletTransactionRow> = sqlx::query_as(
            r#"
            SELECT id, account_id, source_event_id, amount_cents, reason, created_at
            FROM wallet_transactions
            WHERE account_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(account_id.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load wallet transactions"))?;

        rows.into_iter().map(WalletTransaction::try_from).collect()
    }

    async fn refund_shortfalls(&self, limit: i64) -> Result<Vec<RefundShortfall>, DomainError> {
        let rows: Vec<RefundShortfallRow> = sqlx::query_as(
            r#"
            SELECT account_id, source_event_id, requested_cents, debited_cents, created_at
            FROM refund_shortfalls
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load refund shortfalls"))?;

        rows.into_iter().map(RefundShortfall::try_from).collect()
    }
}
