//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! These types define the JSON request/response structure for the
//! billing API. They serve as the boundary between HTTP and the
//! application layer.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::{MembershipView, WalletView};
use crate::domain::billing::{
    MembershipLevel, MembershipState, RefundShortfall, SweepReport, WalletBalance,
    WalletTransaction,
};
use crate::domain::foundation::Timestamp;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to top up the caller's wallet.
#[derive(Debug, Clone, Deserialize)]
pub struct CreditWalletRequest {
    /// Amount in cents; must be positive.
    pub amount_cents: i64,
}

/// Admin request to adjust any account's wallet.
#[derive(Debug, Clone, Deserialize)]
pub struct ForceCreditRequest {
    pub account_id: String,
    /// Signed amount in cents; negative debits.
    pub amount_cents: i64,
}

/// Admin request to set an exact membership level.
#[derive(Debug, Clone, Deserialize)]
pub struct ForceMembershipLevelRequest {
    pub account_id: String,
    pub level: MembershipLevel,
    pub period_days: i64,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement for a processed webhook delivery.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub event_id: String,
    /// "applied" or "duplicate".
    pub outcome: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelFeaturesResponse {
    pub assistant_enabled: bool,
    pub max_connected_sites: u32,
    pub image_uploads: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MembershipResponse {
    pub account_id: String,
    pub level: MembershipLevel,
    /// "free", "active", or "pending_cancel".
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    pub days_remaining: u32,
    pub cancel_at_period_end: bool,
    pub features: LevelFeaturesResponse,
}

impl From<MembershipView> for MembershipResponse {
    fn from(view: MembershipView) -> Self {
        Self {
            account_id: view.account_id.as_str().to_string(),
            level: view.level,
            state: state_label(view.state),
            expires_at: view.expires_at,
            days_remaining: view.days_remaining,
            cancel_at_period_end: view.cancel_at_period_end,
            features: LevelFeaturesResponse {
                assistant_enabled: view.features.assistant_enabled,
                max_connected_sites: view.features.max_connected_sites,
                image_uploads: view.features.image_uploads,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletTransactionResponse {
    pub id: String,
    pub source_event_id: String,
    pub amount_cents: i64,
    pub reason: &'static str,
    pub created_at: Timestamp,
}

impl From<WalletTransaction> for WalletTransactionResponse {
    fn from(tx: WalletTransaction) -> Self {
        Self {
            id: tx.id.to_string(),
            source_event_id: tx.source_event_id.as_str().to_string(),
            amount_cents: tx.amount_cents,
            reason: tx.reason.as_str(),
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletResponse {
    pub account_id: String,
    pub balance_cents: i64,
    pub transaction_count: i64,
    pub transactions: Vec<WalletTransactionResponse>,
}

impl From<WalletView> for WalletResponse {
    fn from(view: WalletView) -> Self {
        Self {
            account_id: view.balance.account_id.as_str().to_string(),
            balance_cents: view.balance.balance_cents,
            transaction_count: view.balance.transaction_count,
            transactions: view
                .transactions
                .into_iter()
                .map(WalletTransactionResponse::from)
                .collect(),
        }
    }
}

/// Balance-only response for write endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceResponse {
    pub account_id: String,
    pub balance_cents: i64,
}

impl From<WalletBalance> for BalanceResponse {
    fn from(balance: WalletBalance) -> Self {
        Self {
            account_id: balance.account_id.as_str().to_string(),
            balance_cents: balance.balance_cents,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepResponse {
    pub downgraded: u64,
    pub skipped: u64,
}

impl From<SweepReport> for SweepResponse {
    fn from(report: SweepReport) -> Self {
        Self {
            downgraded: report.downgraded,
            skipped: report.skipped,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundShortfallResponse {
    pub account_id: String,
    pub source_event_id: String,
    pub requested_cents: i64,
    pub debited_cents: i64,
    pub missing_cents: i64,
    pub created_at: Timestamp,
}

impl From<RefundShortfall> for RefundShortfallResponse {
    fn from(shortfall: RefundShortfall) -> Self {
        Self {
            missing_cents: shortfall.missing_cents(),
            account_id: shortfall.account_id.as_str().to_string(),
            source_event_id: shortfall.source_event_id.as_str().to_string(),
            requested_cents: shortfall.requested_cents,
            debited_cents: shortfall.debited_cents,
            created_at: shortfall.created_at,
        }
    }
}

/// Standard error payload for all billing endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

fn state_label(state: MembershipState) -> &'static str {
    match state {
        MembershipState::Free => "free",
        MembershipState::Active => "active",
        MembershipState::PendingCancel => "pending_cancel",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_labels_are_snake_case() {
        assert_eq!(state_label(MembershipState::Free), "free");
        assert_eq!(state_label(MembershipState::PendingCancel), "pending_cancel");
    }

    #[test]
    fn membership_level_deserializes_from_lowercase() {
        let request: ForceMembershipLevelRequest = serde_json::from_str(
            r#"{"account_id":"acct-1","level":"premium","period_days":30}"#,
        )
        .unwrap();
        assert_eq!(request.level, MembershipLevel::Premium);
    }
}
