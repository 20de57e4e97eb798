//! Billing domain - payment events, memberships, and the credit wallet.
//!
//! Everything the payment provider tells us arrives as a signed webhook
//! event; this module verifies, classifies, and reconciles those events
//! into membership and wallet state exactly once per event id.

mod errors;
mod event;
mod level;
mod membership;
mod reconciler;
mod sweeper;
mod wallet;
mod webhook_verifier;

pub use errors::ReconcileError;
pub use event::{BillingEvent, BillingEventType, EventOutcome, RefundTarget};
pub use level::{LevelFeatures, MembershipLevel};
pub use membership::{Membership, MembershipState};
pub use reconciler::{Reconciler, ReconciliationResult};
pub use sweeper::{ExpirySweeper, SweepReport};
pub use wallet::{
    clamp_refund_debit, RefundShortfall, TransactionReason, WalletBalance, WalletTransaction,
};
pub use webhook_verifier::{
    sign_for_tests, PaddleWebhookVerifier, SignatureHeader, MAX_CLOCK_SKEW_SECS,
    MAX_EVENT_AGE_SECS,
};

#[cfg(test)]
pub use event::BillingEventBuilder;
