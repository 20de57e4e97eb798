//! Billing event types.
//!
//! Defines the durable record of an inbound payment-provider event and
//! the typed views the reconciler reads out of its raw payload. Only
//! payload fields relevant to reconciliation are interpreted; the rest
//! of the provider's schema is carried opaquely.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, EventId, Timestamp};

use super::MembershipLevel;

/// Known billing event types.
///
/// The five provider variants are the only strings the webhook gateway
/// accepts; `AdminAdjustment` is minted internally for audit records of
/// administrative operations and never parsed from provider input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingEventType {
    /// New subscription purchased or upgraded.
    SubscriptionCreated,
    /// Cancellation scheduled for period end.
    SubscriptionCancelled,
    /// Subscription period ended without renewal.
    SubscriptionExpired,
    /// A prior payment was refunded (subscription or credit purchase).
    PaymentRefunded,
    /// Prepaid wallet credit purchased.
    CreditPurchased,
    /// Synthetic event recording an administrative adjustment.
    AdminAdjustment,
}

impl BillingEventType {
    /// Parses a provider event type string. Returns None for anything
    /// outside the accepted provider set.
    pub fn from_provider_str(s: &str) -> Option<Self> {
        match s {
            "subscription_created" => Some(Self::SubscriptionCreated),
            "subscription_cancelled" => Some(Self::SubscriptionCancelled),
            "subscription_expired" => Some(Self::SubscriptionExpired),
            "payment_refunded" => Some(Self::PaymentRefunded),
            "credit_purchased" => Some(Self::CreditPurchased),
            _ => None,
        }
    }

    /// Returns the wire string for this event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubscriptionCreated => "subscription_created",
            Self::SubscriptionCancelled => "subscription_cancelled",
            Self::SubscriptionExpired => "subscription_expired",
            Self::PaymentRefunded => "payment_refunded",
            Self::CreditPurchased => "credit_purchased",
            Self::AdminAdjustment => "admin_adjustment",
        }
    }
}

/// Final disposition of a processed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    /// Effects were committed.
    Applied,
    /// Event id was already recorded; no effects applied.
    Duplicate,
    /// Processing failed; the provider should redeliver.
    Failed,
}

impl EventOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Duplicate => "duplicate",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "applied" => Some(Self::Applied),
            "duplicate" => Some(Self::Duplicate),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// What a refund points back at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundTarget {
    /// Refund of a subscription payment; downgrades the membership.
    Subscription,
    /// Refund of a credit purchase; debits the wallet.
    Credit,
}

impl RefundTarget {
    pub fn from_purchase_type(s: &str) -> Option<Self> {
        match s {
            "subscription" => Some(Self::Subscription),
            "credit" => Some(Self::Credit),
            _ => None,
        }
    }
}

/// Durable record of an inbound billing event.
///
/// One row per provider `event_id`; uniqueness of that column is the
/// deduplication ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingEvent {
    /// Provider-assigned event identifier.
    pub event_id: EventId,

    /// Raw provider event type string (kept even when unrecognized so
    /// failed events stay inspectable).
    pub event_type: String,

    /// Account the event concerns.
    pub account_id: AccountId,

    /// Full provider payload, stored verbatim.
    pub payload: serde_json::Value,

    /// When the gateway accepted the event.
    pub received_at: Timestamp,

    /// When reconciliation finished, if it has.
    pub processed_at: Option<Timestamp>,

    /// Disposition, set in the same commit that applies the effects.
    pub outcome: Option<EventOutcome>,
}

impl BillingEvent {
    /// Creates an event record as received from the provider, not yet
    /// processed.
    pub fn received(
        event_id: EventId,
        event_type: impl Into<String>,
        account_id: AccountId,
        payload: serde_json::Value,
        received_at: Timestamp,
    ) -> Self {
        Self {
            event_id,
            event_type: event_type.into(),
            account_id,
            payload,
            received_at,
            processed_at: None,
            outcome: None,
        }
    }

    /// Parses the event type into a known variant, if it is one.
    pub fn parsed_type(&self) -> Option<BillingEventType> {
        BillingEventType::from_provider_str(&self.event_type)
    }

    /// Membership level carried by the payload (`level`, numeric rank).
    pub fn level(&self) -> Option<MembershipLevel> {
        self.payload
            .get("level")
            .and_then(|v| v.as_u64())
            .and_then(|n| u8::try_from(n).ok())
            .and_then(MembershipLevel::from_rank)
    }

    /// Subscription period length in days (`period_days`).
    pub fn period_days(&self) -> Option<i64> {
        self.payload.get("period_days").and_then(|v| v.as_i64())
    }

    /// Monetary amount in cents (`amount_cents`), always positive in
    /// provider payloads; the effect decides the sign.
    pub fn amount_cents(&self) -> Option<i64> {
        self.payload.get("amount_cents").and_then(|v| v.as_i64())
    }

    /// Refund target from the payload's `purchase_type` field.
    pub fn refund_target(&self) -> Option<RefundTarget> {
        self.payload
            .get("purchase_type")
            .and_then(|v| v.as_str())
            .and_then(RefundTarget::from_purchase_type)
    }
}

/// Builder for creating test BillingEvent instances.
#[cfg(test)]
pub struct BillingEventBuilder {
    event_id: String,
    event_type: String,
    account_id: String,
    payload: serde_json::Value,
}

#[cfg(test)]
impl Default for BillingEventBuilder {
    fn default() -> Self {
        Self {
            event_id: "evt_test_123".to_string(),
            event_type: "subscription_created".to_string(),
            account_id: "acct_test".to_string(),
            payload: serde_json::json!({}),
        }
    }
}

#[cfg(test)]
impl BillingEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_id(mut self, id: impl Into<String>) -> Self {
        self.event_id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn account_id(mut self, id: impl Into<String>) -> Self {
        self.account_id = id.into();
        self
    }

    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> BillingEvent {
        BillingEvent::received(
            EventId::new(self.event_id).unwrap(),
            self.event_type,
            AccountId::new(self.account_id).unwrap(),
            self.payload,
            Timestamp::now(),
        )
    }
}
