//! ProcessWebhookHandler - verifies and reconciles provider deliveries.

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::billing::{
    BillingEvent, PaddleWebhookVerifier, ReconcileError, Reconciler, ReconciliationResult,
};
use crate::domain::foundation::{AccountId, EventId, Timestamp};

/// Command carrying one raw webhook delivery.
#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    /// Raw request body, exactly as received. The signature covers
    /// these bytes; re-serialized JSON would not verify.
    pub payload: Vec<u8>,

    /// Value of the `Paddle-Signature` header.
    pub signature_header: String,
}

/// Result of a processed delivery.
#[derive(Debug, Clone)]
pub struct ProcessWebhookResult {
    pub event_id: EventId,
    pub outcome: ReconciliationResult,
}

/// Envelope fields every provider event carries; everything else stays
/// in `payload` for the reconciler to pick apart per event type.
#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    event_id: String,
    event_type: String,
    account_id: String,

    #[serde(flatten)]
    payload: serde_json::Map<String, serde_json::Value>,
}

/// Handler for inbound provider webhooks.
pub struct ProcessWebhookHandler {
    verifier: PaddleWebhookVerifier,
    reconciler: Arc<Reconciler>,
}

impl ProcessWebhookHandler {
    pub fn new(verifier: PaddleWebhookVerifier, reconciler: Arc<Reconciler>) -> Self {
        Self {
            verifier,
            reconciler,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProcessWebhookCommand,
    ) -> Result<ProcessWebhookResult, ReconcileError> {
        // 1. Signature first: nothing unverified is parsed further.
        let envelope: WebhookEnvelope = self
            .verifier
            .verify_and_parse(&cmd.payload, &cmd.signature_header)?;

        // 2. Envelope fields become validated domain ids.
        let event_id =
            EventId::new(envelope.event_id).map_err(|_| ReconcileError::MissingField("event_id"))?;
        let account_id = AccountId::new(envelope.account_id)
            .map_err(|_| ReconcileError::MissingField("account_id"))?;

        let event = BillingEvent::received(
            event_id.clone(),
            &envelope.event_type,
            account_id,
            serde_json::Value::Object(envelope.payload),
            Timestamp::now(),
        );

        // 3. Reconcile.
        let outcome = self.reconciler.process(event).await?;
        Ok(ProcessWebhookResult { event_id, outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::{sign_for_tests, MembershipLevel};
    use crate::ports::BillingStore;

    const SECRET: &str = "pdl_whsec_test";

    fn handler() -> (Arc<InMemoryBillingStore>, ProcessWebhookHandler) {
        let store = Arc::new(InMemoryBillingStore::new());
        let reconciler = Arc::new(Reconciler::new(store.clone()));
        let handler =
            ProcessWebhookHandler::new(PaddleWebhookVerifier::new(SECRET), reconciler);
        (store, handler)
    }

    fn signed_command(payload: &str) -> ProcessWebhookCommand {
        let timestamp = chrono::Utc::now().timestamp();
        ProcessWebhookCommand {
            payload: payload.as_bytes().to_vec(),
            signature_header: sign_for_tests(SECRET, timestamp, payload),
        }
    }

    #[tokio::test]
    async fn verified_upgrade_event_is_applied() {
        let (store, handler) = handler();
        let payload = r#"{
            "event_id": "evt_1",
            "event_type": "subscription_created",
            "account_id": "acct-1",
            "level": 2,
            "period_days": 30
        }"#;

        let result = handler.handle(signed_command(payload)).await.unwrap();
        assert_eq!(result.outcome, ReconciliationResult::Applied);
        assert_eq!(result.event_id.as_str(), "evt_1");

        let snapshot = store
            .load_snapshot(&AccountId::new("acct-1").unwrap())
            .await
            .unwrap();
        assert_eq!(snapshot.membership.level, MembershipLevel::Premium);
    }

    #[tokio::test]
    async fn redelivery_reports_duplicate() {
        let (_, handler) = handler();
        let payload = r#"{
            "event_id": "evt_1",
            "event_type": "credit_purchased",
            "account_id": "acct-1",
            "amount_cents": 500
        }"#;

        handler.handle(signed_command(payload)).await.unwrap();
        let result = handler.handle(signed_command(payload)).await.unwrap();
        assert_eq!(result.outcome, ReconciliationResult::Duplicate);
    }

    #[tokio::test]
    async fn rejects_bad_signature_without_touching_storage() {
        let (store, handler) = handler();
        let payload = r#"{
            "event_id": "evt_1",
            "event_type": "credit_purchased",
            "account_id": "acct-1",
            "amount_cents": 500
        }"#;
        let timestamp = chrono::Utc::now().timestamp();
        let cmd = ProcessWebhookCommand {
            payload: payload.as_bytes().to_vec(),
            signature_header: sign_for_tests("wrong_secret", timestamp, payload),
        };

        let err = handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidSignature));
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn rejects_stale_timestamp() {
        let (_, handler) = handler();
        let payload = r#"{"event_id":"evt_1","event_type":"x","account_id":"a"}"#;
        let stale = chrono::Utc::now().timestamp() - 600;
        let cmd = ProcessWebhookCommand {
            payload: payload.as_bytes().to_vec(),
            signature_header: sign_for_tests(SECRET, stale, payload),
        };

        let err = handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, ReconcileError::TimestampOutOfRange));
    }

    #[tokio::test]
    async fn rejects_envelope_missing_event_id() {
        let (_, handler) = handler();
        let payload = r#"{"event_type":"credit_purchased","account_id":"acct-1"}"#;

        let err = handler.handle(signed_command(payload)).await.unwrap_err();
        assert!(matches!(err, ReconcileError::ParseError(_)));
    }
}
