//! Paddle webhook signature verification.
//!
//! Implements verification of Paddle webhook signatures using
//! HMAC-SHA256, with timestamp validation to reject replayed
//! deliveries.

use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::ReconcileError;

/// Maximum allowed age for webhook deliveries (5 minutes).
pub const MAX_EVENT_AGE_SECS: i64 = 300;

/// Maximum allowed clock skew for future timestamps (1 minute).
pub const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components of the Paddle-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// h1 signature (HMAC-SHA256).
    pub h1_signature: Vec<u8>,
}

impl SignatureHeader {
    /// Parses a Paddle-Signature header string.
    ///
    /// Format: `ts=<timestamp>;h1=<signature>`
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::ParseError` if the header format is
    /// invalid.
    pub fn parse(header: &str) -> Result<Self, ReconcileError> {
        let mut timestamp: Option<i64> = None;
        let mut h1_signature: Option<Vec<u8>> = None;

        for part in header.split(';') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| ReconcileError::ParseError("invalid header format".to_string()))?;

            match key {
                "ts" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        ReconcileError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "h1" => {
                    h1_signature = Some(hex::decode(value).map_err(|_| {
                        ReconcileError::ParseError("invalid h1 signature hex".to_string())
                    })?);
                }
                _ => {
                    // Ignore unknown fields for forward compatibility
                }
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| ReconcileError::ParseError("missing timestamp".to_string()))?;
        let h1_signature = h1_signature
            .ok_or_else(|| ReconcileError::ParseError("missing h1 signature".to_string()))?;

        Ok(SignatureHeader {
            timestamp,
            h1_signature,
        })
    }
}

/// Verifier for Paddle webhook signatures.
#[derive(Clone)]
pub struct PaddleWebhookVerifier {
    /// The webhook signing secret from the Paddle dashboard.
    secret: String,
}

impl PaddleWebhookVerifier {
    /// Creates a new verifier with the given webhook secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verifies the webhook signature and parses the payload.
    ///
    /// # Verification Steps
    ///
    /// 1. Parse the signature header
    /// 2. Validate timestamp is within the replay window
    /// 3. Compute expected signature over `"{ts}:{body}"`
    /// 4. Compare signatures using constant-time comparison
    /// 5. Deserialize the JSON payload
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` - signature verification failed
    /// - `TimestampOutOfRange` - delivery too old or too far in the future
    /// - `ParseError` - malformed header or JSON payload
    pub fn verify_and_parse<T: DeserializeOwned>(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<T, ReconcileError> {
        let header = SignatureHeader::parse(signature_header)?;

        self.validate_timestamp(header.timestamp)?;

        let expected_signature = self.compute_signature(header.timestamp, payload);
        if !constant_time_compare(&expected_signature, &header.h1_signature) {
            return Err(ReconcileError::InvalidSignature);
        }

        serde_json::from_slice(payload).map_err(|e| ReconcileError::ParseError(e.to_string()))
    }

    /// Validates that the timestamp is within acceptable bounds.
    fn validate_timestamp(&self, timestamp: i64) -> Result<(), ReconcileError> {
        let now = chrono::Utc::now().timestamp();
        let age = now - timestamp;

        if age > MAX_EVENT_AGE_SECS {
            return Err(ReconcileError::TimestampOutOfRange);
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(ReconcileError::TimestampOutOfRange);
        }

        Ok(())
    }

    /// Computes the HMAC-SHA256 signature for the given timestamp and
    /// payload.
    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Vec<u8> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b":");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Performs constant-time comparison of two byte slices.
///
/// Prevents timing attacks that could leak information about the
/// expected signature.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes a valid `Paddle-Signature` header value for test fixtures.
pub fn sign_for_tests(secret: &str, timestamp: i64, payload: &str) -> String {
    let signed_payload = format!("{}:{}", timestamp, payload);
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(signed_payload.as_bytes());
    format!("ts={};h1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const TEST_SECRET: &str = "pdl_ntfset_test_secret_12345";

    // ══════════════════════════════════════════════════════════════
    // SignatureHeader Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_well_formed_header() {
        let signature = "a".repeat(64);
        let header_str = format!("ts=1234567890;h1={}", signature);

        let header = SignatureHeader::parse(&header_str).unwrap();

        assert_eq!(header.timestamp, 1234567890);
        assert_eq!(header.h1_signature.len(), 32); // 64 hex chars = 32 bytes
    }

    #[test]
    fn parse_header_ignores_unknown_fields() {
        let signature = "a".repeat(64);
        let header_str = format!("ts=1234567890;h1={};h2=future", signature);

        let header = SignatureHeader::parse(&header_str).unwrap();
        assert_eq!(header.timestamp, 1234567890);
    }

    #[test]
    fn parse_header_missing_timestamp_fails() {
        let header_str = format!("h1={}", "a".repeat(64));
        assert!(matches!(
            SignatureHeader::parse(&header_str),
            Err(ReconcileError::ParseError(_))
        ));
    }

    #[test]
    fn parse_header_missing_signature_fails() {
        assert!(matches!(
            SignatureHeader::parse("ts=1234567890"),
            Err(ReconcileError::ParseError(_))
        ));
    }

    #[test]
    fn parse_header_invalid_timestamp_fails() {
        let header_str = format!("ts=not_a_number;h1={}", "a".repeat(64));
        assert!(matches!(
            SignatureHeader::parse(&header_str),
            Err(ReconcileError::ParseError(_))
        ));
    }

    #[test]
    fn parse_header_invalid_hex_fails() {
        assert!(matches!(
            SignatureHeader::parse("ts=1234567890;h1=not_valid_hex"),
            Err(ReconcileError::ParseError(_))
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Signature Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verify_valid_signature() {
        let verifier = PaddleWebhookVerifier::new(TEST_SECRET);
        let payload = r#"{"event_id":"evt_test123","event_type":"credit_purchased"}"#;
        let timestamp = chrono::Utc::now().timestamp();
        let header = sign_for_tests(TEST_SECRET, timestamp, payload);

        let parsed: Value = verifier.verify_and_parse(payload.as_bytes(), &header).unwrap();
        assert_eq!(parsed["event_id"], "evt_test123");
    }

    #[test]
    fn verify_invalid_signature_fails() {
        let verifier = PaddleWebhookVerifier::new(TEST_SECRET);
        let payload = r#"{"event_id":"evt_test"}"#;
        let timestamp = chrono::Utc::now().timestamp();
        let header = format!("ts={};h1={}", timestamp, "a".repeat(64));

        let result: Result<Value, _> = verifier.verify_and_parse(payload.as_bytes(), &header);
        assert!(matches!(result, Err(ReconcileError::InvalidSignature)));
    }

    #[test]
    fn verify_wrong_secret_fails() {
        let verifier = PaddleWebhookVerifier::new("wrong_secret");
        let payload = r#"{"event_id":"evt_test"}"#;
        let timestamp = chrono::Utc::now().timestamp();
        let header = sign_for_tests(TEST_SECRET, timestamp, payload);

        let result: Result<Value, _> = verifier.verify_and_parse(payload.as_bytes(), &header);
        assert!(matches!(result, Err(ReconcileError::InvalidSignature)));
    }

    #[test]
    fn verify_tampered_payload_fails() {
        let verifier = PaddleWebhookVerifier::new(TEST_SECRET);
        let original = r#"{"amount_cents":100}"#;
        let tampered = r#"{"amount_cents":10000}"#;
        let timestamp = chrono::Utc::now().timestamp();
        let header = sign_for_tests(TEST_SECRET, timestamp, original);

        let result: Result<Value, _> = verifier.verify_and_parse(tampered.as_bytes(), &header);
        assert!(matches!(result, Err(ReconcileError::InvalidSignature)));
    }

    // ══════════════════════════════════════════════════════════════
    // Timestamp Validation Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn timestamp_within_window_succeeds() {
        let verifier = PaddleWebhookVerifier::new(TEST_SECRET);
        // 2 minutes ago - within 5 minute window
        let timestamp = chrono::Utc::now().timestamp() - 120;
        assert!(verifier.validate_timestamp(timestamp).is_ok());
    }

    #[test]
    fn timestamp_too_old_fails() {
        let verifier = PaddleWebhookVerifier::new(TEST_SECRET);
        // 10 minutes ago - outside window
        let timestamp = chrono::Utc::now().timestamp() - 600;
        assert!(matches!(
            verifier.validate_timestamp(timestamp),
            Err(ReconcileError::TimestampOutOfRange)
        ));
    }

    #[test]
    fn timestamp_at_boundary_succeeds() {
        let verifier = PaddleWebhookVerifier::new(TEST_SECRET);
        let timestamp = chrono::Utc::now().timestamp() - MAX_EVENT_AGE_SECS;
        assert!(verifier.validate_timestamp(timestamp).is_ok());
    }

    #[test]
    fn timestamp_from_future_within_skew_succeeds() {
        let verifier = PaddleWebhookVerifier::new(TEST_SECRET);
        let timestamp = chrono::Utc::now().timestamp() + 30;
        assert!(verifier.validate_timestamp(timestamp).is_ok());
    }

    #[test]
    fn timestamp_from_future_beyond_skew_fails() {
        let verifier = PaddleWebhookVerifier::new(TEST_SECRET);
        let timestamp = chrono::Utc::now().timestamp() + 120;
        assert!(matches!(
            verifier.validate_timestamp(timestamp),
            Err(ReconcileError::TimestampOutOfRange)
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Payload Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verify_invalid_json_fails_after_signature_check() {
        let verifier = PaddleWebhookVerifier::new(TEST_SECRET);
        let payload = "not valid json";
        let timestamp = chrono::Utc::now().timestamp();
        let header = sign_for_tests(TEST_SECRET, timestamp, payload);

        let result: Result<Value, _> = verifier.verify_and_parse(payload.as_bytes(), &header);
        assert!(matches!(result, Err(ReconcileError::ParseError(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Constant Time Comparison Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn constant_time_compare_equal_values() {
        assert!(constant_time_compare(&[1, 2, 3], &[1, 2, 3]));
    }

    #[test]
    fn constant_time_compare_different_values() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 4]));
    }

    #[test]
    fn constant_time_compare_different_lengths() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 3, 4]));
    }
}
