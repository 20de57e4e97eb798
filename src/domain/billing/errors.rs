//! Reconciliation error types.
//!
//! Defines the error conditions of webhook reconciliation, with HTTP
//! status code mapping and retryability semantics. The status the
//! gateway returns is what drives the provider's redelivery: 2xx
//! acknowledges, 5xx asks for another attempt.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur while reconciling a billing event.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is outside the acceptable replay window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Failed to parse webhook payload or signature header.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from the event payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Event type is not one this system consumes, or a refund arrived
    /// without a recognizable target.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    /// Attempted membership transition is not valid.
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// Optimistic-lock retries were exhausted by concurrent writers.
    #[error("Storage conflict: {0}")]
    StorageConflict(String),

    /// The outbound provider API is unreachable or persistently failing.
    #[error("Provider unavailable: {0}")]
    DownstreamUnavailable(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl ReconcileError {
    /// Returns true if the provider should retry delivering this event.
    ///
    /// Retryable errors are temporary: the same delivery may commit on
    /// a later attempt and dedup guarantees the retry is safe.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReconcileError::StorageConflict(_)
                | ReconcileError::Database(_)
                | ReconcileError::DownstreamUnavailable(_)
                | ReconcileError::UnknownEventType(_)
        )
    }

    /// Maps the error to an HTTP status code.
    ///
    /// - 2xx: acknowledged, no redelivery
    /// - 4xx: rejected before reconciliation, no redelivery
    /// - 5xx: failed, provider redelivers
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Auth failures - reject, don't retry
            ReconcileError::InvalidSignature | ReconcileError::TimestampOutOfRange => {
                StatusCode::UNAUTHORIZED
            }

            // Malformed input - reject, don't retry
            ReconcileError::ParseError(_) | ReconcileError::MissingField(_) => {
                StatusCode::BAD_REQUEST
            }

            // Recorded as failed; redelivery may succeed after a deploy
            // or config fix, and dedup keeps it safe either way.
            ReconcileError::UnknownEventType(_)
            | ReconcileError::InvalidTransition(_)
            | ReconcileError::StorageConflict(_)
            | ReconcileError::DownstreamUnavailable(_)
            | ReconcileError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Display Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn invalid_signature_displays_correctly() {
        assert_eq!(
            format!("{}", ReconcileError::InvalidSignature),
            "Invalid signature"
        );
    }

    #[test]
    fn unknown_event_type_displays_raw_type() {
        let err = ReconcileError::UnknownEventType("invoice.paid".to_string());
        assert_eq!(format!("{}", err), "Unknown event type: invoice.paid");
    }

    #[test]
    fn storage_conflict_displays_reason() {
        let err = ReconcileError::StorageConflict("version mismatch after 3 attempts".to_string());
        assert_eq!(
            format!("{}", err),
            "Storage conflict: version mismatch after 3 attempts"
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Retryability Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn storage_conflict_is_retryable() {
        assert!(ReconcileError::StorageConflict("race".to_string()).is_retryable());
    }

    #[test]
    fn database_error_is_retryable() {
        assert!(ReconcileError::Database("connection failed".to_string()).is_retryable());
    }

    #[test]
    fn downstream_unavailable_is_retryable() {
        assert!(ReconcileError::DownstreamUnavailable("timeout".to_string()).is_retryable());
    }

    #[test]
    fn unknown_event_type_is_retryable() {
        // Recorded as failed; a redelivery after a code change can apply it.
        assert!(ReconcileError::UnknownEventType("new_thing".to_string()).is_retryable());
    }

    #[test]
    fn invalid_signature_is_not_retryable() {
        assert!(!ReconcileError::InvalidSignature.is_retryable());
    }

    #[test]
    fn parse_error_is_not_retryable() {
        assert!(!ReconcileError::ParseError("bad json".to_string()).is_retryable());
    }

    #[test]
    fn missing_field_is_not_retryable() {
        assert!(!ReconcileError::MissingField("account_id").is_retryable());
    }

    // ══════════════════════════════════════════════════════════════
    // Status Code Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn signature_failures_return_unauthorized() {
        assert_eq!(
            ReconcileError::InvalidSignature.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ReconcileError::TimestampOutOfRange.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn malformed_input_returns_bad_request() {
        assert_eq!(
            ReconcileError::ParseError("syntax".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ReconcileError::MissingField("event_id").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn reconciliation_failures_return_internal_error() {
        for err in [
            ReconcileError::UnknownEventType("x".to_string()),
            ReconcileError::InvalidTransition("bad".to_string()),
            ReconcileError::StorageConflict("race".to_string()),
            ReconcileError::DownstreamUnavailable("down".to_string()),
            ReconcileError::Database("lost".to_string()),
        ] {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
