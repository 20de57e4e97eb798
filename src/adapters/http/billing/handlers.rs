//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer
//! command/query handlers.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::billing::{
    CancelMembershipCommand, CancelMembershipHandler, CreditWalletCommand, CreditWalletHandler,
    ForceCreditCommand, ForceCreditHandler, ForceMembershipLevelCommand,
    ForceMembershipLevelHandler, GetMembershipHandler, GetMembershipQuery, GetWalletHandler,
    GetWalletQuery, ProcessWebhookCommand, ProcessWebhookHandler, ResumeMembershipCommand,
    ResumeMembershipHandler, SweepExpiredHandler,
};
use crate::domain::billing::{
    ExpirySweeper, PaddleWebhookVerifier, ReconcileError, Reconciler, ReconciliationResult,
};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode};
use crate::ports::{BillingProvider, BillingStore};

use super::dto::{
    BalanceResponse, CreditWalletRequest, ErrorResponse, ForceCreditRequest,
    ForceMembershipLevelRequest, MembershipResponse, RefundShortfallResponse, SweepResponse,
    WalletResponse, WebhookAckResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped
/// dependencies for efficient sharing across handlers.
#[derive(Clone)]
pub struct BillingAppState {
    pub store: Arc<dyn BillingStore>,
    pub provider: Arc<dyn BillingProvider>,
    pub reconciler: Arc<Reconciler>,
    pub sweeper: Arc<ExpirySweeper>,
    pub webhook_verifier: PaddleWebhookVerifier,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn webhook_handler(&self) -> ProcessWebhookHandler {
        ProcessWebhookHandler::new(self.webhook_verifier.clone(), self.reconciler.clone())
    }

    pub fn get_membership_handler(&self) -> GetMembershipHandler {
        GetMembershipHandler::new(self.store.clone())
    }

    pub fn get_wallet_handler(&self) -> GetWalletHandler {
        GetWalletHandler::new(self.store.clone())
    }

    pub fn credit_wallet_handler(&self) -> CreditWalletHandler {
        CreditWalletHandler::new(self.store.clone(), self.reconciler.clone())
    }

    pub fn cancel_membership_handler(&self) -> CancelMembershipHandler {
        CancelMembershipHandler::new(self.store.clone(), self.provider.clone())
    }

    pub fn resume_membership_handler(&self) -> ResumeMembershipHandler {
        ResumeMembershipHandler::new(self.store.clone(), self.provider.clone())
    }

    pub fn force_credit_handler(&self) -> ForceCreditHandler {
        ForceCreditHandler::new(self.reconciler.clone())
    }

    pub fn force_membership_level_handler(&self) -> ForceMembershipLevelHandler {
        ForceMembershipLevelHandler::new(self.reconciler.clone())
    }

    pub fn sweep_handler(&self) -> SweepExpiredHandler {
        SweepExpiredHandler::new(self.sweeper.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Account Context (would come from auth middleware in production)
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated account context extracted from the request.
///
/// In production, this would be extracted from JWT/session by auth
/// middleware. For now, uses a header-based extraction for
/// development/testing.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub account_id: AccountId,
}

/// Rejection type for AuthenticatedAccount extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedAccount
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let account_id = parts
                .headers
                .get("X-Account-Id")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| AccountId::new(s).ok())
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedAccount { account_id })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Endpoint
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/paddle - Handle Paddle webhook deliveries.
///
/// Status codes steer the provider's redelivery: 2xx acknowledges
/// (including duplicates), 4xx means the delivery itself is bad and
/// retrying won't help, 5xx asks for redelivery.
pub async fn handle_paddle_webhook(
    State(state): State<BillingAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get("Paddle-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookApiError(ReconcileError::MissingField(
            "Paddle-Signature",
        )))?;

    let handler = state.webhook_handler();
    let cmd = ProcessWebhookCommand {
        payload: body.to_vec(),
        signature_header: signature.to_string(),
    };

    let result = handler.handle(cmd).await?;

    let response = WebhookAckResponse {
        event_id: result.event_id.as_str().to_string(),
        outcome: match result.outcome {
            ReconciliationResult::Applied => "applied",
            ReconciliationResult::Duplicate => "duplicate",
        },
    };
    Ok(Json(response))
}

// ════════════════════════════════════════════════════════════════════════════════
// Account Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/billing/membership - Current account's membership view.
pub async fn get_membership(
    State(state): State<BillingAppState>,
    account: AuthenticatedAccount,
) -> Result<impl IntoResponse, BillingApiError> {
    let view = state
        .get_membership_handler()
        .handle(GetMembershipQuery {
            account_id: account.account_id,
        })
        .await?;
    Ok(Json(MembershipResponse::from(view)))
}

/// GET /api/billing/wallet - Current account's balance and recent ledger.
pub async fn get_wallet(
    State(state): State<BillingAppState>,
    account: AuthenticatedAccount,
) -> Result<impl IntoResponse, BillingApiError> {
    let view = state
        .get_wallet_handler()
        .handle(GetWalletQuery {
            account_id: account.account_id,
        })
        .await?;
    Ok(Json(WalletResponse::from(view)))
}

/// POST /api/billing/wallet/credit - Top up the wallet (members only).
pub async fn credit_wallet(
    State(state): State<BillingAppState>,
    account: AuthenticatedAccount,
    Json(request): Json<CreditWalletRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let balance = state
        .credit_wallet_handler()
        .handle(CreditWalletCommand {
            account_id: account.account_id,
            amount_cents: request.amount_cents,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(BalanceResponse::from(balance))))
}

/// POST /api/billing/membership/cancel - Schedule cancellation at
/// period end.
pub async fn cancel_membership(
    State(state): State<BillingAppState>,
    account: AuthenticatedAccount,
) -> Result<impl IntoResponse, BillingApiError> {
    let membership = state
        .cancel_membership_handler()
        .handle(CancelMembershipCommand {
            account_id: account.account_id,
        })
        .await?;
    let view = state
        .get_membership_handler()
        .handle(GetMembershipQuery {
            account_id: membership.account_id,
        })
        .await?;
    Ok(Json(MembershipResponse::from(view)))
}

/// POST /api/billing/membership/resume - Undo a scheduled cancellation.
pub async fn resume_membership(
    State(state): State<BillingAppState>,
    account: AuthenticatedAccount,
) -> Result<impl IntoResponse, BillingApiError> {
    let membership = state
        .resume_membership_handler()
        .handle(ResumeMembershipCommand {
            account_id: account.account_id,
        })
        .await?;
    let view = state
        .get_membership_handler()
        .handle(GetMembershipQuery {
            account_id: membership.account_id,
        })
        .await?;
    Ok(Json(MembershipResponse::from(view)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin Endpoints (would check admin role in production)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/admin/billing/credit - Signed wallet adjustment.
pub async fn force_credit(
    State(state): State<BillingAppState>,
    Json(request): Json<ForceCreditRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let account_id = AccountId::new(request.account_id).map_err(DomainError::from)?;
    let balance = state
        .force_credit_handler()
        .handle(ForceCreditCommand {
            account_id,
            amount_cents: request.amount_cents,
        })
        .await?;
    Ok(Json(BalanceResponse::from(balance)))
}

/// POST /api/admin/billing/membership-level - Set an exact level.
pub async fn force_membership_level(
    State(state): State<BillingAppState>,
    Json(request): Json<ForceMembershipLevelRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let account_id = AccountId::new(request.account_id).map_err(DomainError::from)?;
    state
        .force_membership_level_handler()
        .handle(ForceMembershipLevelCommand {
            account_id: account_id.clone(),
            level: request.level,
            period_days: request.period_days,
        })
        .await?;
    let view = state
        .get_membership_handler()
        .handle(GetMembershipQuery { account_id })
        .await?;
    Ok(Json(MembershipResponse::from(view)))
}

/// POST /api/admin/billing/sweep - Run one expiry sweep pass now.
pub async fn sweep_expired(
    State(state): State<BillingAppState>,
) -> Result<impl IntoResponse, BillingApiError> {
    let report = state.sweep_handler().handle().await?;
    Ok(Json(SweepResponse::from(report)))
}

/// GET /api/admin/billing/refund-shortfalls - Outstanding shortfalls.
pub async fn list_refund_shortfalls(
    State(state): State<BillingAppState>,
) -> Result<impl IntoResponse, BillingApiError> {
    let shortfalls = state.store.refund_shortfalls(100).await?;
    let response: Vec<RefundShortfallResponse> = shortfalls
        .into_iter()
        .map(RefundShortfallResponse::from)
        .collect();
    Ok(Json(response))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
pub struct BillingApiError(DomainError);

impl From<DomainError> for BillingApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0.code {
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,
            ErrorCode::MembershipNotFound | ErrorCode::EventNotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidStateTransition
            | ErrorCode::StorageConflict
            | ErrorCode::DuplicateEvent
            | ErrorCode::InsufficientBalance => StatusCode::CONFLICT,
            ErrorCode::MembershipRequired => StatusCode::PAYMENT_REQUIRED,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::ProviderError => StatusCode::BAD_GATEWAY,
            ErrorCode::DownstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::UnknownEventType => StatusCode::BAD_REQUEST,
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorResponse::new(self.0.code.to_string(), self.0.message);
        (status, Json(body)).into_response()
    }
}

/// Error wrapper for the webhook endpoint, where status codes follow
/// the reconciliation error taxonomy instead of the domain error codes.
pub struct WebhookApiError(ReconcileError);

impl From<ReconcileError> for WebhookApiError {
    fn from(err: ReconcileError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        let body = ErrorResponse::new("WEBHOOK_REJECTED", self.0.to_string());
        (status, Json(body)).into_response()
    }
}
