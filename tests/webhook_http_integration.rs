//! HTTP-level tests for the billing API.
//!
//! Drives the full Axum router with `tower::ServiceExt::oneshot`,
//! including real HMAC signatures on the webhook path.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use storefront_pilot::adapters::http::{billing_router, BillingAppState};
use storefront_pilot::adapters::memory::InMemoryBillingStore;
use storefront_pilot::adapters::paddle::MockBillingProvider;
use storefront_pilot::domain::billing::{
    sign_for_tests, ExpirySweeper, PaddleWebhookVerifier, Reconciler,
};

const SECRET: &str = "pdl_ntfset_test_secret";

fn test_app() -> Router {
    let store = Arc::new(InMemoryBillingStore::new());
    let reconciler = Arc::new(Reconciler::new(store.clone()));
    let sweeper = Arc::new(ExpirySweeper::new(store.clone(), 100));
    let state = BillingAppState {
        store,
        provider: Arc::new(MockBillingProvider::new()),
        reconciler,
        sweeper,
        webhook_verifier: PaddleWebhookVerifier::new(SECRET),
    };
    Router::new().nest("/api", billing_router()).with_state(state)
}

fn signed_webhook(payload: &str) -> Request<Body> {
    let timestamp = chrono::Utc::now().timestamp();
    Request::builder()
        .method("POST")
        .uri("/api/webhooks/paddle")
        .header("Content-Type", "application/json")
        .header("Paddle-Signature", sign_for_tests(SECRET, timestamp, payload))
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn authed_get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("X-Account-Id", "acct-42")
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Path
// ════════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn signed_webhook_is_applied_and_replay_acknowledged_as_duplicate() {
    let app = test_app();
    let payload = json!({
        "event_id": "evt_100",
        "event_type": "subscription_created",
        "account_id": "acct-42",
        "level": 2,
        "period_days": 30
    })
    .to_string();

    let response = app.clone().oneshot(signed_webhook(&payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "applied");

    let response = app.clone().oneshot(signed_webhook(&payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "duplicate");

    // The membership reflects exactly one purchase.
    let response = app.oneshot(authed_get("/api/billing/membership")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["level"], "premium");
    assert_eq!(body["state"], "active");
    assert_eq!(body["days_remaining"], 29);
}

#[tokio::test]
async fn webhook_with_tampered_signature_is_rejected() {
    let app = test_app();
    let payload = json!({
        "event_id": "evt_101",
        "event_type": "credit_purchased",
        "account_id": "acct-42",
        "amount_cents": 500
    })
    .to_string();

    let timestamp = chrono::Utc::now().timestamp();
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/paddle")
        .header(
            "Paddle-Signature",
            sign_for_tests("wrong_secret", timestamp, &payload),
        )
        .body(Body::from(payload))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Nothing landed in the wallet.
    let response = app.oneshot(authed_get("/api/billing/wallet")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["balance_cents"], 0);
}

#[tokio::test]
async fn webhook_without_signature_header_is_bad_request() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/paddle")
        .body(Body::from("{}"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_event_type_returns_500_so_provider_redelivers() {
    let app = test_app();
    let payload = json!({
        "event_id": "evt_102",
        "event_type": "invoice.paid",
        "account_id": "acct-42"
    })
    .to_string();

    let response = app.oneshot(signed_webhook(&payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ════════════════════════════════════════════════════════════════════════════════
// Account Endpoints
// ════════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn membership_read_requires_account_header() {
    let app = test_app();
    let request = Request::builder()
        .method("GET")
        .uri("/api/billing/membership")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_account_reads_as_free_membership() {
    let app = test_app();
    let response = app.oneshot(authed_get("/api/billing/membership")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["level"], "free");
    assert_eq!(body["state"], "free");
    assert_eq!(body["features"]["assistant_enabled"], false);
}

#[tokio::test]
async fn top_up_without_membership_is_payment_required() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/billing/wallet/credit")
        .header("X-Account-Id", "acct-42")
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"amount_cents": 1000}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn member_top_up_credits_the_wallet() {
    let app = test_app();
    let payload = json!({
        "event_id": "evt_200",
        "event_type": "subscription_created",
        "account_id": "acct-42",
        "level": 1,
        "period_days": 30
    })
    .to_string();
    app.clone().oneshot(signed_webhook(&payload)).await.unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/api/billing/wallet/credit")
        .header("X-Account-Id", "acct-42")
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"amount_cents": 2500}"#))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.oneshot(authed_get("/api/billing/wallet")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["balance_cents"], 2500);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn cancel_and_resume_round_trip() {
    let app = test_app();
    let payload = json!({
        "event_id": "evt_300",
        "event_type": "subscription_created",
        "account_id": "acct-42",
        "level": 2,
        "period_days": 30
    })
    .to_string();
    app.clone().oneshot(signed_webhook(&payload)).await.unwrap();

    let cancel = Request::builder()
        .method("POST")
        .uri("/api/billing/membership/cancel")
        .header("X-Account-Id", "acct-42")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(cancel).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["state"], "pending_cancel");
    // Access continues for the rest of the paid period.
    assert_eq!(body["level"], "premium");

    let resume = Request::builder()
        .method("POST")
        .uri("/api/billing/membership/resume")
        .header("X-Account-Id", "acct-42")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(resume).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["state"], "active");
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin Endpoints
// ════════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn admin_force_credit_adjusts_any_wallet() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/billing/credit")
        .header("Content-Type", "application/json")
        .body(Body::from(
            r#"{"account_id": "acct-42", "amount_cents": 750}"#,
        ))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["balance_cents"], 750);
}

#[tokio::test]
async fn admin_level_override_and_sweep() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/billing/membership-level")
        .header("Content-Type", "application/json")
        .body(Body::from(
            r#"{"account_id": "acct-42", "level": "max", "period_days": 30}"#,
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["level"], "max");

    // Nothing has lapsed, so the sweep reports no work.
    let sweep = Request::builder()
        .method("POST")
        .uri("/api/admin/billing/sweep")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(sweep).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["downgraded"], 0);
}

#[tokio::test]
async fn refund_shortfalls_are_listed() {
    let app = test_app();
    let credit = json!({
        "event_id": "evt_400",
        "event_type": "credit_purchased",
        "account_id": "acct-42",
        "amount_cents": 300
    })
    .to_string();
    app.clone().oneshot(signed_webhook(&credit)).await.unwrap();

    let refund = json!({
        "event_id": "evt_401",
        "event_type": "payment_refunded",
        "account_id": "acct-42",
        "purchase_type": "credit",
        "amount_cents": 900
    })
    .to_string();
    app.clone().oneshot(signed_webhook(&refund)).await.unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/api/admin/billing/refund-shortfalls")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let shortfalls = body.as_array().unwrap();
    assert_eq!(shortfalls.len(), 1);
    assert_eq!(shortfalls[0]["missing_cents"], 600);
}
