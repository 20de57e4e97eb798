//! HTTP adapter for billing endpoints.
//!
//! Exposes the billing domain via REST API:
//! - `GET /api/billing/membership` - Current account's membership
//! - `GET /api/billing/wallet` - Wallet balance and recent ledger
//! - `POST /api/billing/wallet/credit` - Top up the wallet
//! - `POST /api/billing/membership/cancel` - Schedule cancellation
//! - `POST /api/billing/membership/resume` - Undo a scheduled cancel
//! - `POST /api/webhooks/paddle` - Handle Paddle webhooks
//! - `POST /api/admin/billing/credit` - Force a wallet adjustment
//! - `POST /api/admin/billing/membership-level` - Set an exact level
//! - `POST /api/admin/billing/sweep` - Run one expiry sweep pass
//! - `GET /api/admin/billing/refund-shortfalls` - List shortfalls

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::BillingAppState;
pub use routes::{admin_routes, billing_router, billing_routes, webhook_routes};
