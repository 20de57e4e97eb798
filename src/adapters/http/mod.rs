//! HTTP adapters - REST API surface built on Axum.

pub mod billing;

pub use billing::{billing_router, BillingAppState};
