//! PostgreSQL adapters - Database implementations for storage ports.

mod billing_store;

pub use billing_store::PostgresBillingStore;
