//! In-memory adapters for local development and tests.

mod billing_store;

pub use billing_store::InMemoryBillingStore;
