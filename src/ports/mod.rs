//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports;
//! handlers depend on them as `Arc<dyn Trait>` so storage and provider
//! backends stay swappable.

mod billing_provider;
mod billing_store;

pub use billing_provider::{BillingProvider, ProviderError};
pub use billing_store::{
    AccountSnapshot, BillingStore, CommitResult, CommitWrites, DowngradeResult,
};
