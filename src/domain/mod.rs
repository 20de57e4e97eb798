//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `billing` - Payment events, membership lifecycle, and the credit wallet

pub mod billing;
pub mod foundation;
