//! Paddle adapters - outbound payment provider integration.

mod client;
mod mock_provider;

pub use client::{PaddleClient, PaddleConfig};
pub use mock_provider::MockBillingProvider;
