//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;

pub use handlers::billing::{
    CancelMembershipCommand, CancelMembershipHandler, CreditWalletCommand, CreditWalletHandler,
    ForceCreditCommand, ForceCreditHandler, ForceMembershipLevelCommand,
    ForceMembershipLevelHandler, GetMembershipHandler, GetMembershipQuery, GetWalletHandler,
    GetWalletQuery, MembershipView, ProcessWebhookCommand, ProcessWebhookHandler,
    ProcessWebhookResult, ResumeMembershipCommand, ResumeMembershipHandler, SweepExpiredHandler,
    WalletView,
};
