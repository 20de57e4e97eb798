//! Billing handlers - webhook processing, reads, and account actions.

mod admin_ops;
mod cancel_membership;
mod credit_wallet;
mod get_membership;
mod get_wallet;
mod process_webhook;

pub use admin_ops::{
    ForceCreditCommand, ForceCreditHandler, ForceMembershipLevelCommand,
    ForceMembershipLevelHandler, SweepExpiredHandler,
};
pub use cancel_membership::{
    CancelMembershipCommand, CancelMembershipHandler, ResumeMembershipCommand,
    ResumeMembershipHandler,
};
pub use credit_wallet::{CreditWalletCommand, CreditWalletHandler};
pub use get_membership::{GetMembershipHandler, GetMembershipQuery, MembershipView};
pub use get_wallet::{GetWalletHandler, GetWalletQuery, WalletView};
pub use process_webhook::{ProcessWebhookCommand, ProcessWebhookHandler, ProcessWebhookResult};
