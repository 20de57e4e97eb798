//! Expiry sweeper - downgrades paid memberships whose period ran out.
//!
//! The sweep is a safety net behind `subscription_expired` events: when
//! the provider's event is delayed or lost, the row still reads as free
//! (state is derived from `expires_at`), and the sweep makes storage
//! match. Each downgrade is version-checked so a renewal that lands
//! between the candidate query and the write wins the row and the sweep
//! skips it.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{BillingStore, DowngradeResult};

/// Periodically downgrades expired paid memberships.
pub struct ExpirySweeper {
    store: Arc<dyn BillingStore>,
    batch_size: i64,
}

/// Counts from one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Rows downgraded to free.
    pub downgraded: u64,
    /// Rows skipped because a concurrent writer won the version check.
    pub skipped: u64,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn BillingStore>, batch_size: i64) -> Self {
        Self { store, batch_size }
    }

    /// Runs one sweep pass over at most `batch_size` expired rows.
    ///
    /// Version losses are normal operation, not errors: the account
    /// renewed while the sweep was looking at it, and the next pass
    /// will not select the row again.
    pub async fn sweep(&self, now: Timestamp) -> Result<SweepReport, DomainError> {
        let candidates = self.store.expired_memberships(now, self.batch_size).await?;
        let mut report = SweepReport::default();

        for mut membership in candidates {
            if !membership.force_downgrade(now) {
                continue;
            }
            match self.store.commit_downgrade(&membership).await? {
                DowngradeResult::Downgraded => {
                    debug!(account_id = %membership.account_id, "swept expired membership");
                    report.downgraded += 1;
                }
                DowngradeResult::Skipped => {
                    debug!(
                        account_id = %membership.account_id,
                        "skipping sweep, row changed concurrently"
                    );
                    report.skipped += 1;
                }
            }
        }

        if report.downgraded > 0 {
            info!(
                downgraded = report.downgraded,
                skipped = report.skipped,
                "expiry sweep pass complete"
            );
        }
        Ok(report)
    }
}
