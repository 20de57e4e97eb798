//! Membership aggregate entity.
//!
//! One membership row per account. The row stores the paid level and
//! expiry; the lifecycle state (free / active / pending_cancel) is
//! derived from those fields rather than stored, so it can never drift
//! from them.
//!
//! # Design Decisions
//!
//! - **One per account**: unique constraint on account_id at the
//!   database level
//! - **Derived state**: no status column; `state(now)` computes it
//! - **Optimistic locking**: `version` guards concurrent writers
//! - **Commutative upgrades**: expiry extends from
//!   `max(now, expires_at)`, so a fixed set of upgrade events yields
//!   the same row in any delivery order

use crate::domain::foundation::{
    AccountId, DomainError, ErrorCode, StateMachine, Timestamp, ValidationError,
};
use serde::{Deserialize, Serialize};

use super::MembershipLevel;

/// Derived membership lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipState {
    /// No paid level, or the paid period has lapsed.
    Free,

    /// Paid level with a future expiry and no scheduled cancellation.
    Active,

    /// Paid level, cancellation scheduled for period end.
    /// Access continues until expiry.
    PendingCancel,
}

impl StateMachine for MembershipState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use MembershipState::*;
        matches!(
            (self, target),
            // From FREE
            (Free, Active)
            // From ACTIVE
                | (Active, Active) // upgrade / renewal
                | (Active, PendingCancel)
                | (Active, Free) // refund or expiry
            // From PENDING_CANCEL
                | (PendingCancel, Active) // resume, or a new purchase
                | (PendingCancel, Free)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use MembershipState::*;
        match self {
            Free => vec![Active],
            Active => vec![Active, PendingCancel, Free],
            PendingCancel => vec![Active, Free],
        }
    }
}

/// Membership aggregate - one account's subscription row.
///
/// # Invariants
///
/// - `account_id` is unique (one membership per account)
/// - `level == Free` implies `expires_at == None` and no cancel intent
/// - a paid level always carries an expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Account that owns this membership.
    pub account_id: AccountId,

    /// Current paid level (Free when none).
    pub level: MembershipLevel,

    /// End of the paid period. None for free accounts.
    pub expires_at: Option<Timestamp>,

    /// Whether a cancellation is scheduled for period end.
    pub cancel_at_period_end: bool,

    /// When the cancellation was requested, if one is scheduled.
    pub cancel_requested_at: Option<Timestamp>,

    /// Optimistic-lock version, bumped by the store on every commit.
    pub version: i64,

    /// When the row was last written.
    pub updated_at: Timestamp,
}

impl Membership {
    /// Creates the default free membership for an account.
    pub fn free(account_id: AccountId) -> Self {
        Self {
            account_id,
            level: MembershipLevel::Free,
            expires_at: None,
            cancel_at_period_end: false,
            cancel_requested_at: None,
            version: 0,
            updated_at: Timestamp::now(),
        }
    }

    /// Derives the lifecycle state at the given instant.
    ///
    /// A lapsed paid row reads as Free even before the sweeper has
    /// rewritten it.
    pub fn state(&self, now: Timestamp) -> MembershipState {
        if !self.level.is_paid() {
            return MembershipState::Free;
        }
        match self.expires_at {
            Some(expires_at) if expires_at.is_after(&now) => {
                if self.cancel_at_period_end {
                    MembershipState::PendingCancel
                } else {
                    MembershipState::Active
                }
            }
            _ => MembershipState::Free,
        }
    }

    /// Returns true if the paid period has lapsed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        match self.expires_at {
            Some(expires_at) => !expires_at.is_after(&now),
            None => false,
        }
    }

    /// Whole days remaining in the paid period. Zero once lapsed.
    pub fn days_remaining(&self, now: Timestamp) -> u32 {
        match self.expires_at {
            Some(expires_at) if expires_at.is_after(&now) => {
                expires_at.duration_since(&now).num_days().max(0) as u32
            }
            _ => 0,
        }
    }

    /// Applies a subscription purchase.
    ///
    /// The level only moves upward (the max-rule: a late-arriving lower
    /// purchase never demotes the row) and the expiry extends from
    /// `max(now, current expiry)` by the purchased period. A new
    /// purchase supersedes any scheduled cancellation.
    pub fn apply_upgrade(
        &mut self,
        purchased: MembershipLevel,
        period_days: i64,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        if !purchased.is_paid() {
            return Err(DomainError::validation(
                "level",
                "Subscription purchase must carry a paid level",
            ));
        }
        if period_days <= 0 {
            return Err(DomainError::validation(
                "period_days",
                format!("Period must be positive, got {}", period_days),
            ));
        }

        if purchased.rank() > self.level.rank() {
            self.level = purchased;
        }

        let base = match self.expires_at {
            Some(expires_at) => now.max(expires_at),
            None => now,
        };
        self.expires_at = Some(base.add_days(period_days));
        self.cancel_at_period_end = false;
        self.cancel_requested_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// Schedules cancellation for the end of the paid period.
    ///
    /// The level and expiry are untouched; access continues until the
    /// period lapses. Idempotent while already scheduled.
    pub fn schedule_cancel(&mut self, now: Timestamp) -> Result<(), DomainError> {
        match self.state(now) {
            MembershipState::Free => Err(self.invalid_transition(now, MembershipState::PendingCancel)),
            MembershipState::PendingCancel => Ok(()),
            MembershipState::Active => {
                self.cancel_at_period_end = true;
                self.cancel_requested_at = Some(now);
                self.updated_at = now;
                Ok(())
            }
        }
    }

    /// Clears a scheduled cancellation while the period is running.
    pub fn resume(&mut self, now: Timestamp) -> Result<(), DomainError> {
        if self.state(now) != MembershipState::PendingCancel {
            return Err(self.invalid_transition(now, MembershipState::Active));
        }
        self.cancel_at_period_end = false;
        self.cancel_requested_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// Drops the account to Free immediately, clearing expiry and any
    /// cancel intent. Used for refunds, the expired event, the sweeper,
    /// and administrative downgrades.
    ///
    /// Returns false when the row was already free (no write needed).
    pub fn force_downgrade(&mut self, now: Timestamp) -> bool {
        if self.level == MembershipLevel::Free
            && self.expires_at.is_none()
            && !self.cancel_at_period_end
        {
            return false;
        }
        self.level = MembershipLevel::Free;
        self.expires_at = None;
        self.cancel_at_period_end = false;
        self.cancel_requested_at = None;
        self.updated_at = now;
        true
    }

    /// Sets an exact level administratively, bypassing the max-rule.
    ///
    /// Paid levels get a fresh period from now; Free clears the row.
    pub fn set_level(
        &mut self,
        level: MembershipLevel,
        period_days: i64,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        if level.is_paid() {
            if period_days <= 0 {
                return Err(DomainError::validation(
                    "period_days",
                    format!("Period must be positive, got {}", period_days),
                ));
            }
            self.level = level;
            self.expires_at = Some(now.add_days(period_days));
            self.cancel_at_period_end = false;
            self.cancel_requested_at = None;
            self.updated_at = now;
        } else {
            self.force_downgrade(now);
        }
        Ok(())
    }

    fn invalid_transition(&self, now: Timestamp, target: MembershipState) -> DomainError {
        // Surface the state machine's wording for consistency.
        let err: ValidationError = match self.state(now).transition_to(target) {
            Err(e) => e,
            Ok(_) => ValidationError::invalid_format(
                "state_transition",
                format!("Transition to {:?} not applicable", target),
            ),
        };
        DomainError::new(ErrorCode::InvalidStateTransition, err.to_string())
            .with_detail("account_id", self.account_id.to_string())
    }
}
