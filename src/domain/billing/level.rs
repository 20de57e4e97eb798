//! Membership level definitions.
//!
//! Represents the ordered subscription levels available in Storefront
//! Pilot, together with the per-level feature catalog the read API
//! exposes.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Membership subscription level.
///
/// Levels are totally ordered; upgrades move strictly upward and every
/// paid level expires back to Free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipLevel {
    /// No paid subscription. Assistant access disabled.
    Free,

    /// Entry paid level.
    Basic,

    /// Mid paid level.
    Premium,

    /// Top paid level.
    Max,
}

impl MembershipLevel {
    /// Returns true if this level is a paid level.
    pub fn is_paid(&self) -> bool {
        !matches!(self, MembershipLevel::Free)
    }

    /// Returns the display name for this level.
    pub fn display_name(&self) -> &'static str {
        match self {
            MembershipLevel::Free => "Free",
            MembershipLevel::Basic => "Basic",
            MembershipLevel::Premium => "Premium",
            MembershipLevel::Max => "Max",
        }
    }

    /// Returns the numeric rank of this level for comparison.
    ///
    /// Higher rank = more features. Used for upgrade ordering.
    pub fn rank(&self) -> u8 {
        match self {
            MembershipLevel::Free => 0,
            MembershipLevel::Basic => 1,
            MembershipLevel::Premium => 2,
            MembershipLevel::Max => 3,
        }
    }

    /// Builds a level from its numeric rank.
    pub fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            0 => Some(MembershipLevel::Free),
            1 => Some(MembershipLevel::Basic),
            2 => Some(MembershipLevel::Premium),
            3 => Some(MembershipLevel::Max),
            _ => None,
        }
    }

    /// Returns the feature limits for this level.
    pub fn features(&self) -> &'static LevelFeatures {
        &LEVEL_FEATURES[self]
    }
}

impl std::fmt::Display for MembershipLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Feature limits attached to a membership level.
#[derive(Debug, Clone, Serialize)]
pub struct LevelFeatures {
    /// Whether the storefront assistant may be used at all.
    pub assistant_enabled: bool,
    /// Maximum number of connected storefront sites.
    pub max_connected_sites: u32,
    /// Whether product image uploads are allowed.
    pub image_uploads: bool,
}

static LEVEL_FEATURES: Lazy<HashMap<MembershipLevel, LevelFeatures>> = Lazy::new(|| {
    HashMap::from([
        (
            MembershipLevel::Free,
            LevelFeatures {
                assistant_enabled: false,
                max_connected_sites: 0,
                image_uploads: false,
            },
        ),
        (
            MembershipLevel::Basic,
            LevelFeatures {
                assistant_enabled: true,
                max_connected_sites: 1,
                image_uploads: false,
            },
        ),
        (
            MembershipLevel::Premium,
            LevelFeatures {
                assistant_enabled: true,
                max_connected_sites: 3,
                image_uploads: true,
            },
        ),
        (
            MembershipLevel::Max,
            LevelFeatures {
                assistant_enabled: true,
                max_connected_sites: 10,
                image_uploads: true,
            },
        ),
    ])
});
