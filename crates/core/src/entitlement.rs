//! Plan tiers, billing periods, and quota math.
//!
//! The gate itself (read the usage row, write the increment) lives in the
//! pipeline crate; everything here is pure so it can be tested without a
//! database.

use chrono::{Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Plan tiers
// ---------------------------------------------------------------------------

/// Subscription tier of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
    Team,
}

impl PlanTier {
    /// Database representation.
    pub fn as_str(self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
            PlanTier::Team => "team",
        }
    }

    /// Parse the database representation. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(PlanTier::Free),
            "pro" => Some(PlanTier::Pro),
            "team" => Some(PlanTier::Team),
            _ => None,
        }
    }

    /// Monthly generation quota assigned at install time.
    pub fn default_monthly_quota(self) -> i32 {
        match self {
            PlanTier::Free => 10,
            PlanTier::Pro => 100,
            PlanTier::Team => 500,
        }
    }

    /// Maximum number of monitored channels per workspace.
    pub fn channel_ceiling(self) -> i64 {
        match self {
            PlanTier::Free => 2,
            PlanTier::Pro => 10,
            PlanTier::Team => 50,
        }
    }

    /// Whether artifacts produced under this plan carry a watermark.
    pub fn watermarks_outputs(self) -> bool {
        matches!(self, PlanTier::Free)
    }
}

// ---------------------------------------------------------------------------
// Billing period
// ---------------------------------------------------------------------------

/// Start of the billing period containing `now`: the first of the month,
/// 00:00 UTC.
pub fn period_start(now: Timestamp) -> Timestamp {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .expect("first of month is always a valid UTC timestamp")
}

// ---------------------------------------------------------------------------
// Quota decision
// ---------------------------------------------------------------------------

/// Result of an entitlement check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitlementDecision {
    pub allowed: bool,
    pub used: i32,
    pub quota: i32,
}

/// Decide whether one more unit of work may be admitted.
///
/// The effective quota is the plan quota plus any non-expiring bonus
/// credits the workspace has purchased.
pub fn decide(used: i32, plan_quota: i32, bonus_credits: i32) -> EntitlementDecision {
    let quota = plan_quota.saturating_add(bonus_credits);
    EntitlementDecision {
        allowed: used < quota,
        used,
        quota,
    }
}

/// Whether the artifact for the *next* committed unit must be watermarked.
///
/// Bonus-credit-funded generations are exempt even on a watermarked plan:
/// once `used` has reached the base plan quota, further units draw on
/// bonus credits, which are a paid add-on.
pub fn requires_watermark(tier: PlanTier, used: i32, plan_quota: i32) -> bool {
    tier.watermarks_outputs() && used < plan_quota
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
