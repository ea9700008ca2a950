//! Entitlement models
//!
//! Types produced and consumed by the entitlement engine: the premium
//! feature set, the per-day scan ledger entry, and the decision value
//! returned by quota checks.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::SubscriptionTier;

/// Daily identification scans permitted on the free tier
pub const FREE_DAILY_SCAN_LIMIT: i64 = 3;

/// Sentinel value meaning "no scan limit" in remaining-count fields
pub const UNLIMITED_SCANS: i64 = -1;

/// Premium capabilities gated by subscription tier.
///
/// Every feature here is unlocked by the same condition (tier is not free).
/// The flat rule is intentional; modeling features as a set keeps room for
/// per-tier differentiation later without restructuring callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    UnlimitedScans,
    MigrationMaps,
    FullAudioLibrary,
    UnlimitedSightingStorage,
    CommunityPosting,
    OfflineMode,
    PushNotifications,
}

impl Feature {
    /// All gated features, useful for building entitlement summaries
    pub const ALL: [Feature; 7] = [
        Feature::UnlimitedScans,
        Feature::MigrationMaps,
        Feature::FullAudioLibrary,
        Feature::UnlimitedSightingStorage,
        Feature::CommunityPosting,
        Feature::OfflineMode,
        Feature::PushNotifications,
    ];
}

/// The feature set unlocked at a given tier.
///
/// Free unlocks nothing; both premium tiers unlock everything.
pub fn unlocked_features(tier: SubscriptionTier) -> &'static [Feature] {
    match tier {
        SubscriptionTier::Free => &[],
        SubscriptionTier::PremiumMonthly | SubscriptionTier::PremiumYearly => &Feature::ALL,
    }
}

/// Per-user, per-day counter of consumed identification scans.
///
/// At most one entry exists per (user_id, scan_date); the count never
/// decreases within a day. A missing entry for today means zero scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanLedgerEntry {
    /// Account the entry belongs to
    pub user_id: i64,
    /// Calendar day the entry covers
    pub scan_date: NaiveDate,
    /// Scans consumed on that day
    pub count: i64,
    /// Last increment timestamp
    pub updated_at: DateTime<Utc>,
}

/// Reason a quota check denied the action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    DailyLimitReached,
}

/// Outcome of a scan quota check. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntitlementDecision {
    /// Whether the scan may proceed
    pub allowed: bool,
    /// Additional scans permitted today; `UNLIMITED_SCANS` (-1) on premium
    pub remaining: i64,
    /// Populated only on denial
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenyReason>,
}

impl EntitlementDecision {
    /// Decision for a premium-tier scan: always allowed, never counted
    pub fn unlimited() -> Self {
        Self {
            allowed: true,
            remaining: UNLIMITED_SCANS,
            reason: None,
        }
    }

    /// Decision for a free-tier scan that fit under the daily limit
    pub fn allowed_with_remaining(remaining: i64) -> Self {
        Self {
            allowed: true,
            remaining,
            reason: None,
        }
    }

    /// Decision for a free-tier scan denied by the daily limit
    pub fn limit_reached() -> Self {
        Self {
            allowed: false,
            remaining: 0,
            reason: Some(DenyReason::DailyLimitReached),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_tier_unlocks_nothing() {
        assert!(unlocked_features(SubscriptionTier::Free).is_empty());
    }

    #[test]
    fn test_premium_tiers_unlock_everything() {
        for tier in [
            SubscriptionTier::PremiumMonthly,
            SubscriptionTier::PremiumYearly,
        ] {
            let features = unlocked_features(tier);
            assert_eq!(features.len(), Feature::ALL.len());
            for feature in Feature::ALL {
                assert!(features.contains(&feature));
            }
        }
    }

    #[test]
    fn test_decision_constructors() {
        let unlimited = EntitlementDecision::unlimited();
        assert!(unlimited.allowed);
        assert_eq!(unlimited.remaining, UNLIMITED_SCANS);
        assert!(unlimited.reason.is_none());

        let allowed = EntitlementDecision::allowed_with_remaining(2);
        assert!(allowed.allowed);
        assert_eq!(allowed.remaining, 2);

        let denied = EntitlementDecision::limit_reached();
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.reason, Some(DenyReason::DailyLimitReached));
    }

    #[test]
    fn test_deny_reason_serializes_screaming_snake() {
        let json = serde_json::to_string(&DenyReason::DailyLimitReached).unwrap();
        assert_eq!(json, "\"DAILY_LIMIT_REACHED\"");
    }
}
