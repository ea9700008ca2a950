//! Entitlement service
//!
//! Single decision point for what a subscription tier grants: feature gating
//! and the daily scan quota. Premium tiers never touch the ledger; free
//! accounts consume one ledger slot per scan, capped per UTC calendar day.
//!
//! All decisions are taken against an explicit `AccountSession`, so callers
//! must resolve the user's tier first and cannot consult ambient state.

use crate::db::repositories::ScanLedgerRepository;
use crate::models::{
    unlocked_features, AccountSession, EntitlementDecision, Feature, FREE_DAILY_SCAN_LIMIT,
    UNLIMITED_SCANS,
};
use crate::services::clock::DynClock;
use std::sync::Arc;
use thiserror::Error;

/// Entitlement service errors
#[derive(Debug, Error)]
pub enum EntitlementError {
    /// The session does not describe a real account. Never retried.
    #[error("Invalid account session")]
    InvalidSession,

    /// The ledger could not be read or written. Quota checks fail closed on
    /// this error rather than granting an uncounted scan.
    #[error("Scan ledger unavailable: {0}")]
    LedgerUnavailable(#[source] anyhow::Error),
}

/// Entitlement service
pub struct EntitlementService {
    ledger: Arc<dyn ScanLedgerRepository>,
    clock: DynClock,
}

impl EntitlementService {
    pub fn new(ledger: Arc<dyn ScanLedgerRepository>, clock: DynClock) -> Self {
        Self { ledger, clock }
    }

    /// Whether the session's tier unlocks the given feature.
    ///
    /// Pure tier lookup: no I/O, no quota involvement.
    pub fn check_feature(
        &self,
        session: &AccountSession,
        feature: Feature,
    ) -> Result<bool, EntitlementError> {
        Self::validate(session)?;
        Ok(unlocked_features(session.tier).contains(&feature))
    }

    fn validate(session: &AccountSession) -> Result<(), EntitlementError> {
        if session.user_id <= 0 {
            return Err(EntitlementError::InvalidSession);
        }
        Ok(())
    }

    /// Atomically check the daily quota and, when allowed, consume one scan.
    ///
    /// Premium tiers are always allowed and leave the ledger untouched. For
    /// free accounts the check and the consumption are one ledger operation,
    /// so concurrent requests cannot oversubscribe the final slot.
    pub async fn check_and_consume_scan(
        &self,
        session: &AccountSession,
    ) -> Result<EntitlementDecision, EntitlementError> {
        Self::validate(session)?;
        if session.tier.is_premium() {
            return Ok(EntitlementDecision::unlimited());
        }

        let today = self.clock.today();
        let consumed = self
            .ledger
            .increment_if_below(session.user_id, today, FREE_DAILY_SCAN_LIMIT)
            .await
            .map_err(EntitlementError::LedgerUnavailable)?;

        Ok(match consumed {
            Some(count) => EntitlementDecision::allowed_with_remaining(FREE_DAILY_SCAN_LIMIT - count),
            None => EntitlementDecision::limit_reached(),
        })
    }

    /// Remaining scans for today without consuming one.
    ///
    /// Returns [`UNLIMITED_SCANS`] for premium tiers. The answer is advisory:
    /// only `check_and_consume_scan` is authoritative under concurrency.
    pub async fn remaining_scans(&self, session: &AccountSession) -> Result<i64, EntitlementError> {
        Self::validate(session)?;
        if session.tier.is_premium() {
            return Ok(UNLIMITED_SCANS);
        }

        let today = self.clock.today();
        let count = self
            .ledger
            .count_for_day(session.user_id, today)
            .await
            .map_err(EntitlementError::LedgerUnavailable)?;

        Ok((FREE_DAILY_SCAN_LIMIT - count).max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxScanLedgerRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{DenyReason, SubscriptionTier, User};
    use crate::services::clock::test_support::FixedClock;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    async fn setup(tier: SubscriptionTier) -> (EntitlementService, Arc<FixedClock>, AccountSession) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let user = users
            .create(&User::new("birder@example.com".to_string(), "hash".to_string()))
            .await
            .expect("Failed to create user");

        let clock = FixedClock::at("2025-06-01T12:00:00Z".parse().unwrap());
        let service = EntitlementService::new(
            SqlxScanLedgerRepository::boxed(pool),
            clock.clone(),
        );
        let session = AccountSession::new(user.id, tier);
        (service, clock, session)
    }

    #[tokio::test]
    async fn test_free_tier_has_no_premium_features() {
        let (service, _, session) = setup(SubscriptionTier::Free).await;

        for feature in Feature::ALL {
            assert!(!service.check_feature(&session, feature).unwrap());
        }
    }

    #[tokio::test]
    async fn test_premium_tiers_unlock_every_feature() {
        for tier in [SubscriptionTier::PremiumMonthly, SubscriptionTier::PremiumYearly] {
            let (service, _, session) = setup(tier).await;
            for feature in Feature::ALL {
                assert!(service.check_feature(&session, feature).unwrap());
            }
        }
    }

    #[tokio::test]
    async fn test_invalid_session_is_rejected() {
        let (service, _, _) = setup(SubscriptionTier::Free).await;
        let bogus = AccountSession::new(0, SubscriptionTier::PremiumMonthly);

        assert!(matches!(
            service.check_feature(&bogus, Feature::MigrationMaps),
            Err(EntitlementError::InvalidSession)
        ));
        assert!(matches!(
            service.check_and_consume_scan(&bogus).await,
            Err(EntitlementError::InvalidSession)
        ));
        assert!(matches!(
            service.remaining_scans(&bogus).await,
            Err(EntitlementError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_free_tier_gets_three_scans_then_denied() {
        let (service, _, session) = setup(SubscriptionTier::Free).await;

        for expected_remaining in [2, 1, 0] {
            let decision = service.check_and_consume_scan(&session).await.unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
            assert!(decision.reason.is_none());
        }

        let denied = service.check_and_consume_scan(&session).await.unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.reason, Some(DenyReason::DailyLimitReached));
    }

    #[tokio::test]
    async fn test_premium_is_unlimited_and_skips_ledger() {
        let (service, _, session) = setup(SubscriptionTier::PremiumMonthly).await;

        for _ in 0..10 {
            let decision = service.check_and_consume_scan(&session).await.unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.remaining, UNLIMITED_SCANS);
        }

        // The ledger was never written.
        assert_eq!(service.remaining_scans(&session).await.unwrap(), UNLIMITED_SCANS);
        let free_view = AccountSession::new(session.user_id, SubscriptionTier::Free);
        assert_eq!(service.remaining_scans(&free_view).await.unwrap(), FREE_DAILY_SCAN_LIMIT);
    }

    #[tokio::test]
    async fn test_quota_resets_at_utc_midnight() {
        let (service, clock, session) = setup(SubscriptionTier::Free).await;

        for _ in 0..3 {
            assert!(service.check_and_consume_scan(&session).await.unwrap().allowed);
        }
        assert!(!service.check_and_consume_scan(&session).await.unwrap().allowed);

        // One second past midnight the window is fresh.
        clock.set("2025-06-02T00:00:01Z".parse().unwrap());
        let decision = service.check_and_consume_scan(&session).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
    }

    #[tokio::test]
    async fn test_remaining_scans_does_not_consume() {
        let (service, _, session) = setup(SubscriptionTier::Free).await;

        assert_eq!(service.remaining_scans(&session).await.unwrap(), 3);
        assert_eq!(service.remaining_scans(&session).await.unwrap(), 3);

        service.check_and_consume_scan(&session).await.unwrap();
        assert_eq!(service.remaining_scans(&session).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_scans_grant_exactly_the_limit() {
        let (service, _, session) = setup(SubscriptionTier::Free).await;
        let service = Arc::new(service);

        let mut handles = Vec::new();
        for _ in 0..10 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.check_and_consume_scan(&session).await
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().allowed {
                granted += 1;
            }
        }
        assert_eq!(granted, 3);
    }

    struct BrokenLedger;

    #[async_trait]
    impl ScanLedgerRepository for BrokenLedger {
        async fn increment_if_below(
            &self,
            _user_id: i64,
            _date: NaiveDate,
            _limit: i64,
        ) -> Result<Option<i64>> {
            anyhow::bail!("ledger offline")
        }

        async fn count_for_day(&self, _user_id: i64, _date: NaiveDate) -> Result<i64> {
            anyhow::bail!("ledger offline")
        }
    }

    #[tokio::test]
    async fn test_ledger_outage_fails_closed_for_free_tier() {
        let clock = FixedClock::at("2025-06-01T12:00:00Z".parse().unwrap());
        let service = EntitlementService::new(Arc::new(BrokenLedger), clock);
        let session = AccountSession::new(1, SubscriptionTier::Free);

        let err = service.check_and_consume_scan(&session).await.unwrap_err();
        assert!(matches!(err, EntitlementError::LedgerUnavailable(_)));

        // Premium never consults the ledger, so an outage does not block it.
        let premium = AccountSession::new(1, SubscriptionTier::PremiumYearly);
        assert!(service.check_and_consume_scan(&premium).await.unwrap().allowed);
    }
}
