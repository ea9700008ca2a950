//! Sighting service
//!
//! Personal sightings log. Free accounts are capped at a fixed number of
//! stored sightings; the `UnlimitedSightingStorage` feature lifts the cap.

use crate::db::repositories::SightingRepository;
use crate::models::{AccountSession, CreateSightingInput, Feature, Sighting};
use crate::services::entitlement::EntitlementService;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

/// Stored sightings allowed on the free tier
const FREE_SIGHTING_LIMIT: i64 = 50;

/// Sighting service errors
#[derive(Debug, Error)]
pub enum SightingError {
    #[error("Sighting storage limit reached")]
    StorageLimitReached,

    #[error("Sighting not found")]
    NotFound,

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// Sighting service
pub struct SightingService {
    sightings: Arc<dyn SightingRepository>,
    entitlements: Arc<EntitlementService>,
}

impl SightingService {
    pub fn new(
        sightings: Arc<dyn SightingRepository>,
        entitlements: Arc<EntitlementService>,
    ) -> Self {
        Self {
            sightings,
            entitlements,
        }
    }

    /// Record a sighting for the session's user
    pub async fn create(
        &self,
        session: &AccountSession,
        input: CreateSightingInput,
    ) -> Result<Sighting, SightingError> {
        let unlimited = self
            .entitlements
            .check_feature(session, Feature::UnlimitedSightingStorage)
            .unwrap_or(false);
        if !unlimited {
            let stored = self.sightings.count_by_user(session.user_id).await?;
            if stored >= FREE_SIGHTING_LIMIT {
                return Err(SightingError::StorageLimitReached);
            }
        }

        let now = Utc::now();
        let sighting = Sighting {
            id: 0,
            user_id: session.user_id,
            species_id: input.species_id,
            common_name: input.common_name,
            latitude: input.latitude,
            longitude: input.longitude,
            notes: input.notes,
            sighted_at: input.sighted_at.unwrap_or(now),
            created_at: now,
        };

        Ok(self.sightings.create(&sighting).await?)
    }

    /// The session user's sightings, newest first
    pub async fn list(&self, session: &AccountSession) -> Result<Vec<Sighting>, SightingError> {
        Ok(self.sightings.list_by_user(session.user_id).await?)
    }

    /// Delete one of the session user's sightings
    pub async fn delete(&self, session: &AccountSession, id: i64) -> Result<(), SightingError> {
        if !self.sightings.delete(id, session.user_id).await? {
            return Err(SightingError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxScanLedgerRepository, SqlxSightingRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{SubscriptionTier, User};
    use crate::services::clock::SystemClock;

    async fn setup(tier: SubscriptionTier) -> (SightingService, AccountSession) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let user = users
            .create(&User::new("birder@example.com".to_string(), "hash".to_string()))
            .await
            .expect("Failed to create user");

        let entitlements = Arc::new(EntitlementService::new(
            SqlxScanLedgerRepository::boxed(pool.clone()),
            SystemClock::boxed(),
        ));
        let service = SightingService::new(SqlxSightingRepository::boxed(pool), entitlements);
        (service, AccountSession::new(user.id, tier))
    }

    fn input(species: &str) -> CreateSightingInput {
        CreateSightingInput {
            species_id: species.to_string(),
            common_name: "Blue Jay".to_string(),
            latitude: None,
            longitude: None,
            notes: None,
            sighted_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_list_delete() {
        let (service, session) = setup(SubscriptionTier::Free).await;

        let created = service.create(&session, input("blue_jay")).await.unwrap();
        assert!(created.id > 0);

        let listed = service.list(&session).await.unwrap();
        assert_eq!(listed.len(), 1);

        service.delete(&session, created.id).await.unwrap();
        assert!(service.list(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_row() {
        let (service, session) = setup(SubscriptionTier::Free).await;
        assert!(matches!(
            service.delete(&session, 42).await,
            Err(SightingError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_free_tier_storage_cap() {
        let (service, session) = setup(SubscriptionTier::Free).await;

        for i in 0..FREE_SIGHTING_LIMIT {
            service
                .create(&session, input(&format!("species_{}", i)))
                .await
                .unwrap();
        }

        assert!(matches!(
            service.create(&session, input("one_too_many")).await,
            Err(SightingError::StorageLimitReached)
        ));
    }

    #[tokio::test]
    async fn test_premium_tier_has_no_storage_cap() {
        let (service, session) = setup(SubscriptionTier::PremiumMonthly).await;

        for i in 0..(FREE_SIGHTING_LIMIT + 5) {
            service
                .create(&session, input(&format!("species_{}", i)))
                .await
                .unwrap();
        }

        let listed = service.list(&session).await.unwrap();
        assert_eq!(listed.len() as i64, FREE_SIGHTING_LIMIT + 5);
    }
}
