//! Identification service
//!
//! Orchestrates one "identify this photo" action: consume a quota slot,
//! call the classifier, then enrich the verdict with encyclopedia and audio
//! content. The quota gate runs first so a denied request never reaches the
//! classifier, and a consumed slot is not refunded if the classifier fails.
//! Enrichment failures degrade gracefully; the identification itself is
//! still returned.

use crate::clients::{AudioClient, ClassifierClient, ClassifierError, EncyclopediaClient};
use crate::models::{
    AccountSession, BirdResult, DenyReason, Feature, Recording, SpeciesProfile,
};
use crate::services::entitlement::{EntitlementError, EntitlementService};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Identification flow errors
#[derive(Debug, Error)]
pub enum IdentifyError {
    /// The session does not describe a real account
    #[error("Invalid account session")]
    InvalidSession,

    /// The daily scan quota denied this request
    #[error("Daily scan limit reached")]
    QuotaExceeded { reason: DenyReason },

    /// The classifier failed or had no confident match. The consumed quota
    /// slot is not refunded.
    #[error("Could not identify the bird: {0}")]
    Classification(#[source] ClassifierError),

    /// The scan ledger is unavailable; the request fails closed
    #[error("Scan ledger unavailable: {0}")]
    Ledger(#[source] anyhow::Error),
}

impl From<EntitlementError> for IdentifyError {
    fn from(err: EntitlementError) -> Self {
        match err {
            EntitlementError::InvalidSession => IdentifyError::InvalidSession,
            EntitlementError::LedgerUnavailable(e) => IdentifyError::Ledger(e),
        }
    }
}

/// Identification service
pub struct IdentificationService {
    entitlements: Arc<EntitlementService>,
    classifier: Arc<dyn ClassifierClient>,
    encyclopedia: Arc<dyn EncyclopediaClient>,
    audio: Arc<dyn AudioClient>,
    profile_cache: Cache<String, SpeciesProfile>,
}

impl IdentificationService {
    pub fn new(
        entitlements: Arc<EntitlementService>,
        classifier: Arc<dyn ClassifierClient>,
        encyclopedia: Arc<dyn EncyclopediaClient>,
        audio: Arc<dyn AudioClient>,
        profile_cache_ttl: Duration,
    ) -> Self {
        let profile_cache = Cache::builder()
            .max_capacity(1_000)
            .time_to_live(profile_cache_ttl)
            .build();
        Self {
            entitlements,
            classifier,
            encyclopedia,
            audio,
            profile_cache,
        }
    }

    /// Run the full identification flow for one submitted photo
    pub async fn identify(
        &self,
        session: &AccountSession,
        image: &[u8],
    ) -> Result<BirdResult, IdentifyError> {
        let decision = self.entitlements.check_and_consume_scan(session).await?;
        if !decision.allowed {
            return Err(IdentifyError::QuotaExceeded {
                reason: decision.reason.unwrap_or(DenyReason::DailyLimitReached),
            });
        }

        let mut identification = self
            .classifier
            .classify(image)
            .await
            .map_err(IdentifyError::Classification)?;

        let profile = self.cached_profile(&identification.species_id).await;
        if identification.scientific_name.is_empty() {
            if let Some(profile) = &profile {
                identification.scientific_name = profile.scientific_name.clone();
            }
        }

        let recordings = self
            .recordings_for_tier(session, &identification.common_name)
            .await;

        Ok(BirdResult {
            identification,
            profile,
            recordings,
            remaining_scans: decision.remaining,
        })
    }

    /// Cached species profile; `None` when the fetch fails or nothing is known
    pub async fn species_profile(&self, species_id: &str) -> Option<SpeciesProfile> {
        self.cached_profile(species_id).await
    }

    /// Recordings for a species, truncated to one for tiers without the full
    /// audio library
    pub async fn recordings_for_tier(
        &self,
        session: &AccountSession,
        species_name: &str,
    ) -> Vec<Recording> {
        let mut recordings = match self.audio.search_recordings(species_name).await {
            Ok(recordings) => recordings,
            Err(err) => {
                warn!(species = species_name, error = %err, "Recording search failed");
                Vec::new()
            }
        };

        let full_library = self
            .entitlements
            .check_feature(session, Feature::FullAudioLibrary)
            .unwrap_or(false);
        if !full_library {
            recordings.truncate(1);
        }
        recordings
    }

    async fn cached_profile(&self, species_id: &str) -> Option<SpeciesProfile> {
        if let Some(profile) = self.profile_cache.get(species_id).await {
            return Some(profile);
        }

        match self.encyclopedia.species_profile(species_id).await {
            Ok(profile) => {
                self.profile_cache
                    .insert(species_id.to_string(), profile.clone())
                    .await;
                Some(profile)
            }
            Err(err) => {
                warn!(species = species_id, error = %err, "Species profile fetch failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{AudioError, EncyclopediaError};
    use crate::db::repositories::{SqlxScanLedgerRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Identification, NearbyObservation, SubscriptionTier, User};
    use crate::services::clock::test_support::FixedClock;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubClassifier {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubClassifier {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl ClassifierClient for StubClassifier {
        async fn classify(&self, _image: &[u8]) -> Result<Identification, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ClassifierError::LowConfidence { confidence: 0.2 });
            }
            Ok(Identification {
                species_id: "blue_jay".to_string(),
                common_name: "Blue Jay".to_string(),
                scientific_name: String::new(),
                confidence: 0.94,
            })
        }
    }

    struct StubEncyclopedia {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubEncyclopedia {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl EncyclopediaClient for StubEncyclopedia {
        async fn species_profile(
            &self,
            species_id: &str,
        ) -> Result<SpeciesProfile, EncyclopediaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EncyclopediaError::NotFound(species_id.to_string()));
            }
            Ok(SpeciesProfile {
                species_id: species_id.to_string(),
                common_name: "Blue Jay".to_string(),
                scientific_name: "Cyanocitta cristata".to_string(),
                description: Some("An intelligent corvid.".to_string()),
                habitat: None,
                migration_patterns: None,
                mating_season: None,
                diet: None,
                colors: None,
                native_regions: None,
                history: None,
                rarity: None,
                image_url: None,
            })
        }

        async fn recent_nearby(
            &self,
            _latitude: f64,
            _longitude: f64,
            _radius_km: u32,
        ) -> Result<Vec<NearbyObservation>, EncyclopediaError> {
            Ok(Vec::new())
        }
    }

    struct StubAudio;

    #[async_trait]
    impl AudioClient for StubAudio {
        async fn search_recordings(&self, species: &str) -> Result<Vec<Recording>, AudioError> {
            Ok((0..3)
                .map(|i| Recording {
                    id: format!("{}", 100 + i),
                    species: species.to_string(),
                    country: None,
                    location: None,
                    quality: Some("A".to_string()),
                    file_url: format!("https://example.com/{}.mp3", i),
                    length: None,
                    recordist: None,
                })
                .collect())
        }
    }

    struct Harness {
        service: IdentificationService,
        classifier: Arc<StubClassifier>,
        encyclopedia: Arc<StubEncyclopedia>,
        session: AccountSession,
        ledger: Arc<SqlxScanLedgerRepository>,
    }

    async fn setup(tier: SubscriptionTier, classifier_fails: bool, encyclopedia_fails: bool) -> Harness {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let user = users
            .create(&User::new("birder@example.com".to_string(), "hash".to_string()))
            .await
            .expect("Failed to create user");

        let ledger = Arc::new(SqlxScanLedgerRepository::new(pool));
        let clock = FixedClock::at("2025-06-01T12:00:00Z".parse().unwrap());
        let entitlements = Arc::new(EntitlementService::new(ledger.clone(), clock));

        let classifier = StubClassifier::new(classifier_fails);
        let encyclopedia = StubEncyclopedia::new(encyclopedia_fails);
        let service = IdentificationService::new(
            entitlements,
            classifier.clone(),
            encyclopedia.clone(),
            Arc::new(StubAudio),
            Duration::from_secs(3600),
        );

        Harness {
            service,
            classifier,
            encyclopedia,
            session: AccountSession::new(user.id, tier),
            ledger,
        }
    }

    #[tokio::test]
    async fn test_free_tier_identify_happy_path() {
        let h = setup(SubscriptionTier::Free, false, false).await;

        let result = h.service.identify(&h.session, b"jpeg bytes").await.unwrap();

        assert_eq!(result.identification.species_id, "blue_jay");
        assert_eq!(result.remaining_scans, 2);
        assert!(result.profile.is_some());
        // Free tier gets a single teaser recording.
        assert_eq!(result.recordings.len(), 1);
    }

    #[tokio::test]
    async fn test_scientific_name_filled_from_profile() {
        let h = setup(SubscriptionTier::Free, false, false).await;

        let result = h.service.identify(&h.session, b"jpeg bytes").await.unwrap();
        assert_eq!(result.identification.scientific_name, "Cyanocitta cristata");
    }

    #[tokio::test]
    async fn test_fourth_scan_denied_before_classifier() {
        let h = setup(SubscriptionTier::Free, false, false).await;

        for _ in 0..3 {
            h.service.identify(&h.session, b"jpeg bytes").await.unwrap();
        }

        let err = h.service.identify(&h.session, b"jpeg bytes").await.unwrap_err();
        assert!(matches!(
            err,
            IdentifyError::QuotaExceeded {
                reason: DenyReason::DailyLimitReached
            }
        ));
        // The classifier saw only the three allowed requests.
        assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_classifier_failure_does_not_refund_slot() {
        let h = setup(SubscriptionTier::Free, true, false).await;

        let err = h.service.identify(&h.session, b"jpeg bytes").await.unwrap_err();
        assert!(matches!(err, IdentifyError::Classification(_)));

        // The slot stays consumed.
        use crate::db::repositories::ScanLedgerRepository;
        let count = h
            .ledger
            .count_for_day(h.session.user_id, "2025-06-01".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_premium_classifier_failure_leaves_ledger_untouched() {
        let h = setup(SubscriptionTier::PremiumYearly, true, false).await;

        let err = h.service.identify(&h.session, b"jpeg bytes").await.unwrap_err();
        assert!(matches!(err, IdentifyError::Classification(_)));

        use crate::db::repositories::ScanLedgerRepository;
        let count = h
            .ledger
            .count_for_day(h.session.user_id, "2025-06-01".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_encyclopedia_failure_degrades_gracefully() {
        let h = setup(SubscriptionTier::Free, false, true).await;

        let result = h.service.identify(&h.session, b"jpeg bytes").await.unwrap();
        assert!(result.profile.is_none());
        assert_eq!(result.identification.species_id, "blue_jay");
        // A missing profile leaves the classifier's (empty) scientific name.
        assert!(result.identification.scientific_name.is_empty());
    }

    #[tokio::test]
    async fn test_premium_gets_full_recording_list() {
        let h = setup(SubscriptionTier::PremiumMonthly, false, false).await;

        let result = h.service.identify(&h.session, b"jpeg bytes").await.unwrap();
        assert_eq!(result.recordings.len(), 3);
        assert_eq!(result.remaining_scans, -1);
    }

    #[tokio::test]
    async fn test_profile_cache_avoids_repeat_fetches() {
        let h = setup(SubscriptionTier::PremiumMonthly, false, false).await;

        h.service.identify(&h.session, b"jpeg bytes").await.unwrap();
        h.service.identify(&h.session, b"jpeg bytes").await.unwrap();

        assert_eq!(h.encyclopedia.calls.load(Ordering::SeqCst), 1);
    }
}
