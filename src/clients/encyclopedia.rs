//! Species encyclopedia client
//!
//! Species profiles merge two sources: the provider's taxonomy API for
//! canonical names, and a curated content table for the long-form natural
//! history text (description, habitat, diet, and so on). Unknown species
//! still yield a minimal profile from the taxonomy record alone.

use crate::config::EncyclopediaConfig;
use crate::models::{NearbyObservation, SpeciesProfile};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Encyclopedia client errors
#[derive(Debug, Error)]
pub enum EncyclopediaError {
    #[error("Species '{0}' not found")]
    NotFound(String),

    #[error("Encyclopedia request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Species data provider
#[async_trait]
pub trait EncyclopediaClient: Send + Sync {
    /// Full profile for one species
    async fn species_profile(&self, species_id: &str) -> Result<SpeciesProfile, EncyclopediaError>;

    /// Recent community observations near a point
    async fn recent_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: u32,
    ) -> Result<Vec<NearbyObservation>, EncyclopediaError>;
}

/// HTTP encyclopedia implementation
pub struct HttpEncyclopediaClient {
    http: reqwest::Client,
    config: EncyclopediaConfig,
}

#[derive(Deserialize)]
struct TaxonomyRecord {
    #[serde(rename = "speciesCode")]
    species_code: String,
    #[serde(rename = "comName")]
    common_name: String,
    #[serde(rename = "sciName")]
    scientific_name: String,
}

#[derive(Deserialize)]
struct ObservationRecord {
    #[serde(rename = "speciesCode")]
    species_code: String,
    #[serde(rename = "comName")]
    common_name: String,
    #[serde(rename = "sciName")]
    scientific_name: String,
    #[serde(rename = "locName")]
    location_name: String,
    lat: f64,
    lng: f64,
    #[serde(rename = "obsDt")]
    observation_date: String,
    #[serde(rename = "howMany", default)]
    how_many: Option<i64>,
}

impl HttpEncyclopediaClient {
    pub fn new(config: EncyclopediaConfig) -> Result<Self, EncyclopediaError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { http, config })
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header("X-eBirdApiToken", key),
            None => request,
        }
    }
}

#[async_trait]
impl EncyclopediaClient for HttpEncyclopediaClient {
    async fn species_profile(&self, species_id: &str) -> Result<SpeciesProfile, EncyclopediaError> {
        if let Some(profile) = curated_profile(species_id) {
            return Ok(profile);
        }

        let url = format!("{}/ref/taxonomy/ebird", self.config.base_url);
        let response = self
            .authed(self.http.get(&url))
            .query(&[("species", species_id), ("fmt", "json")])
            .send()
            .await?
            .error_for_status()?;

        let records: Vec<TaxonomyRecord> = response.json().await?;
        let record = records
            .into_iter()
            .next()
            .ok_or_else(|| EncyclopediaError::NotFound(species_id.to_string()))?;

        Ok(SpeciesProfile {
            species_id: record.species_code,
            common_name: record.common_name,
            scientific_name: record.scientific_name,
            description: None,
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
        latitude: f64,
        longitude: f64,
        radius_km: u32,
    ) -> Result<Vec<NearbyObservation>, EncyclopediaError> {
        let url = format!("{}/data/obs/geo/recent", self.config.base_url);
        let response = self
            .authed(self.http.get(&url))
            .query(&[
                ("lat", latitude.to_string()),
                ("lng", longitude.to_string()),
                ("dist", radius_km.to_string()),
                ("maxResults", "50".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let records: Vec<ObservationRecord> = response.json().await?;
        Ok(records
            .into_iter()
            .map(|obs| NearbyObservation {
                species_id: obs.species_code,
                common_name: obs.common_name,
                scientific_name: obs.scientific_name,
                location_name: obs.location_name,
                latitude: obs.lat,
                longitude: obs.lng,
                observation_date: obs.observation_date,
                how_many: obs.how_many.unwrap_or(1),
            })
            .collect())
    }
}

struct CuratedEntry {
    common_name: &'static str,
    scientific_name: &'static str,
    description: &'static str,
    habitat: &'static str,
    migration_patterns: &'static str,
    mating_season: &'static str,
    diet: &'static str,
    colors: &'static str,
    native_regions: &'static str,
    history: &'static str,
    rarity: &'static str,
    image_url: &'static str,
}

static CURATED: Lazy<HashMap<&'static str, CuratedEntry>> = Lazy::new(|| {
    HashMap::from([
        (
            "american_robin",
            CuratedEntry {
                common_name: "American Robin",
                scientific_name: "Turdus migratorius",
                description: "A medium-sized songbird with a distinctive red-orange breast and dark gray head and back.",
                habitat: "Gardens, parks, lawns, forests, and urban areas throughout North America",
                migration_patterns: "Northern populations migrate south in winter, while southern populations are year-round residents. Migration occurs from September to November and March to May.",
                mating_season: "April to July, with peak breeding in May and June",
                diet: "Earthworms, insects, fruits, and berries. Diet changes seasonally - more protein during spring/summer for nesting.",
                colors: "Males: bright red-orange breast, dark gray head and back, white throat with black streaks. Females: similar but duller colors.",
                native_regions: "North America - from Alaska and Canada to central Mexico, introduced to parts of Europe",
                history: "State bird of Connecticut, Michigan, and Wisconsin. First described by Carl Linnaeus in 1766. Symbol of spring's arrival in northern climates.",
                rarity: "Common - Least Concern conservation status",
                image_url: "https://images.unsplash.com/photo-1544736150-6d0ecbaa9d7c?w=400",
            },
        ),
        (
            "northern_cardinal",
            CuratedEntry {
                common_name: "Northern Cardinal",
                scientific_name: "Cardinalis cardinalis",
                description: "A vibrant red songbird with a prominent crest and black face mask in males.",
                habitat: "Woodlands, gardens, shrublands, and wetlands across eastern and central North America",
                migration_patterns: "Non-migratory resident species that maintains territories year-round",
                mating_season: "March to September, with multiple broods possible per season",
                diet: "Seeds, grains, fruits, and insects. Prefers sunflower seeds and safflower seeds at feeders.",
                colors: "Males: brilliant red with black face mask. Females: brown with red tinges on wings, tail, and crest.",
                native_regions: "Eastern and central North America, from southeastern Canada to Guatemala",
                history: "State bird of seven US states. Named by early settlers after Catholic cardinals' red robes. Range expanding northward due to climate change.",
                rarity: "Common - Least Concern conservation status",
                image_url: "https://images.unsplash.com/photo-1578662996442-48f60103fc96?w=400",
            },
        ),
        (
            "blue_jay",
            CuratedEntry {
                common_name: "Blue Jay",
                scientific_name: "Cyanocitta cristata",
                description: "An intelligent corvid with brilliant blue coloring, white underparts, and a prominent crest.",
                habitat: "Oak and pine forests, suburban areas, parks, and woodlands across eastern North America",
                migration_patterns: "Partial migrant - some populations migrate south in winter while others remain year-round",
                mating_season: "April to July, typically raising one brood per year",
                diet: "Omnivorous - acorns, nuts, seeds, insects, eggs, and nestlings. Known for caching food for winter.",
                colors: "Bright blue upperparts, white or light gray underparts, black necklace across throat, white patches on wings and tail",
                native_regions: "Eastern and central North America, from southern Canada to the Gulf of Mexico",
                history: "Known for intelligence and complex social behavior. Important seed disperser for oak trees. Featured in indigenous folklore.",
                rarity: "Common - Least Concern conservation status",
                image_url: "https://images.unsplash.com/photo-1571421872008-ccbd2ba31ddb?w=400",
            },
        ),
    ])
});

/// The browsable curated catalog, ordered by common name
pub fn curated_species() -> Vec<SpeciesProfile> {
    let mut species: Vec<SpeciesProfile> = CURATED
        .keys()
        .filter_map(|id| curated_profile(id))
        .collect();
    species.sort_by(|a, b| a.common_name.cmp(&b.common_name));
    species
}

/// Curated long-form profile for well-known species, if present
pub fn curated_profile(species_id: &str) -> Option<SpeciesProfile> {
    CURATED.get(species_id).map(|entry| SpeciesProfile {
        species_id: species_id.to_string(),
        common_name: entry.common_name.to_string(),
        scientific_name: entry.scientific_name.to_string(),
        description: Some(entry.description.to_string()),
        habitat: Some(entry.habitat.to_string()),
        migration_patterns: Some(entry.migration_patterns.to_string()),
        mating_season: Some(entry.mating_season.to_string()),
        diet: Some(entry.diet.to_string()),
        colors: Some(entry.colors.to_string()),
        native_regions: Some(entry.native_regions.to_string()),
        history: Some(entry.history.to_string()),
        rarity: Some(entry.rarity.to_string()),
        image_url: Some(entry.image_url.to_string()),
    })
}
