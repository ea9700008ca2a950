//! Species and identification models
//!
//! Shapes returned by the classifier, encyclopedia, and audio collaborators,
//! plus the merged `BirdResult` the identification flow hands back to the
//! client.

use serde::{Deserialize, Serialize};

/// Classifier output for one submitted photo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identification {
    /// Species identifier usable with the encyclopedia service
    pub species_id: String,
    /// Common name, e.g. "American Robin"
    pub common_name: String,
    /// Scientific name, e.g. "Turdus migratorius"
    pub scientific_name: String,
    /// Classifier confidence in [0, 1]
    pub confidence: f64,
}

/// Encyclopedic species record from the encyclopedia collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesProfile {
    pub species_id: String,
    pub common_name: String,
    pub scientific_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub habitat: Option<String>,
    #[serde(default)]
    pub migration_patterns: Option<String>,
    #[serde(default)]
    pub mating_season: Option<String>,
    #[serde(default)]
    pub diet: Option<String>,
    #[serde(default)]
    pub colors: Option<String>,
    #[serde(default)]
    pub native_regions: Option<String>,
    #[serde(default)]
    pub history: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Audio recording metadata from the audio collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub id: String,
    pub species: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    pub file_url: String,
    #[serde(default)]
    pub length: Option<String>,
    #[serde(default)]
    pub recordist: Option<String>,
}

/// A community observation near a location, from the encyclopedia provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyObservation {
    pub species_id: String,
    pub common_name: String,
    pub scientific_name: String,
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub observation_date: String,
    pub how_many: i64,
}

/// Final result of one "identify this photo" action.
///
/// Encyclopedia and audio content are optional: their fetch failures degrade
/// gracefully and the identification is still returned.
#[derive(Debug, Clone, Serialize)]
pub struct BirdResult {
    /// Classifier verdict
    pub identification: Identification,
    /// Encyclopedic content, absent if the fetch failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<SpeciesProfile>,
    /// Audio samples; free tier receives at most one
    pub recordings: Vec<Recording>,
    /// Scans left today after this one (-1 means unlimited)
    pub remaining_scans: i64,
}
