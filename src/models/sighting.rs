//! Sighting model
//!
//! Entries in a user's personal sightings log, created after successful
//! identifications or manually from the field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded bird sighting belonging to one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sighting {
    /// Unique identifier
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Species identifier from the classifier/encyclopedia
    pub species_id: String,
    /// Common name at the time of sighting
    pub common_name: String,
    /// Optional location
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Free-form notes
    pub notes: Option<String>,
    /// When the bird was seen
    pub sighted_at: DateTime<Utc>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a sighting
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSightingInput {
    pub species_id: String,
    pub common_name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Defaults to now when omitted
    #[serde(default)]
    pub sighted_at: Option<DateTime<Utc>>,
}
