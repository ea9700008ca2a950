//! Bird image classifier client
//!
//! Posts the photo as a base64 data URI to a hosted classification function
//! and maps its `labelName`/`confidence` response onto an [`Identification`].
//! Low-confidence verdicts are rejected here so callers never see a guess
//! below the configured threshold.

use crate::config::ClassifierConfig;
use crate::models::Identification;
use async_trait::async_trait;
use data_encoding::BASE64;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Classifier client errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The best label fell below the confidence threshold
    #[error("No confident match (best confidence {confidence:.2})")]
    LowConfidence { confidence: f64 },

    /// Transport-level failure (timeout, connect, non-2xx)
    #[error("Classifier request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a shape we cannot use
    #[error("Unexpected classifier response: {0}")]
    InvalidResponse(String),
}

/// Bird image classifier
#[async_trait]
pub trait ClassifierClient: Send + Sync {
    /// Identify the bird in a photo. One attempt, no internal retries.
    async fn classify(&self, image: &[u8]) -> Result<Identification, ClassifierError>;
}

/// HTTP classifier implementation
pub struct HttpClassifierClient {
    http: reqwest::Client,
    config: ClassifierConfig,
}

#[derive(Deserialize)]
struct InvokeResponse {
    #[serde(rename = "labelName")]
    label_name: Option<String>,
    confidence: Option<f64>,
}

impl HttpClassifierClient {
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl ClassifierClient for HttpClassifierClient {
    async fn classify(&self, image: &[u8]) -> Result<Identification, ClassifierError> {
        let data_uri = format!("data:image/jpeg;base64,{}", BASE64.encode(image));

        let mut request = self
            .http
            .post(&self.config.url)
            .json(&serde_json::json!({ "data": data_uri }));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let body: InvokeResponse = response.json().await?;

        let label = body
            .label_name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ClassifierError::InvalidResponse("missing labelName".to_string()))?;
        let confidence = body
            .confidence
            .ok_or_else(|| ClassifierError::InvalidResponse("missing confidence".to_string()))?;

        if confidence < self.config.min_confidence {
            return Err(ClassifierError::LowConfidence { confidence });
        }

        Ok(label_to_identification(&label, confidence))
    }
}

/// Build an [`Identification`] from a classifier label.
///
/// The provider only returns a common name; the species id is a slug of it
/// and the scientific name comes from a local lookup (blank when unknown,
/// to be filled in from the encyclopedia profile downstream).
pub fn label_to_identification(label: &str, confidence: f64) -> Identification {
    Identification {
        species_id: slugify(label),
        common_name: label.to_string(),
        scientific_name: scientific_name_for(label).unwrap_or_default(),
        confidence,
    }
}

fn slugify(name: &str) -> String {
    name.to_lowercase().replace([' ', '-'], "_")
}

static SCIENTIFIC_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("American Robin", "Turdus migratorius"),
        ("Northern Cardinal", "Cardinalis cardinalis"),
        ("Blue Jay", "Cyanocitta cristata"),
        ("Bald Eagle", "Haliaeetus leucocephalus"),
        ("House Sparrow", "Passer domesticus"),
        ("European Starling", "Sturnus vulgaris"),
        ("Red-winged Blackbird", "Agelaius phoeniceus"),
        ("American Goldfinch", "Spinus tristis"),
        ("Mourning Dove", "Zenaida macroura"),
        ("House Finch", "Haemorhous mexicanus"),
    ])
});

fn scientific_name_for(common_name: &str) -> Option<String> {
    SCIENTIFIC_NAMES.get(common_name).map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_to_identification_known_species() {
        let ident = label_to_identification("American Robin", 0.93);
        assert_eq!(ident.species_id, "american_robin");
        assert_eq!(ident.common_name, "American Robin");
        assert_eq!(ident.scientific_name, "Turdus migratorius");
        assert!((ident.confidence - 0.93).abs() < f64::EPSILON);
    }

    #[test]
    fn test_label_to_identification_unknown_species() {
        let ident = label_to_identification("Scarlet Macaw", 0.88);
        assert_eq!(ident.species_id, "scarlet_macaw");
        assert!(ident.scientific_name.is_empty());
    }

    #[test]
    fn test_slugify_handles_hyphens() {
        assert_eq!(slugify("Red-winged Blackbird"), "red_winged_blackbird");
    }
}
