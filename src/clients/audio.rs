//! Bird sound recordings client
//!
//! Searches a community recordings archive by species name. The provider
//! needs no API key; results are capped at five per search.

use crate::config::AudioConfig;
use crate::models::Recording;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const MAX_RECORDINGS: usize = 5;

/// Audio client errors
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Recording search failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Bird sound archive
#[async_trait]
pub trait AudioClient: Send + Sync {
    /// Search recordings by common or scientific name, best quality first
    async fn search_recordings(&self, species_name: &str) -> Result<Vec<Recording>, AudioError>;
}

/// HTTP audio archive implementation
pub struct HttpAudioClient {
    http: reqwest::Client,
    config: AudioConfig,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    recordings: Vec<RecordingRecord>,
}

#[derive(Deserialize)]
struct RecordingRecord {
    #[serde(default)]
    id: String,
    #[serde(rename = "sp", default)]
    species: String,
    #[serde(rename = "cnt", default)]
    country: Option<String>,
    #[serde(rename = "loc", default)]
    location: Option<String>,
    #[serde(rename = "q", default)]
    quality: Option<String>,
    #[serde(default)]
    file: String,
    #[serde(default)]
    length: Option<String>,
    #[serde(rename = "rec", default)]
    recordist: Option<String>,
}

impl HttpAudioClient {
    pub fn new(config: AudioConfig) -> Result<Self, AudioError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl AudioClient for HttpAudioClient {
    async fn search_recordings(&self, species_name: &str) -> Result<Vec<Recording>, AudioError> {
        let query = format!("\"{}\" q:A", species_name);
        let response = self
            .http
            .get(&self.config.base_url)
            .query(&[("query", query.as_str()), ("page", "1")])
            .send()
            .await?
            .error_for_status()?;

        let body: SearchResponse = response.json().await?;
        Ok(body
            .recordings
            .into_iter()
            .take(MAX_RECORDINGS)
            .map(record_to_recording)
            .collect())
    }
}

fn record_to_recording(rec: RecordingRecord) -> Recording {
    // The archive returns protocol-relative file URLs.
    let file_url = if rec.file.starts_with("//") {
        format!("https:{}", rec.file)
    } else {
        rec.file
    };

    Recording {
        id: rec.id,
        species: rec.species,
        country: rec.country,
        location: rec.location,
        quality: rec.quality,
        file_url,
        length: rec.length,
        recordist: rec.recordist,
    }
}
