//! Species API endpoints
//!
//! - GET /api/v1/species - Browsable curated catalog
//! - GET /api/v1/species/{id} - Species profile (cached)
//! - GET /api/v1/species/{id}/recordings - Audio recordings, tier-truncated

use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::clients::encyclopedia::curated_species;
use crate::models::{Recording, SpeciesProfile};

/// Build the species router (requires auth for tier-aware truncation)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_species))
        .route("/{id}", get(get_species))
        .route("/{id}/recordings", get(get_recordings))
}

/// GET /api/v1/species - Curated species catalog
async fn list_species() -> Json<Vec<SpeciesProfile>> {
    Json(curated_species())
}

/// GET /api/v1/species/{id} - Species profile
async fn get_species(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SpeciesProfile>, ApiError> {
    state
        .identification_service
        .species_profile(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Species '{}' not found", id)))
}

/// GET /api/v1/species/{id}/recordings - Audio recordings
///
/// Free tier receives at most one recording; the full audio library is a
/// premium feature.
async fn get_recordings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Recording>>, ApiError> {
    let session = user.account_session();

    // Search by common name when the profile is known, else by the raw id.
    let species_name = state
        .identification_service
        .species_profile(&id)
        .await
        .map(|profile| profile.common_name)
        .unwrap_or_else(|| id.replace('_', " "));

    let recordings = state
        .identification_service
        .recordings_for_tier(&session, &species_name)
        .await;
    Ok(Json(recordings))
}
