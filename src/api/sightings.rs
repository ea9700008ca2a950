//! Sightings API endpoints
//!
//! - GET /api/v1/sightings - List the user's sighting log
//! - POST /api/v1/sightings - Record a sighting
//! - DELETE /api/v1/sightings/{id} - Remove a sighting
//! - GET /api/v1/sightings/nearby - Recent community observations nearby

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateSightingInput, NearbyObservation, Sighting};

/// Build the sightings router (all routes require auth)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sightings))
        .route("/", post(create_sighting))
        .route("/{id}", delete(delete_sighting))
        .route("/nearby", get(nearby))
}

/// GET /api/v1/sightings - List the user's sightings
async fn list_sightings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Sighting>>, ApiError> {
    let session = user.account_session();
    Ok(Json(state.sighting_service.list(&session).await?))
}

/// POST /api/v1/sightings - Record a sighting
async fn create_sighting(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<CreateSightingInput>,
) -> Result<impl IntoResponse, ApiError> {
    if body.species_id.trim().is_empty() || body.common_name.trim().is_empty() {
        return Err(ApiError::validation_error(
            "species_id and common_name are required",
        ));
    }

    let session = user.account_session();
    let sighting = state.sighting_service.create(&session, body).await?;
    Ok((StatusCode::CREATED, Json(sighting)))
}

/// DELETE /api/v1/sightings/{id} - Remove a sighting
async fn delete_sighting(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let session = user.account_session();
    state.sighting_service.delete(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for the nearby search
#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    #[serde(default = "default_radius_km")]
    pub radius_km: u32,
}

fn default_radius_km() -> u32 {
    25
}

/// GET /api/v1/sightings/nearby - Recent community observations
async fn nearby(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<NearbyObservation>>, ApiError> {
    if !(-90.0..=90.0).contains(&query.lat) || !(-180.0..=180.0).contains(&query.lng) {
        return Err(ApiError::validation_error("Invalid coordinates"));
    }

    let observations = state
        .encyclopedia
        .recent_nearby(query.lat, query.lng, query.radius_km.min(50))
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Nearby observations fetch failed");
            ApiError::service_unavailable("Community observations are temporarily unavailable")
        })?;

    Ok(Json(observations))
}
