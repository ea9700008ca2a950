//! Identification API endpoints
//!
//! - POST /api/v1/identify - Identify a bird photo (consumes a scan slot)
//! - GET /api/v1/quota - Remaining scans for the quota banner

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::BirdResult;

/// Largest accepted photo upload, 10 MB
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Build the identification router (all routes require auth)
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/identify",
            post(identify).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024)),
        )
        .route("/quota", get(quota))
}

/// Response for the quota banner
#[derive(Debug, Serialize)]
pub struct QuotaResponse {
    /// Remaining scans today; -1 means unlimited
    pub remaining_scans: i64,
    pub subscription_tier: String,
}

/// POST /api/v1/identify - Identify a bird photo
///
/// Multipart upload with an `image` part. Quota denial returns 429 with an
/// upgrade prompt; classifier failure returns 422 without refunding the
/// consumed slot.
async fn identify(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    mut multipart: Multipart,
) -> Result<Json<BirdResult>, ApiError> {
    let mut image: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("image") {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation_error(format!("Failed to read image: {}", e)))?;
            if data.len() > MAX_IMAGE_BYTES {
                return Err(ApiError::validation_error("Image exceeds the 10 MB limit"));
            }
            image = Some(data.to_vec());
        }
    }

    let image = image.ok_or_else(|| ApiError::validation_error("Missing 'image' part"))?;
    if image.is_empty() {
        return Err(ApiError::validation_error("Image is empty"));
    }

    let session = user.account_session();
    let result = state
        .identification_service
        .identify(&session, &image)
        .await?;

    Ok(Json(result))
}

/// GET /api/v1/quota - Remaining scans today
async fn quota(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<QuotaResponse>, ApiError> {
    let session = user.account_session();
    let remaining = state.entitlement_service.remaining_scans(&session).await?;

    Ok(Json(QuotaResponse {
        remaining_scans: remaining,
        subscription_tier: session.tier.to_string(),
    }))
}
