//! Billing API endpoints
//!
//! - GET /api/v1/billing/pricing - Static plan catalog
//! - POST /api/v1/billing/subscribe - Purchase a premium plan
//!
//! The tier on the account changes only after the billing provider confirms
//! the subscription; provider errors leave the account untouched.

use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::api::auth::UserResponse;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};

/// A purchasable (or free) plan in the pricing catalog
#[derive(Debug, Clone, Serialize)]
pub struct PricingPlan {
    pub id: &'static str,
    pub name: &'static str,
    pub price: f64,
    pub currency: &'static str,
    pub period: &'static str,
    pub features: &'static [&'static str],
}

static PRICING: Lazy<Vec<PricingPlan>> = Lazy::new(|| {
    vec![
        PricingPlan {
            id: "free",
            name: "Free",
            price: 0.0,
            currency: "USD",
            period: "forever",
            features: &[
                "Identify up to 3 birds per day",
                "Basic bird information",
                "One audio sample per species",
            ],
        },
        PricingPlan {
            id: "premium_monthly",
            name: "Premium",
            price: 4.99,
            currency: "USD",
            period: "month",
            features: &[
                "Unlimited bird identification",
                "Complete bird information",
                "Full audio library",
                "Migration maps",
                "Unlimited sighting storage",
                "Offline mode",
            ],
        },
        PricingPlan {
            id: "premium_yearly",
            name: "Premium (annual)",
            price: 39.99,
            currency: "USD",
            period: "year",
            features: &[
                "Everything in Premium",
                "Two months free compared to monthly billing",
            ],
        },
    ]
});

/// Build public billing routes
pub fn public_router() -> Router<AppState> {
    Router::new().route("/pricing", get(pricing))
}

/// Build protected billing routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/subscribe", post(subscribe))
}

/// GET /api/v1/billing/pricing - Plan catalog
async fn pricing() -> Json<&'static Vec<PricingPlan>> {
    Json(&PRICING)
}

/// Request body for a subscription purchase
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub plan_id: String,
    pub payment_token: String,
}

/// Response for a confirmed subscription
#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub subscription_id: String,
    pub user: UserResponse,
}

/// POST /api/v1/billing/subscribe - Purchase a premium plan
async fn subscribe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>, ApiError> {
    let confirmation = state
        .billing
        .create_subscription(&body.plan_id, &body.payment_token)
        .await?;

    let updated = state
        .user_service
        .apply_tier_change(user.0.id, confirmation.tier)
        .await?;

    Ok(Json(SubscribeResponse {
        subscription_id: confirmation.subscription_id,
        user: updated.into(),
    }))
}
