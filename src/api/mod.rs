//! API layer - HTTP handlers and routing
//!
//! All HTTP endpoints of the BirdScope backend:
//! - Auth endpoints (register/login/logout/me)
//! - Identification endpoints (identify, quota)
//! - Species endpoints (profile, recordings)
//! - Sightings endpoints (log CRUD, nearby observations)
//! - Billing endpoints (pricing, subscribe)
//! - Health check

pub mod auth;
pub mod billing;
pub mod health;
pub mod identify;
pub mod middleware;
pub mod sightings;
pub mod species;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Protected routes (need a valid session)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .merge(identify::router())
        .nest("/species", species::router())
        .nest("/sightings", sightings::router())
        .nest("/billing", billing::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/auth", auth::public_router())
        .nest("/billing", billing::public_router())
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    if let Ok(origin) = cors_origin.parse::<HeaderValue>() {
        cors = cors.allow_origin(origin);
    } else {
        tracing::warn!(cors_origin, "Invalid CORS origin, allowing none");
    }

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .merge(health::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
