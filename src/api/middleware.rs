//! API middleware
//!
//! Authentication (session token validation), the shared application state,
//! and the JSON error envelope every endpoint speaks.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clients::{BillingClient, BillingError, EncyclopediaClient};
use crate::models::{AccountSession, User};
use crate::services::{
    EntitlementError, EntitlementService, IdentificationService, IdentifyError, SightingError,
    SightingService, UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub entitlement_service: Arc<EntitlementService>,
    pub identification_service: Arc<IdentificationService>,
    pub sighting_service: Arc<SightingService>,
    pub encyclopedia: Arc<dyn EncyclopediaClient>,
    pub billing: Arc<dyn BillingClient>,
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    /// The account session value passed into entitlement-aware services
    pub fn account_session(&self) -> AccountSession {
        AccountSession::from(&self.0)
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::with_details(
            "QUOTA_EXCEEDED",
            message,
            serde_json::json!({
                "upgrade": "Upgrade to Premium for unlimited identification scans"
            }),
        )
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new("SERVICE_UNAVAILABLE", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "QUOTA_EXCEEDED" => StatusCode::TOO_MANY_REQUESTS,
            "CLASSIFICATION_FAILED" => StatusCode::UNPROCESSABLE_ENTITY,
            "PAYMENT_DECLINED" => StatusCode::PAYMENT_REQUIRED,
            "SERVICE_UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::InvalidEmail | UserServiceError::WeakPassword => {
                ApiError::validation_error(err.to_string())
            }
            UserServiceError::EmailTaken => ApiError::conflict(err.to_string()),
            UserServiceError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            UserServiceError::InvalidSession => ApiError::unauthorized(err.to_string()),
            UserServiceError::UserNotFound => ApiError::not_found(err.to_string()),
            UserServiceError::Database(e) => {
                tracing::error!(error = ?e, "User service database error");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<EntitlementError> for ApiError {
    fn from(err: EntitlementError) -> Self {
        match err {
            EntitlementError::InvalidSession => ApiError::unauthorized(err.to_string()),
            EntitlementError::LedgerUnavailable(e) => {
                tracing::error!(error = ?e, "Scan ledger unavailable");
                ApiError::service_unavailable("Scan quota is temporarily unavailable")
            }
        }
    }
}

impl From<IdentifyError> for ApiError {
    fn from(err: IdentifyError) -> Self {
        match err {
            IdentifyError::InvalidSession => ApiError::unauthorized(err.to_string()),
            IdentifyError::QuotaExceeded { .. } => {
                ApiError::quota_exceeded("Daily scan limit reached")
            }
            IdentifyError::Classification(e) => ApiError::new(
                "CLASSIFICATION_FAILED",
                format!("Could not identify the bird: {}", e),
            ),
            IdentifyError::Ledger(e) => {
                tracing::error!(error = ?e, "Scan ledger unavailable");
                ApiError::service_unavailable("Scan quota is temporarily unavailable")
            }
        }
    }
}

impl From<SightingError> for ApiError {
    fn from(err: SightingError) -> Self {
        match err {
            SightingError::StorageLimitReached => ApiError::quota_exceeded(err.to_string()),
            SightingError::NotFound => ApiError::not_found(err.to_string()),
            SightingError::Database(e) => {
                tracing::error!(error = ?e, "Sighting service database error");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::UnknownPlan(_) => ApiError::validation_error(err.to_string()),
            BillingError::Declined(_) => ApiError::new("PAYMENT_DECLINED", err.to_string()),
            BillingError::Request(e) => {
                tracing::error!(error = ?e, "Billing provider request failed");
                ApiError::service_unavailable("Billing is temporarily unavailable")
            }
        }
    }
}

/// Extract session token from request
fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = request.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state.user_service.authenticate(&token).await.map_err(|e| match e {
        UserServiceError::InvalidSession => {
            ApiError::unauthorized("Invalid or expired session")
        }
        other => ApiError::from(other),
    })?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}
