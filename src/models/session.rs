//! Session models
//!
//! Two session notions live here:
//! - `Session`: the persisted auth token row created on login
//! - `AccountSession`: the resolved identity + tier value passed explicitly
//!   through the entitlement and identification flows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::SubscriptionTier;

/// Session entity for token authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (token)
    pub id: String,
    /// Associated user ID
    pub user_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session with a random token and the given lifetime
    pub fn new(user_id: i64, ttl: chrono::Duration) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + ttl,
            created_at: now,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Resolved identity and subscription tier for one authenticated request.
///
/// Built from an authenticated `User` and threaded through service calls
/// instead of being held as ambient global state, so the decision logic is
/// testable without an HTTP harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountSession {
    /// Account identifier
    pub user_id: i64,
    /// Resolved subscription tier
    pub tier: SubscriptionTier,
}

impl AccountSession {
    pub fn new(user_id: i64, tier: SubscriptionTier) -> Self {
        Self { user_id, tier }
    }
}

impl From<&crate::models::User> for AccountSession {
    fn from(user: &crate::models::User) -> Self {
        Self {
            user_id: user.id,
            tier: user.subscription_tier,
        }
    }
}
