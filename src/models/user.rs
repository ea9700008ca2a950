//! User model
//!
//! Defines the User entity and the subscription tier enum that drives
//! feature entitlement throughout the system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity representing a registered account.
///
/// The `subscription_tier` field is the single source of truth for feature
/// entitlement. It may only be changed through a confirmed billing event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Email address (unique, used for login)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Current subscription tier
    pub subscription_tier: SubscriptionTier,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// The password must already be hashed; use
    /// `services::password::hash_password()`.
    pub fn new(email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Set by the database
            email,
            password_hash,
            subscription_tier: SubscriptionTier::Free,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the user is on a paying tier
    pub fn is_premium(&self) -> bool {
        self.subscription_tier.is_premium()
    }
}

/// Subscription tier controlling feature access.
///
/// Both premium tiers unlock the same feature set; they differ only in
/// billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    /// Free - 3 identification scans per day, no premium features
    Free,
    /// Premium billed monthly
    PremiumMonthly,
    /// Premium billed yearly
    PremiumYearly,
}

impl SubscriptionTier {
    /// Check whether this tier is a paying tier
    pub fn is_premium(&self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }
}

impl Default for SubscriptionTier {
    fn default() -> Self {
        Self::Free
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionTier::Free => write!(f, "free"),
            SubscriptionTier::PremiumMonthly => write!(f, "premium_monthly"),
            SubscriptionTier::PremiumYearly => write!(f, "premium_yearly"),
        }
    }
}

impl FromStr for SubscriptionTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(SubscriptionTier::Free),
            "premium_monthly" => Ok(SubscriptionTier::PremiumMonthly),
            "premium_yearly" => Ok(SubscriptionTier::PremiumYearly),
            _ => Err(anyhow::anyhow!("Invalid subscription tier: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new_defaults_to_free() {
        let user = User::new("test@example.com".to_string(), "hash".to_string());

        assert_eq!(user.id, 0);
        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.subscription_tier, SubscriptionTier::Free);
        assert!(!user.is_premium());
    }

    #[test]
    fn test_tier_is_premium() {
        assert!(!SubscriptionTier::Free.is_premium());
        assert!(SubscriptionTier::PremiumMonthly.is_premium());
        assert!(SubscriptionTier::PremiumYearly.is_premium());
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(SubscriptionTier::Free.to_string(), "free");
        assert_eq!(SubscriptionTier::PremiumMonthly.to_string(), "premium_monthly");
        assert_eq!(SubscriptionTier::PremiumYearly.to_string(), "premium_yearly");
    }

    #[test]
    fn test_tier_from_str() {
        assert_eq!(
            SubscriptionTier::from_str("free").unwrap(),
            SubscriptionTier::Free
        );
        assert_eq!(
            SubscriptionTier::from_str("PREMIUM_MONTHLY").unwrap(),
            SubscriptionTier::PremiumMonthly
        );
        assert_eq!(
            SubscriptionTier::from_str("premium_yearly").unwrap(),
            SubscriptionTier::PremiumYearly
        );
        assert!(SubscriptionTier::from_str("gold").is_err());
    }

    #[test]
    fn test_tier_default() {
        assert_eq!(SubscriptionTier::default(), SubscriptionTier::Free);
    }
}
