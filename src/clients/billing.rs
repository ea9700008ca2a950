//! Billing provider client
//!
//! Creates subscriptions with the external billing provider. A user's tier
//! may only change after this client returns a confirmed result; a timeout
//! or transport error must never be treated as success.

use crate::config::BillingConfig;
use crate::models::SubscriptionTier;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Billing client errors
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Unknown plan '{0}'")]
    UnknownPlan(String),

    #[error("Payment was declined: {0}")]
    Declined(String),

    #[error("Billing request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Confirmed subscription from the billing provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfirmation {
    /// Provider-side subscription id
    pub subscription_id: String,
    /// Tier the confirmed plan maps to
    pub tier: SubscriptionTier,
}

/// Subscription billing provider
#[async_trait]
pub trait BillingClient: Send + Sync {
    /// Create a subscription. Only a returned confirmation is proof of
    /// payment; callers must not change entitlements on error.
    async fn create_subscription(
        &self,
        plan_id: &str,
        payment_token: &str,
    ) -> Result<SubscriptionConfirmation, BillingError>;
}

/// HTTP billing implementation
pub struct HttpBillingClient {
    http: reqwest::Client,
    config: BillingConfig,
}

#[derive(Serialize)]
struct SubscribeRequest<'a> {
    plan_id: &'a str,
    payment_token: &'a str,
}

#[derive(Deserialize)]
struct SubscribeResponse {
    subscription_id: String,
    status: String,
    #[serde(default)]
    decline_reason: Option<String>,
}

impl HttpBillingClient {
    pub fn new(config: BillingConfig) -> Result<Self, BillingError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl BillingClient for HttpBillingClient {
    async fn create_subscription(
        &self,
        plan_id: &str,
        payment_token: &str,
    ) -> Result<SubscriptionConfirmation, BillingError> {
        let tier = plan_tier(plan_id).ok_or_else(|| BillingError::UnknownPlan(plan_id.to_string()))?;

        let url = format!("{}/subscriptions", self.config.base_url);
        let mut request = self.http.post(&url).json(&SubscribeRequest {
            plan_id,
            payment_token,
        });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let body: SubscribeResponse = response.json().await?;

        if body.status != "active" {
            return Err(BillingError::Declined(
                body.decline_reason.unwrap_or(body.status),
            ));
        }

        Ok(SubscriptionConfirmation {
            subscription_id: body.subscription_id,
            tier,
        })
    }
}

/// Tier a purchasable plan maps to; `None` for unknown or free plans
pub fn plan_tier(plan_id: &str) -> Option<SubscriptionTier> {
    match plan_id {
        "premium_monthly" => Some(SubscriptionTier::PremiumMonthly),
        "premium_yearly" => Some(SubscriptionTier::PremiumYearly),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_tier_mapping() {
        assert_eq!(plan_tier("premium_monthly"), Some(SubscriptionTier::PremiumMonthly));
        assert_eq!(plan_tier("premium_yearly"), Some(SubscriptionTier::PremiumYearly));
        assert_eq!(plan_tier("free"), None);
        assert_eq!(plan_tier("expert"), None);
    }
}
