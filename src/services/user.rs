//! User service
//!
//! Account lifecycle: registration, login, logout, session resolution, and
//! the tier change applied after a confirmed billing event.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, SubscriptionTier, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::Duration;
use std::sync::Arc;
use thiserror::Error;

/// How long a login session stays valid
const SESSION_TTL_DAYS: i64 = 7;

const MIN_PASSWORD_LENGTH: usize = 8;

/// User service errors
#[derive(Debug, Error)]
pub enum UserServiceError {
    #[error("Email address is not valid")]
    InvalidEmail,

    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    WeakPassword,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Session is invalid or expired")]
    InvalidSession,

    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// User service
pub struct UserService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, sessions: Arc<dyn SessionRepository>) -> Self {
        Self { users, sessions }
    }

    /// Register a new account and open a session for it
    pub async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, Session), UserServiceError> {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(UserServiceError::InvalidEmail);
        }
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(UserServiceError::WeakPassword);
        }

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(UserServiceError::EmailTaken);
        }

        let password_hash = hash_password(password).context("Failed to hash password")?;
        let user = self.users.create(&User::new(email, password_hash)).await?;
        let session = self.open_session(user.id).await?;

        tracing::info!(user_id = user.id, "Registered new account");
        Ok((user, session))
    }

    /// Verify credentials and open a session
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, Session), UserServiceError> {
        let email = email.trim().to_lowercase();
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(UserServiceError::InvalidCredentials)?;

        let matches = verify_password(password, &user.password_hash)
            .context("Failed to verify password")?;
        if !matches {
            return Err(UserServiceError::InvalidCredentials);
        }

        let session = self.open_session(user.id).await?;
        Ok((user, session))
    }

    /// Delete a session token (idempotent)
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.sessions.delete(token).await?;
        Ok(())
    }

    /// Resolve a session token into its user.
    ///
    /// Expired sessions are rejected and swept from storage on sight.
    pub async fn authenticate(&self, token: &str) -> Result<User, UserServiceError> {
        let session = self
            .sessions
            .get_by_id(token)
            .await?
            .ok_or(UserServiceError::InvalidSession)?;

        if session.is_expired() {
            self.sessions.delete(token).await?;
            return Err(UserServiceError::InvalidSession);
        }

        self.users
            .get_by_id(session.user_id)
            .await?
            .ok_or(UserServiceError::InvalidSession)
    }

    /// Apply a subscription tier change.
    ///
    /// Must only be called with a tier taken from a confirmed billing
    /// result; this method does not talk to the billing provider itself.
    pub async fn apply_tier_change(
        &self,
        user_id: i64,
        tier: SubscriptionTier,
    ) -> Result<User, UserServiceError> {
        if self.users.get_by_id(user_id).await?.is_none() {
            return Err(UserServiceError::UserNotFound);
        }

        self.users.set_tier(user_id, tier).await?;
        tracing::info!(user_id, tier = %tier, "Applied subscription tier change");

        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(UserServiceError::UserNotFound)
    }

    async fn open_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let session = Session::new(user_id, Duration::days(SESSION_TTL_DAYS));
        self.sessions.create(&session).await?;
        Ok(session)
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
        )
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let service = setup().await;

        let (user, session) = service
            .register("Birder@Example.com", "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(user.email, "birder@example.com");
        assert_eq!(user.subscription_tier, SubscriptionTier::Free);

        let resolved = service.authenticate(&session.id).await.unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let service = setup().await;

        assert!(matches!(
            service.register("not-an-email", "hunter2hunter2").await,
            Err(UserServiceError::InvalidEmail)
        ));
        assert!(matches!(
            service.register("a@example.com", "short").await,
            Err(UserServiceError::WeakPassword)
        ));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let service = setup().await;

        service.register("a@example.com", "hunter2hunter2").await.unwrap();
        assert!(matches!(
            service.register("a@example.com", "hunter2hunter2").await,
            Err(UserServiceError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let service = setup().await;
        service.register("a@example.com", "hunter2hunter2").await.unwrap();

        assert!(matches!(
            service.login("a@example.com", "wrong-password").await,
            Err(UserServiceError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login("nobody@example.com", "hunter2hunter2").await,
            Err(UserServiceError::InvalidCredentials)
        ));

        let (user, _) = service.login("a@example.com", "hunter2hunter2").await.unwrap();
        assert_eq!(user.email, "a@example.com");
    }

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        let service = setup().await;
        let (_, session) = service.register("a@example.com", "hunter2hunter2").await.unwrap();

        service.logout(&session.id).await.unwrap();
        assert!(matches!(
            service.authenticate(&session.id).await,
            Err(UserServiceError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_token() {
        let service = setup().await;
        assert!(matches!(
            service.authenticate("no-such-token").await,
            Err(UserServiceError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_apply_tier_change() {
        let service = setup().await;
        let (user, _) = service.register("a@example.com", "hunter2hunter2").await.unwrap();

        let updated = service
            .apply_tier_change(user.id, SubscriptionTier::PremiumYearly)
            .await
            .unwrap();
        assert_eq!(updated.subscription_tier, SubscriptionTier::PremiumYearly);

        assert!(matches!(
            service.apply_tier_change(999, SubscriptionTier::Free).await,
            Err(UserServiceError::UserNotFound)
        ));
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("a@example.com"));
        assert!(!is_valid_email("aexample.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@nodot"));
        assert!(!is_valid_email("a@.com"));
    }
}
