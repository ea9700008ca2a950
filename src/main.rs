//! BirdScope - bird identification backend

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use birdscope::{
    api::{self, AppState},
    clients::{HttpAudioClient, HttpBillingClient, HttpClassifierClient, HttpEncyclopediaClient},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxScanLedgerRepository, SqlxSessionRepository, SqlxSightingRepository,
            SqlxUserRepository,
        },
    },
    services::{
        EntitlementService, IdentificationService, SightingService, SystemClock, UserService,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "birdscope=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting BirdScope backend...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let ledger_repo = SqlxScanLedgerRepository::boxed(pool.clone());
    let sighting_repo = SqlxSightingRepository::boxed(pool.clone());

    // Collaborator clients
    let classifier = Arc::new(HttpClassifierClient::new(config.classifier.clone())?);
    let encyclopedia = Arc::new(HttpEncyclopediaClient::new(config.encyclopedia.clone())?);
    let audio = Arc::new(HttpAudioClient::new(config.audio.clone())?);
    let billing = Arc::new(HttpBillingClient::new(config.billing.clone())?);

    // Services
    let user_service = Arc::new(UserService::new(user_repo, session_repo.clone()));
    let entitlement_service = Arc::new(EntitlementService::new(ledger_repo, SystemClock::boxed()));
    let identification_service = Arc::new(IdentificationService::new(
        entitlement_service.clone(),
        classifier,
        encyclopedia.clone(),
        audio,
        Duration::from_secs(config.encyclopedia.cache_ttl_seconds),
    ));
    let sighting_service = Arc::new(SightingService::new(
        sighting_repo,
        entitlement_service.clone(),
    ));

    // Periodic sweep of expired sessions
    {
        let sessions = session_repo.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3600));
            loop {
                interval.tick().await;
                match sessions.delete_expired().await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(count = n, "Swept expired sessions"),
                    Err(e) => tracing::warn!(error = ?e, "Expired session sweep failed"),
                }
            }
        });
    }

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        user_service,
        entitlement_service,
        identification_service,
        sighting_service,
        encyclopedia,
        billing,
    };

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
