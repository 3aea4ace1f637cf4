// Main entry point for the listing backend server

use std::sync::Arc;

use anyhow::{Context, Result};
use gcp_auth::{TokenProvider, FIRESTORE_SCOPE, MESSAGING_SCOPE};
use server_core::kernel::{start_scheduler, FcmPushService, FirestoreListingStore, ServerDeps};
use server_core::server::build_app;
use server_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting listing notification backend");

    // Load configuration; a missing or malformed service account key is
    // fatal here, before any client exists.
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Clients are built exactly once and handed to everything through
    // ServerDeps.
    let auth = Arc::new(
        TokenProvider::new(
            config.service_account.clone(),
            &[FIRESTORE_SCOPE, MESSAGING_SCOPE],
        )
        .context("Failed to initialize Google credentials")?,
    );
    let firestore_client = Arc::new(
        firestore::FirestoreClient::new(auth.clone())
            .context("Failed to create Firestore client")?,
    );
    let fcm_client =
        Arc::new(fcm::FcmClient::new(auth).context("Failed to create FCM client")?);

    let deps = Arc::new(ServerDeps::new(
        Arc::new(FirestoreListingStore::new(
            firestore_client,
            config.listings_collection.clone(),
        )),
        Arc::new(FcmPushService::new(fcm_client)),
        config.broadcast_topic.clone(),
        chrono::Duration::days(config.retention_days),
    ));

    // Start the expiry sweep schedule
    let _scheduler = start_scheduler(deps.clone(), &config.sweep_schedule)
        .await
        .context("Failed to start scheduled tasks")?;

    // Build application
    let app = build_app(deps);

    // Bind on all interfaces so devices on the local network can reach it
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
