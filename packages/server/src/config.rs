use anyhow::{Context, Result};
use dotenvy::dotenv;
use gcp_auth::ServiceAccountKey;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub service_account: ServiceAccountKey,
    pub listings_collection: String,
    pub broadcast_topic: String,
    /// Six-field cron expression for the expiry sweep.
    pub sweep_schedule: String,
    /// How long an expired listing is kept before permanent deletion.
    pub retention_days: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            service_account: ServiceAccountKey::from_env()
                .context("Firebase service account credentials must be available")?,
            listings_collection: env::var("LISTINGS_COLLECTION")
                .unwrap_or_else(|_| "properties".to_string()),
            broadcast_topic: env::var("BROADCAST_TOPIC")
                .unwrap_or_else(|_| "all_users".to_string()),
            sweep_schedule: env::var("SWEEP_SCHEDULE")
                .unwrap_or_else(|_| "0 0 0 * * *".to_string()),
            retention_days: env::var("RETENTION_DAYS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("RETENTION_DAYS must be a valid number")?,
        })
    }
}
