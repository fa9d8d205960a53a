//! Postgres roster store
//!
//! Connection pooling plus the [`PgRosterStore`] implementation of
//! [`campus_client::RosterStore`]. Enabled by the `database` feature.

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::{info, warn};

mod roster_repository;

pub use roster_repository::PgRosterStore;

use crate::config::VerifyConfig;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
    pub idle_timeout: Option<Duration>,
}

impl DatabaseConfig {
    pub fn from_verify_config(config: &VerifyConfig) -> Result<Self, crate::config::ConfigError> {
        Ok(Self {
            database_url: config.database_url()?,
            max_connections: config.database.pool_size,
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
        })
    }
}

pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(url = %mask_database_url(&config.database_url), "Connecting to roster database");

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connection_timeout);
    if let Some(idle) = config.idle_timeout {
        options = options.idle_timeout(idle);
    }

    options.connect(&config.database_url).await.map_err(|e| {
        warn!(error = %e, "Roster database connection failed");
        e
    })
}

fn mask_database_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let mut masked = parsed.clone();
            if parsed.password().is_some() {
                let _ = masked.set_password(Some("***"));
            }
            masked.to_string()
        }
        Err(_) => "***".to_string(),
    }
}
