//! PostgreSQL pool for the event tables
//!
//! The pool is sized from `[database]` settings. Connection URLs carry the
//! password, so only [`redacted_url`] output is ever logged.

use std::time::{Duration, Instant};

use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::{debug, info};
use url::Url;

use crate::config::settings::DatabaseConfig;
use crate::utils::errors::Result;

pub type DatabasePool = Pool<Postgres>;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/official_id".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
        }
    }
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(settings: &DatabaseConfig) -> Self {
        Self {
            url: settings.url.clone(),
            max_connections: settings.max_connections,
            min_connections: settings.min_connections,
            acquire_timeout: Duration::from_secs(settings.acquire_timeout_secs),
            idle_timeout: settings.idle_timeout_secs.map(Duration::from_secs),
            max_lifetime: settings.max_lifetime_secs.map(Duration::from_secs),
        }
    }
}

/// `url` with the password masked, for logs
pub fn redacted_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "<unparseable database url>".to_string(),
    }
}

/// Open the pool and make sure one round trip succeeds
pub async fn create_pool(config: &PoolConfig) -> Result<DatabasePool> {
    let started = Instant::now();
    let target = redacted_url(&config.url);
    debug!(target_db = %target, "Connecting to PostgreSQL");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .connect(&config.url)
        .await?;

    health_check(&pool).await?;

    info!(
        target_db = %target,
        max_connections = config.max_connections,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Database pool ready"
    );
    Ok(pool)
}

/// Apply the event workflow schema
pub async fn run_migrations(pool: &DatabasePool) -> Result<()> {
    info!(known = MIGRATOR.iter().count(), "Applying migrations");
    MIGRATOR.run(pool).await?;
    info!("Migrations applied");
    Ok(())
}

pub async fn health_check(pool: &DatabasePool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
