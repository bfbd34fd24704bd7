//! Database connection pool management

mod records;

pub use records::{not_found, RecordStore};

use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::str::FromStr;
use std::time::Duration;

use crate::config::Settings;

/// Create a PostgreSQL connection pool
pub async fn create_pool(database_url: &str, settings: &Settings) -> Result<PgPool> {
    let connect_options = PgConnectOptions::from_str(database_url)
        .context("Invalid DATABASE_URL")?
        .application_name("digiurban");

    let pool = PgPoolOptions::new()
        .max_connections(settings.database_max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(1800))
        .connect_with(connect_options)
        .await
        .context("Failed to connect to PostgreSQL")?;

    tracing::info!(
        max_connections = settings.database_max_connections,
        "Database connection pool established"
    );

    Ok(pool)
}

/// Apply pending migrations from `migrations/`
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Open the record store selected by the settings: Postgres when a database URL
/// is configured, the in-process table otherwise.
pub async fn open_store(settings: &Settings) -> Result<RecordStore> {
    match &settings.database_url {
        Some(url) => {
            let pool = create_pool(url, settings).await?;
            migrate(&pool).await?;
            Ok(RecordStore::postgres(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, records are kept in memory");
            Ok(RecordStore::memory())
        }
    }
}
