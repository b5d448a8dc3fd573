pub mod models;

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info, warn};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Opens the pool and applies migrations.
///
/// An unreachable database does not abort startup: the failure is logged and
/// a lazily-connecting pool is returned, so every request reports its own
/// store error until the database comes back. Only a URL that cannot be
/// parsed at all is fatal.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    match create_pool(database_url, max_connections).await {
        Ok(pool) => {
            if let Err(e) = run_migrations(&pool).await {
                error!(error = %e, "Failed to apply database migrations");
            } else {
                info!("Database ready");
            }
            Ok(pool)
        }
        Err(e) => {
            error!(error = %e, "Could not connect to database; serving with a lazy pool");
            let pool = PgPoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(ACQUIRE_TIMEOUT)
                .connect_lazy(database_url)
                .context("DATABASE_URL is not a valid Postgres connection string")?;
            warn!("Migrations were not applied; restart once the database is reachable");
            Ok(pool)
        }
    }
}
