//! Persistence of wholesaler integrations: the [`SessionStore`] seam, its
//! Postgres and in-memory implementations, pool setup and migrations.

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use wsproxy_core::AppConfig;

// Resolved from crates/wsproxy-db/ to the workspace `migrations/` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Pool sizing, taken from `WSPROXY_DB_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Opens a pool against `database_url`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if no connection can be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Connects the Postgres session store described by `config`.
///
/// # Errors
///
/// Returns [`DbError::MissingDatabaseUrl`] when `config` has no database URL,
/// or [`DbError::Sqlx`] if the connection fails.
pub async fn open_store(config: &AppConfig) -> Result<PgSessionStore, DbError> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or(DbError::MissingDatabaseUrl)?;
    let pool = connect_pool(database_url, PoolConfig::from_app_config(config)).await?;
    Ok(PgSessionStore::new(pool))
}

/// Applies pending migrations and returns how many ran.
///
/// # Errors
///
/// Returns [`DbError::Migration`] if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, DbError> {
    // Missing on a fresh database, which counts as nothing applied.
    let already_applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    MIGRATOR.run(pool).await?;

    let known = MIGRATOR.iter().count();
    Ok(known.saturating_sub(usize::try_from(already_applied).unwrap_or(0)))
}

/// `SELECT 1` on the pool.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

pub mod integrations;
pub mod memory;
pub mod store;

pub use integrations::{IntegrationRow, PgSessionStore};
pub use memory::MemorySessionStore;
pub use store::{AnyStore, SessionStore};
