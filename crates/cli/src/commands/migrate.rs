//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! hoby-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `HOBY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/api/migrations/` and are embedded in the API
//! crate, so the CLI applies exactly the schema the server was built with.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use hoby_loop_api::config::{ConfigError, database_url_from_env};
use hoby_loop_api::db::MIGRATOR;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run every pending migration.
///
/// # Errors
///
/// Returns `MigrationError` if the URL is missing, the connection fails, or
/// a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = database_url_from_env()?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!(
        available = MIGRATOR.iter().count(),
        "Running migrations..."
    );
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
