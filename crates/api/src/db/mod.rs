//! Database operations for the Hoby Loop `PostgreSQL` store.
//!
//! ## Tables
//!
//! - `users` - Sellers, consumers and administrators (unique `email`)
//! - `baskets` - Product bundles, owned by a seller
//! - `subscriptions` - A consumer's recurring purchase of a basket
//! - `orders` - Deliveries issued against a subscription
//!
//! Every table uses a `SERIAL` primary key. The seeder writes explicit IDs
//! and then resynchronizes the sequences (see [`crate::seed`]).
//!
//! # Migrations
//!
//! Migrations live in `crates/api/migrations/`, are embedded in [`MIGRATOR`]
//! and run via:
//! ```bash
//! cargo run -p hoby-loop-cli -- migrate
//! ```
//!
//! Queries are built at runtime with `sqlx::query_as` so the workspace
//! compiles without a live database.

pub mod baskets;
pub mod orders;
pub mod subscriptions;
pub mod users;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use baskets::BasketRepository;
pub use orders::OrderRepository;
pub use subscriptions::SubscriptionRepository;
pub use users::UserRepository;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A referenced row does not exist.
    #[error("missing reference: {0}")]
    MissingReference(String),
}

impl RepositoryError {
    /// Classify a write error by the constraint it violated.
    ///
    /// `what` names the row being written, e.g. `"user"`.
    pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                let detail = db_err.constraint().unwrap_or("unique key");
                return Self::Conflict(format!("{what} violates {detail}"));
            }
            if db_err.is_foreign_key_violation() {
                let detail = db_err.constraint().unwrap_or("foreign key");
                return Self::MissingReference(format!("{what} violates {detail}"));
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `max_connections` - Upper bound on pooled connections
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
