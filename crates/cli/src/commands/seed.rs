//! Seed the database from a JSON or YAML batch file.
//!
//! Re-running with the same file is safe: existing rows are updated in place
//! and nothing is duplicated.

use std::path::Path;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::{error, info, warn};

use hoby_loop_api::config::database_url_from_env;
use hoby_loop_api::seed::{EntityCounts, PgSeedStore, SeedError, load_batch, seed_batch};

/// Default batch file, relative to the working directory.
pub const DEFAULT_SEED_FILE: &str = "data/seed.json";

/// Seed from `file_path`.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the file cannot be read
/// or decoded, the batch is invalid, or the transaction fails.
pub async fn run(file_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    // Read and validate the file before connecting to the database
    let batch = load_batch(file_path).await?;
    info!(
        path = %file_path.display(),
        users = batch.users.len(),
        baskets = batch.baskets.len(),
        subscriptions = batch.subscriptions.len(),
        "Loaded seed batch"
    );

    let database_url = database_url_from_env()?;
    let pool = PgPool::connect(database_url.expose_secret()).await?;
    info!("Connected to database");

    let report = match seed_batch(&PgSeedStore::new(&pool), &batch).await {
        Ok(report) => report,
        Err(SeedError::Invalid(problems)) => {
            error!("Seed file validation failed:");
            for problem in &problems {
                error!("  - {problem}");
            }
            return Err(format!("{} validation errors found", problems.len()).into());
        }
        Err(e) => return Err(e.into()),
    };

    info!("Seeding complete!");
    log_counts("Users", report.users);
    log_counts("Baskets", report.baskets);
    log_counts("Subscriptions", report.subscriptions);

    if !report.warnings.is_empty() {
        warn!("  Warnings: {}", report.warnings.len());
        for warning in &report.warnings {
            warn!("    - {warning}");
        }
    }

    Ok(())
}

fn log_counts(label: &str, counts: EntityCounts) {
    info!(
        "  {label}: {} inserted ({} under new IDs), {} updated ({} matched by email)",
        counts.inserted, counts.reassigned, counts.updated, counts.matched_by_email
    );
}
