//! Seeder errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that abort a seeding run.
///
/// Every variant means nothing was written: decoding and validation fail
/// before a transaction is opened, and store failures roll the transaction
/// back.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The seed file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The seed file is not a well-formed batch.
    #[error("failed to decode seed batch: {0}")]
    Decode(String),

    /// The batch decoded but is internally inconsistent.
    #[error("seed batch rejected: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// Two batch records resolved to the same stored row.
    #[error("{entity} {batch_id} resolves to stored {entity} {stored_id}, which another record in this batch already wrote")]
    IdentityClash {
        /// Table the records belong to.
        entity: &'static str,
        /// ID the second record carried in the batch.
        batch_id: i32,
        /// Row both records resolved to.
        stored_id: i32,
    },

    /// Writing one record failed.
    #[error("{record}: {source}")]
    Record {
        /// Which record, e.g. `user 3 <ana@hoby.com.br>`.
        record: String,
        #[source]
        source: RepositoryError,
    },

    /// Opening or committing the transaction failed.
    #[error("seed transaction failed: {0}")]
    Store(#[from] RepositoryError),
}

impl SeedError {
    pub(crate) fn record(record: impl Into<String>) -> impl FnOnce(RepositoryError) -> Self {
        let record = record.into();
        move |source| Self::Record { record, source }
    }
}
