use std::path::PathBuf;

use crate::store::StoreError;

/// Failure of a seeding run. Every variant aborts the run with a non-zero exit.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Malformed seed data: {0}")]
    MalformedSeed(String),
    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("Cannot encode document: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),
}
