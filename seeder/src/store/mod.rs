//! Document store capability used by the seeding phases.
//!
//! The seeding logic only needs four operations over named collections
//! (find one by field equality, count, insert one, insert many) plus a way to
//! declare a unique field. [`connect`] picks a backend from the connection
//! target's scheme: MongoDB for `mongodb://` / `mongodb+srv://`, SeaORM for
//! everything else (`sqlite://`, `postgres://`).

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

pub mod mongo;
pub mod sql;

pub use mongo::MongoStore;
pub use sql::SqlStore;

/// Collection holding application accounts.
pub const USERS: &str = "users";
/// Collection holding resident records.
pub const RESIDENTS: &str = "residents";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("Database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    /// A unique index rejected the write.
    #[error("Duplicate key in collection '{collection}'")]
    DuplicateKey { collection: String },
    #[error("Corrupt document in collection '{collection}': {reason}")]
    Corrupt { collection: String, reason: String },
    #[error("Connection target does not name a default database: {0}")]
    NoDefaultDatabase(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// First document of `collection` whose `field` equals `value`.
    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &Bson,
    ) -> Result<Option<Document>, StoreError>;

    /// Number of documents in `collection`.
    async fn count(&self, collection: &str) -> Result<u64, StoreError>;

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StoreError>;

    /// Bulk insert. Callers never pass an empty batch.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<(), StoreError>;

    /// Declare `field` unique within `collection`. Idempotent.
    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError>;
}

/// True when the connection target is handled by the MongoDB backend.
pub fn is_mongo_target(database_url: &str) -> bool {
    database_url.starts_with("mongodb://") || database_url.starts_with("mongodb+srv://")
}

/// Open a store for `database_url`.
pub async fn connect(database_url: &str) -> Result<Box<dyn DocumentStore>, StoreError> {
    if is_mongo_target(database_url) {
        Ok(Box::new(MongoStore::connect(database_url).await?))
    } else {
        Ok(Box::new(SqlStore::connect(database_url).await?))
    }
}

/// String form of a key value: strings verbatim, anything else as canonical
/// extended JSON.
pub(crate) fn key_string(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        other => other.clone().into_canonical_extjson().to_string(),
    }
}
