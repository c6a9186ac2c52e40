use async_trait::async_trait;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};

use super::{DocumentStore, StoreError};
use crate::config::redact_db_url;

/// Server error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;
/// An equivalent index already exists under another name or options.
const INDEX_CONFLICT_CODES: [i32; 2] = [85, 86];

/// MongoDB-backed store working on the connection target's default database.
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client
            .default_database()
            .ok_or_else(|| StoreError::NoDefaultDatabase(redact_db_url(uri)))?;

        // The driver connects lazily; ping so an unreachable server fails here.
        db.run_command(doc! { "ping": 1 }).await?;

        tracing::debug!(database = %db.name(), "MongoDB connection established");
        Ok(Self { db })
    }

    /// Expose the underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &Bson,
    ) -> Result<Option<Document>, StoreError> {
        let mut filter = Document::new();
        filter.insert(field, value.clone());
        Ok(self.collection(collection).find_one(filter).await?)
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        Ok(self
            .collection(collection)
            .count_documents(Document::new())
            .await?)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        self.collection(collection)
            .insert_one(document)
            .await
            .map_err(|e| classify_write_error(collection, e))?;
        Ok(())
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<(), StoreError> {
        self.collection(collection)
            .insert_many(documents)
            .await
            .map_err(|e| classify_write_error(collection, e))?;
        Ok(())
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        let mut keys = Document::new();
        keys.insert(field, 1);
        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();
        match self.collection(collection).create_index(index).await {
            Ok(_) => Ok(()),
            Err(e) if is_index_conflict(&e) => {
                // e.g. the application already created its own index on the field
                tracing::debug!(collection, field, error = %e, "Keeping existing index");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn classify_write_error(collection: &str, err: mongodb::error::Error) -> StoreError {
    if is_duplicate_key(&err) {
        StoreError::DuplicateKey {
            collection: collection.to_owned(),
        }
    } else {
        StoreError::Mongo(err)
    }
}

fn is_index_conflict(err: &mongodb::error::Error) -> bool {
    matches!(err.kind.as_ref(), ErrorKind::Command(e) if INDEX_CONFLICT_CODES.contains(&e.code))
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY_CODE,
        ErrorKind::InsertMany(e) => e
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|w| w.code == DUPLICATE_KEY_CODE)),
        _ => false,
    }
}
