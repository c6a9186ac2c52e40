use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use mongodb::bson::{Bson, Document};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use super::{DocumentStore, StoreError, key_string};
use crate::entity::seed_document;

/// Document store on top of a relational database (SQLite or Postgres).
///
/// Each document is one `seed_document` row. Unique fields declared through
/// [`DocumentStore::ensure_unique_index`] are copied into `natural_key`, which
/// carries a unique index per collection.
pub struct SqlStore {
    db: DatabaseConnection,
    unique_fields: RwLock<HashMap<String, String>>,
}

impl SqlStore {
    /// Connect and bring the schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let db = Database::connect(database_url).await?;
        Migrator::up(&db, None).await?;
        Ok(Self::new(db))
    }

    /// Wrap an already-migrated connection.
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            unique_fields: RwLock::new(HashMap::new()),
        }
    }

    /// All documents of `collection`, in insertion order.
    pub async fn documents(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let rows = seed_document::Entity::find()
            .filter(seed_document::Column::Collection.eq(collection))
            .all(&self.db)
            .await?;
        rows.iter().map(|row| decode_body(collection, &row.body)).collect()
    }

    fn unique_field(&self, collection: &str) -> Option<String> {
        self.unique_fields
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(collection)
            .cloned()
    }

    fn to_active_model(
        &self,
        collection: &str,
        document: Document,
    ) -> seed_document::ActiveModel {
        let (doc_id, document) = match document.get("_id") {
            Some(id) => (key_string(id), document),
            None => {
                // Same shape a document database produces: `_id` first.
                let id = Uuid::now_v7().to_string();
                let mut with_id = Document::new();
                with_id.insert("_id", id.clone());
                for (key, value) in document {
                    with_id.insert(key, value);
                }
                (id, with_id)
            }
        };
        let natural_key = self
            .unique_field(collection)
            .and_then(|field| document.get(&field).map(key_string));

        seed_document::ActiveModel {
            id: Set(Uuid::now_v7()),
            collection: Set(collection.to_owned()),
            doc_id: Set(doc_id),
            natural_key: Set(natural_key),
            body: Set(encode_body(document)),
            created_at: Set(Utc::now().naive_utc()),
        }
    }
}

#[async_trait]
impl DocumentStore for SqlStore {
    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &Bson,
    ) -> Result<Option<Document>, StoreError> {
        let in_collection =
            || seed_document::Entity::find().filter(seed_document::Column::Collection.eq(collection));

        let query = if field == "_id" {
            in_collection().filter(seed_document::Column::DocId.eq(key_string(value)))
        } else if self.unique_field(collection).as_deref() == Some(field) {
            let keyed = in_collection()
                .filter(seed_document::Column::NaturalKey.eq(key_string(value)))
                .all(&self.db)
                .await?;
            if let Some(document) = first_match(collection, keyed, field, value)? {
                return Ok(Some(document));
            }
            // Rows stored before the field was declared unique carry no natural key.
            in_collection().filter(seed_document::Column::NaturalKey.is_null())
        } else {
            in_collection()
        };

        first_match(collection, query.all(&self.db).await?, field, value)
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        let count = seed_document::Entity::find()
            .filter(seed_document::Column::Collection.eq(collection))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        self.to_active_model(collection, document)
            .insert(&self.db)
            .await
            .map_err(|e| classify_db_error(collection, e))?;
        Ok(())
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;
        for document in documents {
            self.to_active_model(collection, document)
                .insert(&txn)
                .await
                .map_err(|e| classify_db_error(collection, e))?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        self.unique_fields
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(collection.to_owned(), field.to_owned());
        Ok(())
    }
}

fn classify_db_error(collection: &str, err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::DuplicateKey {
            collection: collection.to_owned(),
        },
        _ => StoreError::Db(err),
    }
}

fn first_match(
    collection: &str,
    rows: Vec<seed_document::Model>,
    field: &str,
    value: &Bson,
) -> Result<Option<Document>, StoreError> {
    for row in rows {
        let document = decode_body(collection, &row.body)?;
        if document.get(field) == Some(value) {
            return Ok(Some(document));
        }
    }
    Ok(None)
}

fn encode_body(document: Document) -> String {
    Bson::Document(document).into_canonical_extjson().to_string()
}

fn decode_body(collection: &str, body: &str) -> Result<Document, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        collection: collection.to_owned(),
        reason,
    };
    let json: serde_json::Value = serde_json::from_str(body).map_err(|e| corrupt(e.to_string()))?;
    match Bson::try_from(json).map_err(|e| corrupt(e.to_string()))? {
        Bson::Document(document) => Ok(document),
        other => Err(corrupt(format!("expected a document, got {:?}", other.element_type()))),
    }
}
