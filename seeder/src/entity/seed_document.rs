use sea_orm::entity::prelude::*;
use uuid::Uuid;

/// One stored document of the SQL-backed document store.
///
/// `body` holds the document as canonical extended JSON, `doc_id` mirrors its
/// `_id`, and `natural_key` carries the value of the collection's unique field
/// (if one was declared).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "seed_document")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub collection: String,
    pub doc_id: String,
    pub natural_key: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
