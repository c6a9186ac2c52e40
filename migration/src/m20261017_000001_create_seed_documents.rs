use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SeedDocument::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SeedDocument::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SeedDocument::Collection).string().not_null())
                    .col(ColumnDef::new(SeedDocument::DocId).string().not_null())
                    .col(ColumnDef::new(SeedDocument::NaturalKey).string().null())
                    .col(ColumnDef::new(SeedDocument::Body).text().not_null())
                    .col(
                        ColumnDef::new(SeedDocument::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // `_id` is unique per collection, as in a document database.
        manager
            .create_index(
                Index::create()
                    .unique()
                    .name("uq_seed_document_collection_doc_id")
                    .table(SeedDocument::Table)
                    .col(SeedDocument::Collection)
                    .col(SeedDocument::DocId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // NULL natural keys never collide, so only collections with a
        // declared unique field are constrained.
        manager
            .create_index(
                Index::create()
                    .unique()
                    .name("uq_seed_document_collection_natural_key")
                    .table(SeedDocument::Table)
                    .col(SeedDocument::Collection)
                    .col(SeedDocument::NaturalKey)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SeedDocument::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SeedDocument {
    Table,
    Id,
    Collection,
    DocId,
    NaturalKey,
    Body,
    CreatedAt,
}
