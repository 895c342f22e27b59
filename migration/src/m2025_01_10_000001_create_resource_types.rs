//! Migration to create the resource type catalog.
//!
//! The catalog is immutable at runtime; rows are seeded at startup and the
//! type registry reads them exactly once.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MstResourceType::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MstResourceType::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MstResourceType::Name)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(MstResourceType::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MstResourceType::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MstResourceType {
    Table,
    Id,
    Name,
    CreatedAt,
}
