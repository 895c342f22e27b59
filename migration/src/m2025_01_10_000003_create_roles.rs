//! Migration to create the role specialization table.
//!
//! A role is a resource row plus this specialization; `resource_id` is both
//! primary key and foreign key into `tnt_resource`. The assignable scope of a
//! role is the resource row's parent.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TntRole::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TntRole::ResourceId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TntRole::RoleType).text().not_null())
                    .col(
                        ColumnDef::new(TntRole::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(TntRole::Description).text().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_resource")
                            .from(TntRole::Table, TntRole::ResourceId)
                            .to(TntResource::Table, TntResource::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TntRole::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TntRole {
    Table,
    ResourceId,
    RoleType,
    Version,
    Description,
}

#[derive(DeriveIden)]
enum TntResource {
    Table,
    Id,
}
