//! Migration to create the polymorphic resource table and its 1:1 metadata
//! sibling.
//!
//! Every hierarchical node (Root, Tenant, Account, ClientOrganizationUnit,
//! Role, Binding) is a row in `tnt_resource`; type-specific extension
//! attributes live in the opaque JSON blob of `tnt_resource_metadata`.
//! Deletion is logical only: `row_status` flips from 1 to 0 on both rows.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TntResource::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TntResource::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TntResource::ResourceTypeId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TntResource::ParentResourceId).uuid().null())
                    .col(ColumnDef::new(TntResource::TenantId).uuid().null())
                    .col(ColumnDef::new(TntResource::Name).text().not_null())
                    .col(
                        ColumnDef::new(TntResource::RowStatus)
                            .small_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(TntResource::CreatedBy).text().not_null())
                    .col(ColumnDef::new(TntResource::UpdatedBy).text().not_null())
                    .col(
                        ColumnDef::new(TntResource::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(TntResource::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tnt_resource_parent")
                    .table(TntResource::Table)
                    .col(TntResource::ParentResourceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tnt_resource_tenant")
                    .table(TntResource::Table)
                    .col(TntResource::TenantId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tnt_resource_type")
                    .table(TntResource::Table)
                    .col(TntResource::ResourceTypeId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TntResourceMetadata::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TntResourceMetadata::ResourceId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TntResourceMetadata::Metadata)
                            .json()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TntResourceMetadata::RowStatus)
                            .small_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(TntResourceMetadata::CreatedBy)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TntResourceMetadata::UpdatedBy)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TntResourceMetadata::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(TntResourceMetadata::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_resource_metadata_resource")
                            .from(TntResourceMetadata::Table, TntResourceMetadata::ResourceId)
                            .to(TntResource::Table, TntResource::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TntResourceMetadata::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TntResource::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TntResource {
    Table,
    Id,
    ResourceTypeId,
    ParentResourceId,
    TenantId,
    Name,
    RowStatus,
    CreatedBy,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TntResourceMetadata {
    Table,
    ResourceId,
    Metadata,
    RowStatus,
    CreatedBy,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}
