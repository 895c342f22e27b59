//! Migration to create the global master catalog.
//!
//! Master roles and permissions are tenant-agnostic templates; every new
//! tenant receives a per-tenant DEFAULT copy of each master role at
//! provisioning time.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MstRole::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MstRole::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(MstRole::Name).text().not_null())
                    .col(ColumnDef::new(MstRole::Description).text().null())
                    .col(
                        ColumnDef::new(MstRole::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(MstRole::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MstPermission::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MstPermission::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MstPermission::ServiceId).text().not_null())
                    .col(ColumnDef::new(MstPermission::Action).text().not_null())
                    .col(ColumnDef::new(MstPermission::Name).text().not_null())
                    .col(
                        ColumnDef::new(MstPermission::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MstRolePermission::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MstRolePermission::RoleId).uuid().not_null())
                    .col(
                        ColumnDef::new(MstRolePermission::PermissionId)
                            .uuid()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(MstRolePermission::RoleId)
                            .col(MstRolePermission::PermissionId),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MstRolePermission::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MstPermission::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MstRole::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MstRole {
    Table,
    Id,
    Name,
    Description,
    Version,
    CreatedAt,
}

#[derive(DeriveIden)]
enum MstPermission {
    Table,
    Id,
    ServiceId,
    Action,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum MstRolePermission {
    Table,
    RoleId,
    PermissionId,
}
