//! Migration to create tenant-scoped permissions and the role-permission join
//! table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TntPermission::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TntPermission::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TntPermission::ServiceId).text().not_null())
                    .col(ColumnDef::new(TntPermission::Action).text().not_null())
                    .col(ColumnDef::new(TntPermission::Name).text().not_null())
                    .col(
                        ColumnDef::new(TntPermission::RowStatus)
                            .small_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(TntPermission::CreatedBy).text().not_null())
                    .col(ColumnDef::new(TntPermission::UpdatedBy).text().not_null())
                    .col(
                        ColumnDef::new(TntPermission::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(TntPermission::UpdatedAt)
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
                    .table(TntRolePermission::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TntRolePermission::RoleId).uuid().not_null())
                    .col(
                        ColumnDef::new(TntRolePermission::PermissionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TntRolePermission::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(TntRolePermission::RoleId)
                            .col(TntRolePermission::PermissionId),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TntRolePermission::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TntPermission::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TntPermission {
    Table,
    Id,
    ServiceId,
    Action,
    Name,
    RowStatus,
    CreatedBy,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TntRolePermission {
    Table,
    RoleId,
    PermissionId,
    CreatedAt,
}
