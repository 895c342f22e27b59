//! Tenant-scoped permission entity

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tnt_permission")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning service identifier (e.g. "iam", "billing")
    pub service_id: String,

    /// Action verb evaluated by the policy service (e.g. "read", "assign")
    pub action: String,

    /// Human-readable permission name
    pub name: String,

    /// 1 = live, 0 = soft-deleted
    pub row_status: i16,

    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
