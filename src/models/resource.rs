//! Polymorphic resource entity
//!
//! This module contains the SeaORM entity model for the `tnt_resource` table,
//! the single table holding every hierarchical node. The `resource_type_id`
//! tag decides which variant a row projects to.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// One hierarchical node: Root, Tenant, Account, ClientOrganizationUnit,
/// Role or Binding.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tnt_resource")]
pub struct Model {
    /// Unique identifier for the resource (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Foreign key into the resource type catalog
    pub resource_type_id: Uuid,

    /// Parent node; null only for the Root
    pub parent_resource_id: Option<Uuid>,

    /// Nearest tenant ancestor; null for Root and Tenant rows
    pub tenant_id: Option<Uuid>,

    /// Display name (non-empty)
    pub name: String,

    /// 1 = live, 0 = soft-deleted
    pub row_status: i16,

    /// Caller identity that created the row
    pub created_by: String,

    /// Caller identity of the latest update
    pub updated_by: String,

    /// Timestamp when the resource was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp of the latest update
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::resource_metadata::Entity")]
    Metadata,
}

impl Related<super::resource_metadata::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Metadata.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the row is live (not soft-deleted).
    pub fn is_live(&self) -> bool {
        self.row_status == super::ROW_STATUS_LIVE
    }
}
