//! Resource type catalog entity
//!
//! This module contains the SeaORM entity model for the `mst_resource_type`
//! table. The catalog is seeded at startup and read exactly once by the type
//! registry; there is no mutation path.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// One row per resource kind (Root, Tenant, Account, ...).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "mst_resource_type")]
pub struct Model {
    /// Stable identifier referenced by every resource row
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Kind name, one of the seven fixed resource kinds
    pub name: String,

    /// Timestamp when the catalog row was created
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
