//! Role specialization entity
//!
//! A role is a resource row plus this `tnt_role` specialization. DEFAULT
//! roles are per-tenant copies of the master catalog made at tenant
//! provisioning; CUSTOM roles are created by callers.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

/// Role kind discriminator stored in `role_type`.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    serde::Serialize,
    serde::Deserialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleType {
    #[sea_orm(string_value = "DEFAULT")]
    Default,
    #[sea_orm(string_value = "CUSTOM")]
    Custom,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tnt_role")]
pub struct Model {
    /// Same id as the owning resource row
    #[sea_orm(primary_key, auto_increment = false)]
    pub resource_id: Uuid,

    /// DEFAULT (master-catalog copy) or CUSTOM
    pub role_type: RoleType,

    /// Monotonic version, bumped on role updates
    pub version: i32,

    /// Optional free-text description
    pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::resource::Entity",
        from = "Column::ResourceId",
        to = "super::resource::Column::Id"
    )]
    Resource,
}

impl Related<super::resource::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Resource.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
