//! Resource metadata entity
//!
//! 1:1 sibling of `tnt_resource` holding the opaque JSON blob with the
//! type-specific extension attributes. Shares `row_status` with its resource
//! row; soft-delete is joint.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tnt_resource_metadata")]
pub struct Model {
    /// Same id as the owning resource row
    #[sea_orm(primary_key, auto_increment = false)]
    pub resource_id: Uuid,

    /// Opaque, type-specific JSON attributes
    pub metadata: Json,

    /// 1 = live, 0 = soft-deleted (always equal to the resource row)
    pub row_status: i16,

    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
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
