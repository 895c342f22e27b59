//! # Data Models
//!
//! SeaORM entity models for the IAM Registry tables: the polymorphic
//! resource table, its metadata sibling, the role/permission specializations
//! and the tenant-agnostic master catalog.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod master_permission;
pub mod master_role;
pub mod master_role_permission;
pub mod permission;
pub mod resource;
pub mod resource_metadata;
pub mod resource_type;
pub mod role;
pub mod role_permission;

pub use master_permission::Entity as MasterPermission;
pub use master_role::Entity as MasterRole;
pub use master_role_permission::Entity as MasterRolePermission;
pub use permission::Entity as Permission;
pub use resource::Entity as Resource;
pub use resource_metadata::Entity as ResourceMetadata;
pub use resource_type::Entity as ResourceType;
pub use role::Entity as Role;
pub use role_permission::Entity as RolePermission;

/// Row status marker: 1 = live, 0 = soft-deleted.
pub const ROW_STATUS_LIVE: i16 = 1;
/// Row status marker for soft-deleted rows.
pub const ROW_STATUS_DELETED: i16 = 0;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "iam-registry".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
