//! Relational resource store.
//!
//! Persistence layer over the polymorphic resource table, its metadata
//! sibling, the role and permission specializations and the master catalog.
//! Every method takes the connection as a parameter so callers can run a
//! group of writes inside one transaction. Structural rules live here:
//! legal parent kinds, tenant ancestry, joint soft-delete of the resource
//! and metadata rows, and name uniqueness where the kind requires it.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{
    ROW_STATUS_DELETED, ROW_STATUS_LIVE, master_permission, master_role, master_role_permission,
    permission, resource, resource_metadata, role, role_permission,
};
use crate::registry::{ResourceKind, TypeRegistry};

/// Input for inserting one resource row with its metadata sibling.
#[derive(Debug, Clone)]
pub struct NewResource {
    pub id: Uuid,
    pub kind: ResourceKind,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub metadata: serde_json::Value,
    pub caller: String,
}

/// Placement decision for a new resource: the loaded parent row (if any)
/// and the tenant ancestor the row will carry.
#[derive(Debug, Clone)]
pub struct Placement {
    pub parent: Option<resource::Model>,
    pub tenant_id: Option<Uuid>,
}

/// Parent-chain walks are bounded; deeper live hierarchies are corrupt.
const MAX_PARENT_DEPTH: usize = 32;

#[derive(Debug, Clone)]
pub struct ResourceStore {
    registry: TypeRegistry,
}

impl ResourceStore {
    pub fn new(registry: TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Kind of a stored row. An id outside the catalog means the catalog and
    /// the data diverged, which is an internal fault.
    pub fn kind_of_row(&self, row: &resource::Model) -> Result<ResourceKind, CoreError> {
        self.registry.kind_of(row.resource_type_id).ok_or_else(|| {
            CoreError::Internal(format!(
                "resource {} has unknown resource_type_id {}",
                row.id, row.resource_type_id
            ))
        })
    }

    /// Row lookup. `include_deleted` is the admin-only escape hatch; regular
    /// callers go through [`find_live`](Self::find_live).
    pub async fn find_resource<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
        include_deleted: bool,
    ) -> Result<Option<resource::Model>, CoreError> {
        let mut query = resource::Entity::find_by_id(id);
        if !include_deleted {
            query = query.filter(resource::Column::RowStatus.eq(ROW_STATUS_LIVE));
        }
        Ok(query.one(db).await?)
    }

    pub async fn find_live<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
    ) -> Result<Option<resource::Model>, CoreError> {
        self.find_resource(db, id, false).await
    }

    pub async fn require_live<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
    ) -> Result<resource::Model, CoreError> {
        self.find_live(db, id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("resource {} not found", id)))
    }

    /// Live row that must be of the given kind.
    pub async fn require_live_of_kind<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
        kind: ResourceKind,
    ) -> Result<resource::Model, CoreError> {
        let row = self
            .find_live(db, id)
            .await?
            .filter(|row| row.resource_type_id == self.registry.type_id(kind))
            .ok_or_else(|| CoreError::not_found(format!("{} {} not found", kind, id)))?;
        Ok(row)
    }

    /// Live metadata blob for a resource, if the sibling row exists.
    pub async fn load_metadata<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
    ) -> Result<Option<serde_json::Value>, CoreError> {
        let row = resource_metadata::Entity::find_by_id(id)
            .filter(resource_metadata::Column::RowStatus.eq(ROW_STATUS_LIVE))
            .one(db)
            .await?;
        Ok(row.map(|m| m.metadata))
    }

    /// All rows of one kind. `include_deleted` keeps soft-deleted rows in the
    /// result (admin-only path).
    pub async fn resources_of_kind<C: ConnectionTrait>(
        &self,
        db: &C,
        kind: ResourceKind,
        include_deleted: bool,
    ) -> Result<Vec<resource::Model>, CoreError> {
        let mut query = resource::Entity::find()
            .filter(resource::Column::ResourceTypeId.eq(self.registry.type_id(kind)));
        if !include_deleted {
            query = query.filter(resource::Column::RowStatus.eq(ROW_STATUS_LIVE));
        }
        Ok(query.all(db).await?)
    }

    pub async fn list_of_kind<C: ConnectionTrait>(
        &self,
        db: &C,
        kind: ResourceKind,
    ) -> Result<Vec<resource::Model>, CoreError> {
        self.resources_of_kind(db, kind, false).await
    }

    pub async fn children_of<C: ConnectionTrait>(
        &self,
        db: &C,
        parent_id: Uuid,
    ) -> Result<Vec<resource::Model>, CoreError> {
        let rows = resource::Entity::find()
            .filter(resource::Column::ParentResourceId.eq(parent_id))
            .filter(resource::Column::RowStatus.eq(ROW_STATUS_LIVE))
            .all(db)
            .await?;
        Ok(rows)
    }

    pub async fn live_children_exist<C: ConnectionTrait>(
        &self,
        db: &C,
        parent_id: Uuid,
    ) -> Result<bool, CoreError> {
        let count = resource::Entity::find()
            .filter(resource::Column::ParentResourceId.eq(parent_id))
            .filter(resource::Column::RowStatus.eq(ROW_STATUS_LIVE))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    /// All live rows whose `tenant_id` is the given tenant.
    pub async fn tenant_subtree<C: ConnectionTrait>(
        &self,
        db: &C,
        tenant_id: Uuid,
    ) -> Result<Vec<resource::Model>, CoreError> {
        let rows = resource::Entity::find()
            .filter(resource::Column::TenantId.eq(tenant_id))
            .filter(resource::Column::RowStatus.eq(ROW_STATUS_LIVE))
            .all(db)
            .await?;
        Ok(rows)
    }

    async fn sibling_name_taken<C: ConnectionTrait>(
        &self,
        db: &C,
        kind: ResourceKind,
        parent_id: Option<Uuid>,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, CoreError> {
        let mut query = resource::Entity::find()
            .filter(resource::Column::ResourceTypeId.eq(self.registry.type_id(kind)))
            .filter(resource::Column::Name.eq(name))
            .filter(resource::Column::RowStatus.eq(ROW_STATUS_LIVE));
        query = match parent_id {
            Some(parent_id) => query.filter(resource::Column::ParentResourceId.eq(parent_id)),
            None => query.filter(resource::Column::ParentResourceId.is_null()),
        };
        if let Some(exclude) = exclude {
            query = query.filter(resource::Column::Id.ne(exclude));
        }
        Ok(query.count(db).await? > 0)
    }

    fn kinds_with_unique_names(kind: ResourceKind) -> bool {
        matches!(
            kind,
            ResourceKind::ClientOrganizationUnit | ResourceKind::Role
        )
    }

    /// Check that `kind` may be created under `parent_id` and derive the
    /// tenant ancestor the new row will carry.
    pub async fn validate_placement<C: ConnectionTrait>(
        &self,
        db: &C,
        kind: ResourceKind,
        parent_id: Option<Uuid>,
    ) -> Result<Placement, CoreError> {
        let legal = kind.legal_parents();

        if legal.is_empty() {
            if parent_id.is_some() {
                return Err(CoreError::validation(format!(
                    "{} resources do not take a parent",
                    kind
                )));
            }
            if kind == ResourceKind::Root && self.list_of_kind(db, kind).await?.first().is_some() {
                return Err(CoreError::conflict("a root resource already exists"));
            }
            return Ok(Placement {
                parent: None,
                tenant_id: None,
            });
        }

        let parent_id = parent_id.ok_or_else(|| {
            CoreError::validation(format!("{} resources require a parent", kind))
        })?;
        let parent = self.require_live(db, parent_id).await?;
        let parent_kind = self.kind_of_row(&parent)?;

        if !legal.contains(&parent_kind) {
            return Err(CoreError::validation(format!(
                "{} cannot be created under {}",
                kind, parent_kind
            )));
        }

        let tenant_id = match kind {
            ResourceKind::Tenant => None,
            _ => match parent_kind {
                ResourceKind::Tenant => Some(parent.id),
                _ => parent.tenant_id,
            },
        };
        if kind.requires_tenant() && tenant_id.is_none() {
            return Err(CoreError::validation(format!(
                "{} requires a tenant ancestor",
                kind
            )));
        }

        Ok(Placement {
            parent: Some(parent),
            tenant_id,
        })
    }

    /// Insert the resource row and its metadata sibling.
    ///
    /// Placement must have been validated first; this re-derives and enforces
    /// it so a caller cannot skip the structural rules.
    pub async fn insert_resource<C: ConnectionTrait>(
        &self,
        db: &C,
        new: NewResource,
    ) -> Result<resource::Model, CoreError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("name must not be empty"));
        }

        let placement = self.validate_placement(db, new.kind, new.parent_id).await?;

        if Self::kinds_with_unique_names(new.kind)
            && self
                .sibling_name_taken(db, new.kind, new.parent_id, name, None)
                .await?
        {
            return Err(CoreError::conflict(format!(
                "a {} named '{}' already exists under this parent",
                new.kind, name
            )));
        }

        let now = Utc::now().into();
        let row = resource::ActiveModel {
            id: Set(new.id),
            resource_type_id: Set(self.registry.type_id(new.kind)),
            parent_resource_id: Set(new.parent_id),
            tenant_id: Set(placement.tenant_id),
            name: Set(name.to_string()),
            row_status: Set(ROW_STATUS_LIVE),
            created_by: Set(new.caller.clone()),
            updated_by: Set(new.caller.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        resource_metadata::ActiveModel {
            resource_id: Set(new.id),
            metadata: Set(new.metadata),
            row_status: Set(ROW_STATUS_LIVE),
            created_by: Set(new.caller.clone()),
            updated_by: Set(new.caller),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        Ok(row)
    }

    /// Rename, re-parent and/or replace the metadata blob of a live resource.
    ///
    /// A new parent is re-validated against the legal-parent set and must
    /// derive the same tenant ancestor; the tenant is immutable after
    /// creation. `metadata` is the already-merged blob.
    pub async fn update_resource<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
        name: Option<String>,
        parent: Option<Uuid>,
        metadata: Option<serde_json::Value>,
        caller: &str,
    ) -> Result<resource::Model, CoreError> {
        let row = self.require_live(db, id).await?;
        let kind = self.kind_of_row(&row)?;
        let now = Utc::now().into();

        let effective_name = match &name {
            Some(name) => {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    return Err(CoreError::validation("name must not be empty"));
                }
                trimmed.to_string()
            }
            None => row.name.clone(),
        };

        let new_parent = parent.filter(|p| Some(*p) != row.parent_resource_id);
        if let Some(new_parent) = new_parent {
            if new_parent == id {
                return Err(CoreError::validation(
                    "a resource cannot be its own parent",
                ));
            }
            let placement = self.validate_placement(db, kind, Some(new_parent)).await?;
            if placement.tenant_id != row.tenant_id {
                return Err(CoreError::validation(
                    "parentId must stay within the same tenant; tenantId is immutable",
                ));
            }
            // A move under the row's own subtree would cycle the hierarchy.
            let mut current = placement.parent.as_ref().and_then(|p| p.parent_resource_id);
            for _ in 0..MAX_PARENT_DEPTH {
                let Some(ancestor_id) = current else { break };
                if ancestor_id == id {
                    return Err(CoreError::validation(
                        "parentId is a descendant of the resource",
                    ));
                }
                current = self
                    .find_live(db, ancestor_id)
                    .await?
                    .and_then(|r| r.parent_resource_id);
            }
        }
        let effective_parent = new_parent.map(Some).unwrap_or(row.parent_resource_id);

        let moved_or_renamed = new_parent.is_some() || effective_name != row.name;
        if moved_or_renamed
            && Self::kinds_with_unique_names(kind)
            && self
                .sibling_name_taken(db, kind, effective_parent, &effective_name, Some(id))
                .await?
        {
            return Err(CoreError::conflict(format!(
                "a {} named '{}' already exists under this parent",
                kind, effective_name
            )));
        }

        let mut active: resource::ActiveModel = row.clone().into();
        active.name = Set(effective_name);
        if new_parent.is_some() {
            active.parent_resource_id = Set(effective_parent);
        }
        active.updated_by = Set(caller.to_string());
        active.updated_at = Set(now);
        let updated = active.update(db).await?;

        if let Some(metadata) = metadata {
            let existing = resource_metadata::Entity::find_by_id(id).one(db).await?;
            match existing {
                Some(existing) => {
                    let mut active: resource_metadata::ActiveModel = existing.into();
                    active.metadata = Set(metadata);
                    active.updated_by = Set(caller.to_string());
                    active.updated_at = Set(now);
                    active.update(db).await?;
                }
                None => {
                    resource_metadata::ActiveModel {
                        resource_id: Set(id),
                        metadata: Set(metadata),
                        row_status: Set(ROW_STATUS_LIVE),
                        created_by: Set(caller.to_string()),
                        updated_by: Set(caller.to_string()),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(db)
                    .await?;
                }
            }
        }

        Ok(updated)
    }

    /// Soft-delete the resource row and its metadata sibling together.
    pub async fn soft_delete<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
        caller: &str,
    ) -> Result<(), CoreError> {
        let row = self.require_live(db, id).await?;
        let now = Utc::now().into();

        let mut active: resource::ActiveModel = row.into();
        active.row_status = Set(ROW_STATUS_DELETED);
        active.updated_by = Set(caller.to_string());
        active.updated_at = Set(now);
        active.update(db).await?;

        if let Some(meta) = resource_metadata::Entity::find_by_id(id).one(db).await? {
            let mut active: resource_metadata::ActiveModel = meta.into();
            active.row_status = Set(ROW_STATUS_DELETED);
            active.updated_by = Set(caller.to_string());
            active.updated_at = Set(now);
            active.update(db).await?;
        }

        Ok(())
    }

    // Role specialization -----------------------------------------------------

    pub async fn insert_role_row<C: ConnectionTrait>(
        &self,
        db: &C,
        resource_id: Uuid,
        role_type: role::RoleType,
        version: i32,
        description: Option<String>,
    ) -> Result<role::Model, CoreError> {
        let row = role::ActiveModel {
            resource_id: Set(resource_id),
            role_type: Set(role_type),
            version: Set(version),
            description: Set(description),
        }
        .insert(db)
        .await?;
        Ok(row)
    }

    pub async fn find_role_row<C: ConnectionTrait>(
        &self,
        db: &C,
        resource_id: Uuid,
    ) -> Result<Option<role::Model>, CoreError> {
        Ok(role::Entity::find_by_id(resource_id).one(db).await?)
    }

    /// Apply a role update, bumping the monotonic version.
    pub async fn bump_role<C: ConnectionTrait>(
        &self,
        db: &C,
        resource_id: Uuid,
        description: Option<Option<String>>,
    ) -> Result<role::Model, CoreError> {
        let row = role::Entity::find_by_id(resource_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                CoreError::not_found(format!("role {} has no specialization row", resource_id))
            })?;
        let version = row.version + 1;
        let mut active: role::ActiveModel = row.into();
        active.version = Set(version);
        if let Some(description) = description {
            active.description = Set(description);
        }
        Ok(active.update(db).await?)
    }

    // Permissions ---------------------------------------------------------------

    pub async fn insert_permission<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
        service_id: &str,
        action: &str,
        name: &str,
        caller: &str,
    ) -> Result<permission::Model, CoreError> {
        if service_id.trim().is_empty() || action.trim().is_empty() || name.trim().is_empty() {
            return Err(CoreError::validation(
                "serviceId, action and name must not be empty",
            ));
        }
        let taken = permission::Entity::find()
            .filter(permission::Column::ServiceId.eq(service_id))
            .filter(permission::Column::Action.eq(action))
            .filter(permission::Column::RowStatus.eq(ROW_STATUS_LIVE))
            .count(db)
            .await?
            > 0;
        if taken {
            return Err(CoreError::conflict(format!(
                "permission {}:{} already exists",
                service_id, action
            )));
        }

        let now = Utc::now().into();
        let row = permission::ActiveModel {
            id: Set(id),
            service_id: Set(service_id.to_string()),
            action: Set(action.to_string()),
            name: Set(name.to_string()),
            row_status: Set(ROW_STATUS_LIVE),
            created_by: Set(caller.to_string()),
            updated_by: Set(caller.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        Ok(row)
    }

    /// Live permission by its `(serviceId, action)` key, if present.
    pub async fn find_permission_by_key<C: ConnectionTrait>(
        &self,
        db: &C,
        service_id: &str,
        action: &str,
    ) -> Result<Option<permission::Model>, CoreError> {
        Ok(permission::Entity::find()
            .filter(permission::Column::ServiceId.eq(service_id))
            .filter(permission::Column::Action.eq(action))
            .filter(permission::Column::RowStatus.eq(ROW_STATUS_LIVE))
            .one(db)
            .await?)
    }

    /// Whether any live role still links to the permission.
    pub async fn permission_in_use<C: ConnectionTrait>(
        &self,
        db: &C,
        permission_id: Uuid,
    ) -> Result<bool, CoreError> {
        let count = role_permission::Entity::find()
            .filter(role_permission::Column::PermissionId.eq(permission_id))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    pub async fn require_live_permission<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
    ) -> Result<permission::Model, CoreError> {
        permission::Entity::find_by_id(id)
            .filter(permission::Column::RowStatus.eq(ROW_STATUS_LIVE))
            .one(db)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("permission {} not found", id)))
    }

    pub async fn list_permissions<C: ConnectionTrait>(
        &self,
        db: &C,
    ) -> Result<Vec<permission::Model>, CoreError> {
        Ok(permission::Entity::find()
            .filter(permission::Column::RowStatus.eq(ROW_STATUS_LIVE))
            .all(db)
            .await?)
    }

    pub async fn update_permission<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
        name: Option<String>,
        caller: &str,
    ) -> Result<permission::Model, CoreError> {
        let row = self.require_live_permission(db, id).await?;
        let mut active: permission::ActiveModel = row.into();
        if let Some(name) = name {
            if name.trim().is_empty() {
                return Err(CoreError::validation("name must not be empty"));
            }
            active.name = Set(name);
        }
        active.updated_by = Set(caller.to_string());
        active.updated_at = Set(Utc::now().into());
        Ok(active.update(db).await?)
    }

    pub async fn soft_delete_permission<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
        caller: &str,
    ) -> Result<permission::Model, CoreError> {
        let row = self.require_live_permission(db, id).await?;
        let mut active: permission::ActiveModel = row.into();
        active.row_status = Set(ROW_STATUS_DELETED);
        active.updated_by = Set(caller.to_string());
        active.updated_at = Set(Utc::now().into());
        Ok(active.update(db).await?)
    }

    pub async fn link_role_permission<C: ConnectionTrait>(
        &self,
        db: &C,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), CoreError> {
        role_permission::ActiveModel {
            role_id: Set(role_id),
            permission_id: Set(permission_id),
            created_at: Set(Utc::now().into()),
        }
        .insert(db)
        .await?;
        Ok(())
    }

    pub async fn permissions_for_role<C: ConnectionTrait>(
        &self,
        db: &C,
        role_id: Uuid,
    ) -> Result<Vec<permission::Model>, CoreError> {
        let links = role_permission::Entity::find()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .all(db)
            .await?;
        let ids: Vec<Uuid> = links.into_iter().map(|l| l.permission_id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(permission::Entity::find()
            .filter(permission::Column::Id.is_in(ids))
            .filter(permission::Column::RowStatus.eq(ROW_STATUS_LIVE))
            .all(db)
            .await?)
    }

    // Master catalog -------------------------------------------------------------

    /// Master role templates with their permission sets, for copying into a
    /// freshly provisioned tenant.
    pub async fn master_catalog<C: ConnectionTrait>(
        &self,
        db: &C,
    ) -> Result<Vec<(master_role::Model, Vec<master_permission::Model>)>, CoreError> {
        let roles = master_role::Entity::find().all(db).await?;
        let links = master_role_permission::Entity::find().all(db).await?;
        let permissions = master_permission::Entity::find().all(db).await?;

        let catalog = roles
            .into_iter()
            .map(|role| {
                let permission_ids: Vec<Uuid> = links
                    .iter()
                    .filter(|link| link.role_id == role.id)
                    .map(|link| link.permission_id)
                    .collect();
                let granted = permissions
                    .iter()
                    .filter(|p| permission_ids.contains(&p.id))
                    .cloned()
                    .collect();
                (role, granted)
            })
            .collect();
        Ok(catalog)
    }
}
