//! Role lifecycle.
//!
//! CUSTOM roles are caller-created, mirrored into the policy schema, and
//! keyed by the policy-assigned id. DEFAULT roles are tenant-local copies of
//! the master catalog made at provisioning time; they are not mirrored and
//! cannot be modified or deleted on their own.

use serde::Deserialize;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::CoreError;
use crate::metadata::BindingMetadata;
use crate::models::role::RoleType;
use crate::projection::ResourceView;
use crate::registry::ResourceKind;
use crate::store::NewResource;

use super::{Coordinator, MAX_ANCESTOR_DEPTH, RequestContext};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateRoleInput {
    pub name: String,
    /// Resource under which the role can be granted.
    pub assignable_scope_ref: Uuid,
    #[serde(default)]
    pub description: Option<String>,
    /// Permissions granted by the role.
    #[serde(default)]
    pub permission_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateRoleInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Coordinator {
    async fn require_custom_role(
        &self,
        id: Uuid,
    ) -> Result<(crate::models::resource::Model, crate::models::role::Model), CoreError> {
        let row = self
            .store()
            .require_live_of_kind(self.db(), id, ResourceKind::Role)
            .await?;
        let specialization = self
            .store()
            .find_role_row(self.db(), id)
            .await?
            .ok_or_else(|| {
                CoreError::Internal(format!("role {} has no specialization row", id))
            })?;
        if specialization.role_type == RoleType::Default {
            return Err(CoreError::validation(
                "DEFAULT roles are managed by tenant provisioning and cannot be changed",
            ));
        }
        Ok((row, specialization))
    }

    pub async fn create_role(
        &self,
        ctx: &RequestContext,
        input: CreateRoleInput,
    ) -> Result<ResourceView, CoreError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::validation("name must not be empty"));
        }
        let scope = Self::require_id(input.assignable_scope_ref, "assignableScopeRef")?;

        let txn = self.begin().await?;
        self.store()
            .validate_placement(&txn, ResourceKind::Role, Some(scope))
            .await?;

        // Resolve the granted permissions up front so a bad id fails before
        // the upstream write.
        let mut permissions = Vec::with_capacity(input.permission_ids.len());
        for permission_id in &input.permission_ids {
            permissions.push(
                self.store()
                    .require_live_permission(&txn, *permission_id)
                    .await?,
            );
        }
        let permission_keys: Vec<String> = permissions
            .iter()
            .map(|p| format!("{}:{}", p.service_id, p.action))
            .collect();

        let upstream = self
            .policy()
            .create_role(
                &Uuid::new_v4().to_string(),
                &name,
                input.description.as_deref(),
                &permission_keys,
            )
            .await?;
        let role_id = upstream.id;

        let insert_result: Result<(), CoreError> = async {
            self.store()
                .insert_resource(
                    &txn,
                    NewResource {
                        id: role_id,
                        kind: ResourceKind::Role,
                        parent_id: Some(scope),
                        name,
                        metadata: serde_json::json!({}),
                        caller: ctx.caller_id.clone(),
                    },
                )
                .await?;
            self.store()
                .insert_role_row(&txn, role_id, RoleType::Custom, 1, input.description)
                .await?;
            for permission in &permissions {
                self.store()
                    .link_role_permission(&txn, role_id, permission.id)
                    .await?;
            }
            Ok(())
        }
        .await;

        let commit_result = match insert_result {
            Ok(()) => txn.commit().await.map_err(CoreError::from),
            Err(e) => {
                drop(txn);
                Err(e)
            }
        };

        if let Err(store_err) = commit_result {
            return Err(match self.policy().delete_role(role_id).await {
                Ok(()) => CoreError::Integrity {
                    message: format!(
                        "store commit failed after policy create ({}); upstream role removed",
                        store_err.system_message()
                    ),
                    orphaned_upstream_id: None,
                },
                Err(cleanup_err) => {
                    error!(
                        role_id = %role_id,
                        error = %cleanup_err,
                        reconciliation_pending = true,
                        "compensating role delete failed"
                    );
                    CoreError::Integrity {
                        message: format!(
                            "store commit failed after policy create ({})",
                            store_err.system_message()
                        ),
                        orphaned_upstream_id: Some(role_id.to_string()),
                    }
                }
            });
        }

        info!(role_id = %role_id, "role created");
        let row = self.store().require_live(self.db(), role_id).await?;
        self.project_full(&row).await
    }

    pub async fn update_role(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        input: UpdateRoleInput,
    ) -> Result<ResourceView, CoreError> {
        let id = Self::require_id(id, "id")?;
        let (row, specialization) = self.require_custom_role(id).await?;

        // Validate the patch before the upstream call, as on create.
        let name = match &input.name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(CoreError::validation("name must not be empty"));
                }
                name
            }
            None => row.name.clone(),
        };
        let description = input
            .description
            .clone()
            .or_else(|| specialization.description.clone());
        let permission_keys: Vec<String> = self
            .store()
            .permissions_for_role(self.db(), id)
            .await?
            .iter()
            .map(|p| format!("{}:{}", p.service_id, p.action))
            .collect();

        self.policy()
            .update_role(id, &name, description.as_deref(), &permission_keys)
            .await?;

        let store_result: Result<(), CoreError> = async {
            let txn = self.begin().await?;
            self.store()
                .update_resource(&txn, id, input.name, None, None, &ctx.caller_id)
                .await?;
            self.store()
                .bump_role(&txn, id, input.description.map(Some))
                .await?;
            txn.commit().await?;
            Ok(())
        }
        .await;

        if let Err(store_err) = store_result {
            return Err(self
                .compensate_update(
                    id,
                    store_err,
                    self.policy().update_role(
                        id,
                        &row.name,
                        specialization.description.as_deref(),
                        &permission_keys,
                    ),
                )
                .await);
        }

        let updated = self.store().require_live(self.db(), id).await?;
        self.project_full(&updated).await
    }

    pub async fn delete_role(&self, ctx: &RequestContext, id: Uuid) -> Result<(), CoreError> {
        let id = Self::require_id(id, "id")?;
        self.require_custom_role(id).await?;

        // A role still referenced by a live binding cannot be removed.
        for binding in self
            .store()
            .list_of_kind(self.db(), ResourceKind::Binding)
            .await?
        {
            let Some(blob) = self.store().load_metadata(self.db(), binding.id).await? else {
                continue;
            };
            if let Ok(meta) = serde_json::from_value::<BindingMetadata>(blob) {
                if meta.role_id == id {
                    return Err(CoreError::conflict(
                        "role is referenced by a live binding; delete the binding first",
                    ));
                }
            }
        }

        self.policy().delete_role(id).await?;

        let store_result: Result<(), CoreError> = async {
            let txn = self.begin().await?;
            self.store().soft_delete(&txn, id, &ctx.caller_id).await?;
            txn.commit().await?;
            Ok(())
        }
        .await;

        if let Err(store_err) = store_result {
            error!(
                role_id = %id,
                error = %store_err.system_message(),
                reconciliation_pending = true,
                "store soft-delete failed after policy delete"
            );
            return Err(CoreError::Integrity {
                message: "policy role deleted but store soft-delete failed".to_string(),
                orphaned_upstream_id: None,
            });
        }

        info!(role_id = %id, "role deleted");
        Ok(())
    }

    pub async fn get_role(&self, id: Uuid) -> Result<ResourceView, CoreError> {
        let id = Self::require_id(id, "id")?;
        let row = self
            .store()
            .require_live_of_kind(self.db(), id, ResourceKind::Role)
            .await?;
        self.project_full(&row).await
    }

    /// All live roles, optionally restricted to one assignable scope.
    pub async fn all_roles(
        &self,
        ctx: &RequestContext,
        scope: Option<Uuid>,
    ) -> Result<Vec<ResourceView>, CoreError> {
        let rows = self
            .store()
            .list_of_kind(self.db(), ResourceKind::Role)
            .await?;
        let mut views = Vec::new();
        for row in rows {
            if let Some(scope) = scope {
                if row.parent_resource_id != Some(scope) {
                    continue;
                }
            }
            if let Some(tenant_scope) = ctx.tenant_id {
                if row.tenant_id != Some(tenant_scope) {
                    continue;
                }
            }
            views.push(self.project_full(&row).await?);
        }
        Ok(views)
    }

    /// Roles grantable at `scope_id`: those whose assignable scope is the
    /// scope itself or one of its live ancestors.
    pub async fn roles_for_assignable_scope(
        &self,
        scope_id: Uuid,
        exclude_ids: &[Uuid],
    ) -> Result<Vec<ResourceView>, CoreError> {
        let scope_id = Self::require_id(scope_id, "scopeId")?;
        self.store().require_live(self.db(), scope_id).await?;

        let mut chain = Vec::new();
        let mut current = Some(scope_id);
        for _ in 0..MAX_ANCESTOR_DEPTH {
            let Some(id) = current else { break };
            chain.push(id);
            current = self
                .store()
                .find_live(self.db(), id)
                .await?
                .and_then(|row| row.parent_resource_id);
        }

        let rows = self
            .store()
            .list_of_kind(self.db(), ResourceKind::Role)
            .await?;
        let mut views = Vec::new();
        for row in rows {
            if exclude_ids.contains(&row.id) {
                continue;
            }
            let assignable = row
                .parent_resource_id
                .map(|parent| chain.contains(&parent))
                .unwrap_or(false);
            if assignable {
                views.push(self.project_full(&row).await?);
            }
        }
        Ok(views)
    }
}
