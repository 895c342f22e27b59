//! Binding lifecycle.
//!
//! A binding grants a role to a principal at a scope. The grant itself is
//! evaluated upstream; the local row records the intent, keyed by the
//! policy-assigned role assignment id, with the triple stored in the
//! metadata blob. The principal, role and scope of an existing binding are
//! immutable: changing a grant means deleting and recreating it.

use serde::Deserialize;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::CoreError;
use crate::metadata::{BindingMetadata, PrincipalType};
use crate::projection::ResourceView;
use crate::registry::ResourceKind;
use crate::store::NewResource;

use super::{Coordinator, RequestContext};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateBindingInput {
    pub principal_id: Uuid,
    pub principal_type: PrincipalType,
    pub role_id: Uuid,
    pub scope_ref_id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateBindingInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub principal_id: Option<Uuid>,
    #[serde(default)]
    pub principal_type: Option<PrincipalType>,
    #[serde(default)]
    pub role_id: Option<Uuid>,
    #[serde(default)]
    pub scope_ref_id: Option<Uuid>,
}

impl Coordinator {
    pub async fn create_binding(
        &self,
        ctx: &RequestContext,
        input: CreateBindingInput,
    ) -> Result<ResourceView, CoreError> {
        let principal_id = Self::require_id(input.principal_id, "principalId")?;
        let role_id = Self::require_id(input.role_id, "roleId")?;
        let scope_ref_id = Self::require_id(input.scope_ref_id, "scopeRefId")?;

        let role_row = self
            .store()
            .require_live_of_kind(self.db(), role_id, ResourceKind::Role)
            .await?;
        let assignable_scope = role_row.parent_resource_id.ok_or_else(|| {
            CoreError::Internal(format!("role {} has no assignable scope", role_id))
        })?;
        self.store().require_live(self.db(), scope_ref_id).await?;

        // The grant scope must sit at or below the role's assignable scope.
        if !self
            .is_ancestor_or_equal(self.db(), assignable_scope, scope_ref_id)
            .await?
        {
            return Err(CoreError::validation(
                "scopeRefId is outside the role's assignable scope",
            ));
        }

        let txn = self.begin().await?;
        let placement = self
            .store()
            .validate_placement(&txn, ResourceKind::Binding, Some(scope_ref_id))
            .await?;
        let tenant_id = placement.tenant_id.ok_or_else(|| {
            CoreError::validation("bindings require a tenant-scoped resource")
        })?;

        // A tenant-level grant carries no resource instance; anything deeper
        // names the scope instance explicitly.
        let scope_instance = if scope_ref_id == tenant_id {
            None
        } else {
            Some(scope_ref_id.to_string())
        };
        let upstream = self
            .policy()
            .create_role_assignment(
                principal_id,
                input.principal_type,
                &role_id.to_string(),
                &tenant_id.to_string(),
                scope_instance.as_deref(),
            )
            .await?;
        let binding_id = upstream.id;

        let metadata = BindingMetadata {
            principal_id,
            principal_type: input.principal_type,
            role_id,
            scope_ref_id,
            version: 1,
        };
        let blob =
            serde_json::to_value(&metadata).map_err(|e| CoreError::Internal(e.to_string()))?;
        let name = input
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("{}:{}", principal_id, role_id));

        let insert_result = self
            .store()
            .insert_resource(
                &txn,
                NewResource {
                    id: binding_id,
                    kind: ResourceKind::Binding,
                    parent_id: Some(scope_ref_id),
                    name,
                    metadata: blob,
                    caller: ctx.caller_id.clone(),
                },
            )
            .await;
        let commit_result = match insert_result {
            Ok(_) => txn.commit().await.map_err(CoreError::from),
            Err(e) => {
                drop(txn);
                Err(e)
            }
        };

        if let Err(store_err) = commit_result {
            return Err(match self.policy().delete_role_assignment(binding_id).await {
                Ok(()) => CoreError::Integrity {
                    message: format!(
                        "store commit failed after policy create ({}); upstream assignment removed",
                        store_err.system_message()
                    ),
                    orphaned_upstream_id: None,
                },
                Err(cleanup_err) => {
                    error!(
                        binding_id = %binding_id,
                        error = %cleanup_err,
                        reconciliation_pending = true,
                        "compensating role assignment delete failed"
                    );
                    CoreError::Integrity {
                        message: format!(
                            "store commit failed after policy create ({})",
                            store_err.system_message()
                        ),
                        orphaned_upstream_id: Some(binding_id.to_string()),
                    }
                }
            });
        }

        info!(binding_id = %binding_id, role_id = %role_id, "binding created");
        let row = self.store().require_live(self.db(), binding_id).await?;
        self.project_full(&row).await
    }

    /// Rename a binding. The grant triple is immutable.
    pub async fn update_binding(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        input: UpdateBindingInput,
    ) -> Result<ResourceView, CoreError> {
        let id = Self::require_id(id, "id")?;
        if input.principal_id.is_some()
            || input.principal_type.is_some()
            || input.role_id.is_some()
            || input.scope_ref_id.is_some()
        {
            return Err(CoreError::validation(
                "a binding's principal, role and scope cannot change; delete and recreate it",
            ));
        }

        self.store()
            .require_live_of_kind(self.db(), id, ResourceKind::Binding)
            .await?;
        let stored_blob = self
            .store()
            .load_metadata(self.db(), id)
            .await?
            .ok_or_else(|| CoreError::Internal(format!("binding {} has no metadata", id)))?;
        let mut metadata: BindingMetadata = serde_json::from_value(stored_blob)
            .map_err(|e| CoreError::Internal(format!("binding {} metadata: {}", id, e)))?;
        metadata.version += 1;
        let blob =
            serde_json::to_value(&metadata).map_err(|e| CoreError::Internal(e.to_string()))?;

        let txn = self.begin().await?;
        self.store()
            .update_resource(&txn, id, input.name, None, Some(blob), &ctx.caller_id)
            .await?;
        txn.commit().await?;

        let row = self.store().require_live(self.db(), id).await?;
        self.project_full(&row).await
    }

    pub async fn delete_binding(&self, ctx: &RequestContext, id: Uuid) -> Result<(), CoreError> {
        let id = Self::require_id(id, "id")?;
        self.store()
            .require_live_of_kind(self.db(), id, ResourceKind::Binding)
            .await?;

        self.policy().delete_role_assignment(id).await?;

        let store_result: Result<(), CoreError> = async {
            let txn = self.begin().await?;
            self.store().soft_delete(&txn, id, &ctx.caller_id).await?;
            txn.commit().await?;
            Ok(())
        }
        .await;

        if let Err(store_err) = store_result {
            error!(
                binding_id = %id,
                error = %store_err.system_message(),
                reconciliation_pending = true,
                "store soft-delete failed after policy delete"
            );
            return Err(CoreError::Integrity {
                message: "policy assignment deleted but store soft-delete failed".to_string(),
                orphaned_upstream_id: None,
            });
        }

        info!(binding_id = %id, "binding deleted");
        Ok(())
    }

    pub async fn get_binding(&self, id: Uuid) -> Result<ResourceView, CoreError> {
        let id = Self::require_id(id, "id")?;
        let row = self
            .store()
            .require_live_of_kind(self.db(), id, ResourceKind::Binding)
            .await?;
        self.project_full(&row).await
    }

    pub async fn bindings(&self, ctx: &RequestContext) -> Result<Vec<ResourceView>, CoreError> {
        let rows = self
            .store()
            .list_of_kind(self.db(), ResourceKind::Binding)
            .await?;
        let mut views = Vec::new();
        for row in rows {
            if let Some(scope) = ctx.tenant_id {
                if row.tenant_id != Some(scope) {
                    continue;
                }
            }
            views.push(self.project_full(&row).await?);
        }
        Ok(views)
    }
}
