//! Tenant lifecycle: provisioning with master catalog copies, field-wise
//! metadata updates and cascading soft-delete.

use std::future::Future;

use sea_orm::ConnectionTrait;
use serde::Deserialize;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::CoreError;
use crate::metadata::{ContactInfo, TenantMetadata, parse_lenient};
use crate::models::role::RoleType;
use crate::projection::{self, ResourceView};
use crate::registry::ResourceKind;
use crate::store::NewResource;

use super::{Coordinator, RequestContext};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateTenantInput {
    pub name: String,
    pub parent_org_id: Uuid,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contact_info: Option<ContactInfo>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateTenantInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contact_info: Option<ContactInfo>,
}

impl Coordinator {
    /// Provision a tenant: policy tenant + resource instance upstream, then
    /// the resource row, its metadata and one DEFAULT role per master
    /// catalog entry, all in one transaction keyed by the policy-assigned id.
    pub async fn create_tenant(
        &self,
        ctx: &RequestContext,
        input: CreateTenantInput,
    ) -> Result<ResourceView, CoreError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::validation("name must not be empty"));
        }
        let parent_org_id = Self::require_id(input.parent_org_id, "parentOrgId")?;

        let metadata = TenantMetadata {
            description: input.description,
            contact_info: input.contact_info,
        };
        let blob = serde_json::to_value(&metadata)
            .map_err(|e| CoreError::Internal(e.to_string()))?;

        let txn = self.begin().await?;

        // Placement is checked before any upstream call so bad input never
        // touches the policy service.
        self.store()
            .validate_placement(&txn, ResourceKind::Tenant, Some(parent_org_id))
            .await?;

        let upstream = self
            .policy()
            .create_tenant(&Uuid::new_v4().to_string(), &name, blob.clone())
            .await?;
        let tenant_id = upstream.id;

        // Register the tenant as a scopeable resource. Failure here must not
        // leave the policy tenant behind.
        if let Err(instance_err) = self
            .policy()
            .create_resource_instance(
                ResourceKind::Tenant.as_str(),
                &tenant_id.to_string(),
                &upstream.key,
                serde_json::json!({}),
            )
            .await
        {
            drop(txn);
            if let Err(cleanup_err) = self.policy().delete_tenant(tenant_id).await {
                error!(
                    tenant_id = %tenant_id,
                    error = %cleanup_err,
                    reconciliation_pending = true,
                    "failed to clean up policy tenant after resource instance failure"
                );
                return Err(CoreError::Integrity {
                    message: "tenant provisioning failed upstream".to_string(),
                    orphaned_upstream_id: Some(tenant_id.to_string()),
                });
            }
            return Err(instance_err.into());
        }

        let result = self
            .provision_tenant_rows(&txn, tenant_id, parent_org_id, &name, blob, &ctx.caller_id)
            .await;
        let commit_result = match result {
            Ok(()) => txn.commit().await.map_err(CoreError::from),
            Err(e) => {
                drop(txn);
                Err(e)
            }
        };

        if let Err(store_err) = commit_result {
            return Err(self.compensate_tenant_create(tenant_id, store_err).await);
        }

        info!(tenant_id = %tenant_id, name = %name, "tenant provisioned");

        let row = self.store().require_live(&self.db, tenant_id).await?;
        let metadata = self.store().load_metadata(&self.db, tenant_id).await?;
        let parent = self.parent_org(&self.db, row.parent_resource_id).await?;
        Ok(ResourceView::Tenant(projection::project_tenant(
            &row,
            metadata.as_ref(),
            parent,
        )))
    }

    async fn provision_tenant_rows<C: ConnectionTrait>(
        &self,
        txn: &C,
        tenant_id: Uuid,
        parent_org_id: Uuid,
        name: &str,
        blob: serde_json::Value,
        caller: &str,
    ) -> Result<(), CoreError> {
        self.store()
            .insert_resource(
                txn,
                NewResource {
                    id: tenant_id,
                    kind: ResourceKind::Tenant,
                    parent_id: Some(parent_org_id),
                    name: name.to_string(),
                    metadata: blob,
                    caller: caller.to_string(),
                },
            )
            .await?;

        // Copy every master role into a tenant-local DEFAULT role with its
        // permission set.
        for (master_role, master_permissions) in self.store().master_catalog(txn).await? {
            let role_id = Uuid::new_v4();
            self.store()
                .insert_resource(
                    txn,
                    NewResource {
                        id: role_id,
                        kind: ResourceKind::Role,
                        parent_id: Some(tenant_id),
                        name: master_role.name.clone(),
                        metadata: serde_json::json!({}),
                        caller: caller.to_string(),
                    },
                )
                .await?;
            self.store()
                .insert_role_row(
                    txn,
                    role_id,
                    RoleType::Default,
                    master_role.version,
                    master_role.description.clone(),
                )
                .await?;

            for master_permission in master_permissions {
                let permission = match self
                    .store()
                    .find_permission_by_key(
                        txn,
                        &master_permission.service_id,
                        &master_permission.action,
                    )
                    .await?
                {
                    Some(existing) => existing,
                    None => {
                        self.store()
                            .insert_permission(
                                txn,
                                Uuid::new_v4(),
                                &master_permission.service_id,
                                &master_permission.action,
                                &master_permission.name,
                                caller,
                            )
                            .await?
                    }
                };
                self.store()
                    .link_role_permission(txn, role_id, permission.id)
                    .await?;
            }
        }

        Ok(())
    }

    /// Best-effort upstream cleanup after a failed commit: the resource
    /// instance first, then the tenant itself.
    async fn compensate_tenant_create(&self, tenant_id: Uuid, store_err: CoreError) -> CoreError {
        let cleanup = async {
            self.policy().delete_resource_instance(tenant_id).await?;
            self.policy().delete_tenant(tenant_id).await
        }
        .await;
        match cleanup {
            Ok(()) => CoreError::Integrity {
                message: format!(
                    "store commit failed after policy create ({}); upstream tenant removed",
                    store_err.system_message()
                ),
                orphaned_upstream_id: None,
            },
            Err(cleanup_err) => {
                error!(
                    tenant_id = %tenant_id,
                    error = %cleanup_err,
                    reconciliation_pending = true,
                    "compensating tenant delete failed"
                );
                CoreError::Integrity {
                    message: format!(
                        "store commit failed after policy create ({})",
                        store_err.system_message()
                    ),
                    orphaned_upstream_id: Some(tenant_id.to_string()),
                }
            }
        }
    }

    /// Field-wise tenant update, mirrored upstream first.
    pub async fn update_tenant(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        input: UpdateTenantInput,
    ) -> Result<ResourceView, CoreError> {
        let id = Self::require_id(id, "id")?;
        let row = self
            .store()
            .require_live_of_kind(&self.db, id, ResourceKind::Tenant)
            .await?;
        let stored_blob = self
            .store()
            .load_metadata(&self.db, id)
            .await?
            .unwrap_or_else(|| serde_json::json!({}));

        let mut merged: TenantMetadata = parse_lenient(&stored_blob);
        merged.merge(TenantMetadata {
            description: input.description,
            contact_info: input.contact_info,
        });
        let merged_blob = serde_json::to_value(&merged)
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        // Validate the patch before the upstream call, as on create.
        let name = match input.name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(CoreError::validation("name must not be empty"));
                }
                name
            }
            None => row.name.clone(),
        };

        self.policy()
            .update_tenant(id, &name, merged_blob.clone())
            .await?;

        let store_result: Result<(), CoreError> = async {
            let txn = self.begin().await?;
            self.store()
                .update_resource(
                    &txn,
                    id,
                    Some(name.clone()),
                    None,
                    Some(merged_blob),
                    &ctx.caller_id,
                )
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
                    self.policy().update_tenant(id, &row.name, stored_blob),
                )
                .await);
        }

        let updated = self.store().require_live(&self.db, id).await?;
        let metadata = self.store().load_metadata(&self.db, id).await?;
        let parent = self.parent_org(&self.db, updated.parent_resource_id).await?;
        Ok(ResourceView::Tenant(projection::project_tenant(
            &updated,
            metadata.as_ref(),
            parent,
        )))
    }

    /// Run the compensating policy write for a failed store update.
    ///
    /// If the pre-image is restored upstream the stores are consistent again
    /// and the original store error is returned as-is. If compensation also
    /// fails the stores have diverged and the error escalates.
    pub(crate) async fn compensate_update<T>(
        &self,
        id: Uuid,
        store_err: CoreError,
        compensation: impl Future<Output = Result<T, crate::policy::PolicyError>>,
    ) -> CoreError {
        match compensation.await {
            Ok(_) => store_err,
            Err(cleanup_err) => {
                error!(
                    resource_id = %id,
                    error = %cleanup_err,
                    reconciliation_pending = true,
                    "compensating policy update failed; stores diverged"
                );
                CoreError::Integrity {
                    message: format!(
                        "store update failed after policy update ({}); upstream pre-image not restored",
                        store_err.system_message()
                    ),
                    orphaned_upstream_id: Some(id.to_string()),
                }
            }
        }
    }

    /// Soft-delete a tenant and its role children after the upstream delete.
    pub async fn delete_tenant(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<(), CoreError> {
        let id = Self::require_id(id, "id")?;
        self.store()
            .require_live_of_kind(&self.db, id, ResourceKind::Tenant)
            .await?;

        let children = self.store().children_of(&self.db, id).await?;
        let role_type_id = self.store().registry().type_id(ResourceKind::Role);
        let (roles, others): (Vec<_>, Vec<_>) = children
            .into_iter()
            .partition(|child| child.resource_type_id == role_type_id);
        if !others.is_empty() {
            return Err(CoreError::conflict(
                "tenant still has live child resources; delete them first",
            ));
        }

        self.policy().delete_tenant(id).await?;

        let store_result: Result<(), CoreError> = async {
            let txn = self.begin().await?;
            self.store().soft_delete(&txn, id, &ctx.caller_id).await?;
            for role in &roles {
                self.store()
                    .soft_delete(&txn, role.id, &ctx.caller_id)
                    .await?;
            }
            txn.commit().await?;
            Ok(())
        }
        .await;

        if let Err(store_err) = store_result {
            error!(
                tenant_id = %id,
                error = %store_err.system_message(),
                reconciliation_pending = true,
                "store soft-delete failed after policy delete"
            );
            return Err(CoreError::Integrity {
                message: "policy tenant deleted but store soft-delete failed".to_string(),
                orphaned_upstream_id: None,
            });
        }

        info!(tenant_id = %id, cascaded_roles = roles.len(), "tenant deleted");
        Ok(())
    }

    pub async fn get_tenant(&self, id: Uuid) -> Result<ResourceView, CoreError> {
        let id = Self::require_id(id, "id")?;
        let row = self
            .store()
            .require_live_of_kind(&self.db, id, ResourceKind::Tenant)
            .await?;
        let metadata = self.store().load_metadata(&self.db, id).await?;
        let parent = self.parent_org(&self.db, row.parent_resource_id).await?;
        Ok(ResourceView::Tenant(projection::project_tenant(
            &row,
            metadata.as_ref(),
            parent,
        )))
    }

    /// List tenants as the policy service knows them, merged across pages,
    /// projected from the local rows. Upstream entries with no live local
    /// row are skipped.
    pub async fn list_tenants(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<ResourceView>, CoreError> {
        let upstream = self.policy().list_tenants().await?;

        let mut views = Vec::new();
        for tenant in upstream {
            if let Some(scope) = ctx.tenant_id {
                if tenant.id != scope {
                    continue;
                }
            }
            let Some(row) = self.store().find_live(&self.db, tenant.id).await? else {
                continue;
            };
            let metadata = self.store().load_metadata(&self.db, row.id).await?;
            let parent = self.parent_org(&self.db, row.parent_resource_id).await?;
            views.push(ResourceView::Tenant(projection::project_tenant(
                &row,
                metadata.as_ref(),
                parent,
            )));
        }
        Ok(views)
    }
}
