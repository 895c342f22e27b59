//! Accounts and client organization units.
//!
//! Both kinds are mirrored upstream as resource instances; the policy
//! service assigns the id the store keys on. Creation validates the tenant
//! ancestor before any upstream call and cross-checks a caller-supplied
//! `tenantId` against the ancestor derived from the parent.

use serde::Deserialize;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::CoreError;
use crate::metadata::{AccountMetadata, BillingInfo, CouMetadata, parse_lenient};
use crate::projection::ResourceView;
use crate::registry::ResourceKind;
use crate::store::NewResource;

use super::{Coordinator, RequestContext};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateAccountInput {
    pub name: String,
    pub parent_org_id: Uuid,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub billing_info: Option<BillingInfo>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateAccountInput {
    #[serde(default)]
    pub name: Option<String>,
    /// New parent; re-validated and must stay within the same tenant.
    #[serde(default)]
    pub parent_org_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub billing_info: Option<BillingInfo>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateOrgUnitInput {
    pub name: String,
    pub parent_org_id: Uuid,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateOrgUnitInput {
    #[serde(default)]
    pub name: Option<String>,
    /// New parent; re-validated and must stay within the same tenant.
    #[serde(default)]
    pub parent_org_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Coordinator {
    /// Shared create protocol for the two resource-instance-backed kinds.
    async fn create_instance_backed(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        name: String,
        parent_org_id: Uuid,
        claimed_tenant_id: Option<Uuid>,
        blob: serde_json::Value,
    ) -> Result<ResourceView, CoreError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::validation("name must not be empty"));
        }
        let parent_org_id = Self::require_id(parent_org_id, "parentOrgId")?;

        let txn = self.begin().await?;
        let placement = self
            .store()
            .validate_placement(&txn, kind, Some(parent_org_id))
            .await?;
        let tenant_id = placement.tenant_id.ok_or_else(|| {
            CoreError::validation(format!("{} requires a tenant ancestor", kind))
        })?;
        if let Some(claimed) = claimed_tenant_id {
            if claimed != tenant_id {
                return Err(CoreError::validation(format!(
                    "tenantId {} does not match the tenant ancestor {} of parentOrgId",
                    claimed, tenant_id
                )));
            }
        }

        let upstream = self
            .policy()
            .create_resource_instance(
                kind.as_str(),
                &Uuid::new_v4().to_string(),
                &tenant_id.to_string(),
                blob.clone(),
            )
            .await?;
        let id = upstream.id;

        let insert_result = self
            .store()
            .insert_resource(
                &txn,
                NewResource {
                    id,
                    kind,
                    parent_id: Some(parent_org_id),
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
            return Err(match self.policy().delete_resource_instance(id).await {
                Ok(()) => CoreError::Integrity {
                    message: format!(
                        "store commit failed after policy create ({}); upstream instance removed",
                        store_err.system_message()
                    ),
                    orphaned_upstream_id: None,
                },
                Err(cleanup_err) => {
                    error!(
                        resource_id = %id,
                        error = %cleanup_err,
                        reconciliation_pending = true,
                        "compensating resource instance delete failed"
                    );
                    CoreError::Integrity {
                        message: format!(
                            "store commit failed after policy create ({})",
                            store_err.system_message()
                        ),
                        orphaned_upstream_id: Some(id.to_string()),
                    }
                }
            });
        }

        info!(resource_id = %id, kind = %kind, "resource created");
        let row = self.store().require_live(self.db(), id).await?;
        self.project_full(&row).await
    }

    /// Shared update protocol: policy PATCH first, pre-image compensation on
    /// store failure. The patch is validated up front so bad input never
    /// reaches the policy service.
    async fn update_instance_backed(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        id: Uuid,
        name: Option<String>,
        parent: Option<Uuid>,
        merged_blob: serde_json::Value,
        stored_blob: serde_json::Value,
    ) -> Result<ResourceView, CoreError> {
        if let Some(name) = &name {
            if name.trim().is_empty() {
                return Err(CoreError::validation("name must not be empty"));
            }
        }
        let parent = match parent {
            Some(parent) => Some(Self::require_id(parent, "parentOrgId")?),
            None => None,
        };
        if let Some(parent) = parent {
            let row = self
                .store()
                .require_live_of_kind(self.db(), id, kind)
                .await?;
            let placement = self
                .store()
                .validate_placement(self.db(), kind, Some(parent))
                .await?;
            if placement.tenant_id != row.tenant_id {
                return Err(CoreError::validation(
                    "parentId must stay within the same tenant; tenantId is immutable",
                ));
            }
        }

        self.policy()
            .update_resource_instance(id, merged_blob.clone())
            .await?;

        let store_result: Result<(), CoreError> = async {
            let txn = self.begin().await?;
            self.store()
                .update_resource(&txn, id, name, parent, Some(merged_blob), &ctx.caller_id)
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
                    self.policy().update_resource_instance(id, stored_blob),
                )
                .await);
        }

        let row = self
            .store()
            .require_live_of_kind(self.db(), id, kind)
            .await?;
        self.project_full(&row).await
    }

    /// Shared delete protocol. Refuses while live children remain.
    async fn delete_instance_backed(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<(), CoreError> {
        let id = Self::require_id(id, "id")?;
        self.store()
            .require_live_of_kind(self.db(), id, kind)
            .await?;
        if self.store().live_children_exist(self.db(), id).await? {
            return Err(CoreError::conflict(format!(
                "{} still has live child resources; delete them first",
                kind
            )));
        }

        self.policy().delete_resource_instance(id).await?;

        let store_result: Result<(), CoreError> = async {
            let txn = self.begin().await?;
            self.store().soft_delete(&txn, id, &ctx.caller_id).await?;
            txn.commit().await?;
            Ok(())
        }
        .await;

        if let Err(store_err) = store_result {
            error!(
                resource_id = %id,
                error = %store_err.system_message(),
                reconciliation_pending = true,
                "store soft-delete failed after policy delete"
            );
            return Err(CoreError::Integrity {
                message: format!("policy {} deleted but store soft-delete failed", kind),
                orphaned_upstream_id: None,
            });
        }

        info!(resource_id = %id, kind = %kind, "resource deleted");
        Ok(())
    }

    async fn list_scoped(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
    ) -> Result<Vec<ResourceView>, CoreError> {
        let rows = self.store().list_of_kind(self.db(), kind).await?;
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

    // Accounts ------------------------------------------------------------

    pub async fn create_account(
        &self,
        ctx: &RequestContext,
        input: CreateAccountInput,
    ) -> Result<ResourceView, CoreError> {
        let metadata = AccountMetadata {
            description: input.description,
            billing_info: input.billing_info,
        };
        let blob =
            serde_json::to_value(&metadata).map_err(|e| CoreError::Internal(e.to_string()))?;
        self.create_instance_backed(
            ctx,
            ResourceKind::Account,
            input.name,
            input.parent_org_id,
            input.tenant_id,
            blob,
        )
        .await
    }

    pub async fn update_account(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        input: UpdateAccountInput,
    ) -> Result<ResourceView, CoreError> {
        let id = Self::require_id(id, "id")?;
        self.store()
            .require_live_of_kind(self.db(), id, ResourceKind::Account)
            .await?;
        let stored_blob = self
            .store()
            .load_metadata(self.db(), id)
            .await?
            .unwrap_or_else(|| serde_json::json!({}));

        let mut merged: AccountMetadata = parse_lenient(&stored_blob);
        merged.merge(AccountMetadata {
            description: input.description,
            billing_info: input.billing_info,
        });
        let merged_blob =
            serde_json::to_value(&merged).map_err(|e| CoreError::Internal(e.to_string()))?;

        self.update_instance_backed(
            ctx,
            ResourceKind::Account,
            id,
            input.name,
            input.parent_org_id,
            merged_blob,
            stored_blob,
        )
        .await
    }

    pub async fn delete_account(&self, ctx: &RequestContext, id: Uuid) -> Result<(), CoreError> {
        self.delete_instance_backed(ctx, ResourceKind::Account, id)
            .await
    }

    pub async fn get_account(&self, id: Uuid) -> Result<ResourceView, CoreError> {
        let id = Self::require_id(id, "id")?;
        let row = self
            .store()
            .require_live_of_kind(self.db(), id, ResourceKind::Account)
            .await?;
        self.project_full(&row).await
    }

    pub async fn all_accounts(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<ResourceView>, CoreError> {
        self.list_scoped(ctx, ResourceKind::Account).await
    }

    // Client organization units --------------------------------------------

    pub async fn create_org_unit(
        &self,
        ctx: &RequestContext,
        input: CreateOrgUnitInput,
    ) -> Result<ResourceView, CoreError> {
        let metadata = CouMetadata {
            description: input.description,
        };
        let blob =
            serde_json::to_value(&metadata).map_err(|e| CoreError::Internal(e.to_string()))?;
        self.create_instance_backed(
            ctx,
            ResourceKind::ClientOrganizationUnit,
            input.name,
            input.parent_org_id,
            input.tenant_id,
            blob,
        )
        .await
    }

    pub async fn update_org_unit(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        input: UpdateOrgUnitInput,
    ) -> Result<ResourceView, CoreError> {
        let id = Self::require_id(id, "id")?;
        self.store()
            .require_live_of_kind(self.db(), id, ResourceKind::ClientOrganizationUnit)
            .await?;
        let stored_blob = self
            .store()
            .load_metadata(self.db(), id)
            .await?
            .unwrap_or_else(|| serde_json::json!({}));

        let mut merged: CouMetadata = parse_lenient(&stored_blob);
        merged.merge(CouMetadata {
            description: input.description,
        });
        let merged_blob =
            serde_json::to_value(&merged).map_err(|e| CoreError::Internal(e.to_string()))?;

        self.update_instance_backed(
            ctx,
            ResourceKind::ClientOrganizationUnit,
            id,
            input.name,
            input.parent_org_id,
            merged_blob,
            stored_blob,
        )
        .await
    }

    pub async fn delete_org_unit(&self, ctx: &RequestContext, id: Uuid) -> Result<(), CoreError> {
        self.delete_instance_backed(ctx, ResourceKind::ClientOrganizationUnit, id)
            .await
    }

    pub async fn get_org_unit(&self, id: Uuid) -> Result<ResourceView, CoreError> {
        let id = Self::require_id(id, "id")?;
        let row = self
            .store()
            .require_live_of_kind(self.db(), id, ResourceKind::ClientOrganizationUnit)
            .await?;
        self.project_full(&row).await
    }

    pub async fn all_org_units(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<ResourceView>, CoreError> {
        self.list_scoped(ctx, ResourceKind::ClientOrganizationUnit)
            .await
    }
}
