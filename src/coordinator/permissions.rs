//! Permission lifecycle.
//!
//! Permissions are `(serviceId, action)` pairs mirrored into the policy
//! schema as actions on the owning service's resource type. The row id is
//! local; the upstream object is keyed by the pair itself.

use serde::Deserialize;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::CoreError;
use crate::projection::{self, ResourceView};

use super::{Coordinator, RequestContext};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePermissionInput {
    pub service_id: String,
    pub action: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePermissionInput {
    #[serde(default)]
    pub name: Option<String>,
}

impl Coordinator {
    pub async fn create_permission(
        &self,
        ctx: &RequestContext,
        input: CreatePermissionInput,
    ) -> Result<ResourceView, CoreError> {
        let txn = self.begin().await?;

        self.policy()
            .create_resource_action(&input.service_id, &input.action, &input.name)
            .await?;

        let insert_result = self
            .store()
            .insert_permission(
                &txn,
                Uuid::new_v4(),
                &input.service_id,
                &input.action,
                &input.name,
                &ctx.caller_id,
            )
            .await;
        let commit_result = match insert_result {
            Ok(row) => txn.commit().await.map_err(CoreError::from).map(|_| row),
            Err(e) => {
                drop(txn);
                Err(e)
            }
        };

        match commit_result {
            Ok(row) => {
                info!(permission_id = %row.id, service_id = %row.service_id, action = %row.action, "permission created");
                Ok(ResourceView::Permission(projection::project_permission(
                    &row,
                )))
            }
            Err(store_err) => {
                Err(match self
                    .policy()
                    .delete_resource_action(&input.service_id, &input.action)
                    .await
                {
                    Ok(()) => CoreError::Integrity {
                        message: format!(
                            "store commit failed after policy create ({}); upstream action removed",
                            store_err.system_message()
                        ),
                        orphaned_upstream_id: None,
                    },
                    Err(cleanup_err) => {
                        error!(
                            service_id = %input.service_id,
                            action = %input.action,
                            error = %cleanup_err,
                            reconciliation_pending = true,
                            "compensating resource action delete failed"
                        );
                        CoreError::Integrity {
                            message: format!(
                                "store commit failed after policy create ({})",
                                store_err.system_message()
                            ),
                            orphaned_upstream_id: Some(format!(
                                "{}:{}",
                                input.service_id, input.action
                            )),
                        }
                    }
                })
            }
        }
    }

    /// Rename a permission. The `(serviceId, action)` key is immutable, so
    /// no upstream write is needed.
    pub async fn update_permission(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        input: UpdatePermissionInput,
    ) -> Result<ResourceView, CoreError> {
        let id = Self::require_id(id, "id")?;
        let row = self
            .store()
            .update_permission(self.db(), id, input.name, &ctx.caller_id)
            .await?;
        Ok(ResourceView::Permission(projection::project_permission(
            &row,
        )))
    }

    pub async fn delete_permission(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<(), CoreError> {
        let id = Self::require_id(id, "id")?;
        let row = self.store().require_live_permission(self.db(), id).await?;
        if self.store().permission_in_use(self.db(), id).await? {
            return Err(CoreError::conflict(
                "permission is granted to a role; revoke it first",
            ));
        }

        self.policy()
            .delete_resource_action(&row.service_id, &row.action)
            .await?;

        let store_result = self
            .store()
            .soft_delete_permission(self.db(), id, &ctx.caller_id)
            .await;
        if let Err(store_err) = store_result {
            error!(
                permission_id = %id,
                error = %store_err.system_message(),
                reconciliation_pending = true,
                "store soft-delete failed after policy delete"
            );
            return Err(CoreError::Integrity {
                message: "policy action deleted but store soft-delete failed".to_string(),
                orphaned_upstream_id: None,
            });
        }

        info!(permission_id = %id, "permission deleted");
        Ok(())
    }

    pub async fn get_permission(&self, id: Uuid) -> Result<ResourceView, CoreError> {
        let id = Self::require_id(id, "id")?;
        let row = self.store().require_live_permission(self.db(), id).await?;
        Ok(ResourceView::Permission(projection::project_permission(
            &row,
        )))
    }

    pub async fn all_permissions(&self) -> Result<Vec<ResourceView>, CoreError> {
        let rows = self.store().list_permissions(self.db()).await?;
        Ok(rows
            .iter()
            .map(|row| ResourceView::Permission(projection::project_permission(row)))
            .collect())
    }
}
