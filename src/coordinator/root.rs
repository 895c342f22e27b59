//! The singular Root resource.
//!
//! The Root anchors the hierarchy and carries no authorization semantics,
//! so its mutations are store-only: no policy service involvement.

use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::CoreError;
use crate::metadata::{RootMetadata, parse_lenient};
use crate::projection::{self, ResourceView};
use crate::registry::ResourceKind;
use crate::store::NewResource;

use super::{Coordinator, RequestContext};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateRootInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateRootInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Coordinator {
    pub async fn create_root(
        &self,
        ctx: &RequestContext,
        input: CreateRootInput,
    ) -> Result<ResourceView, CoreError> {
        let metadata = RootMetadata {
            description: input.description,
        };
        let blob =
            serde_json::to_value(&metadata).map_err(|e| CoreError::Internal(e.to_string()))?;

        let txn = self.begin().await?;
        let row = self
            .store()
            .insert_resource(
                &txn,
                NewResource {
                    id: Uuid::new_v4(),
                    kind: ResourceKind::Root,
                    parent_id: None,
                    name: input.name,
                    metadata: blob,
                    caller: ctx.caller_id.clone(),
                },
            )
            .await?;
        txn.commit().await?;

        info!(root_id = %row.id, "root created");
        let metadata = self.store().load_metadata(self.db(), row.id).await?;
        Ok(ResourceView::Root(projection::project_root(
            &row,
            metadata.as_ref(),
        )))
    }

    pub async fn update_root(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        input: UpdateRootInput,
    ) -> Result<ResourceView, CoreError> {
        let id = Self::require_id(id, "id")?;
        self.store()
            .require_live_of_kind(self.db(), id, ResourceKind::Root)
            .await?;
        let stored_blob = self
            .store()
            .load_metadata(self.db(), id)
            .await?
            .unwrap_or_else(|| serde_json::json!({}));

        let mut merged: RootMetadata = parse_lenient(&stored_blob);
        if input.description.is_some() {
            merged.description = input.description;
        }
        let blob =
            serde_json::to_value(&merged).map_err(|e| CoreError::Internal(e.to_string()))?;

        let txn = self.begin().await?;
        let row = self
            .store()
            .update_resource(&txn, id, input.name, None, Some(blob), &ctx.caller_id)
            .await?;
        txn.commit().await?;

        let metadata = self.store().load_metadata(self.db(), id).await?;
        Ok(ResourceView::Root(projection::project_root(
            &row,
            metadata.as_ref(),
        )))
    }

    /// Soft-delete the Root. Refused while any live tenant remains.
    pub async fn delete_root(&self, ctx: &RequestContext, id: Uuid) -> Result<(), CoreError> {
        let id = Self::require_id(id, "id")?;
        self.store()
            .require_live_of_kind(self.db(), id, ResourceKind::Root)
            .await?;
        if self.store().live_children_exist(self.db(), id).await? {
            return Err(CoreError::conflict(
                "root still has live child resources; delete them first",
            ));
        }

        let txn = self.begin().await?;
        self.store().soft_delete(&txn, id, &ctx.caller_id).await?;
        txn.commit().await?;

        info!(root_id = %id, "root deleted");
        Ok(())
    }

    /// The live Root, if one exists.
    pub async fn get_root(&self) -> Result<ResourceView, CoreError> {
        let row = self
            .store()
            .list_of_kind(self.db(), ResourceKind::Root)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::not_found("no root resource exists"))?;
        let metadata = self.store().load_metadata(self.db(), row.id).await?;
        Ok(ResourceView::Root(projection::project_root(
            &row,
            metadata.as_ref(),
        )))
    }
}
