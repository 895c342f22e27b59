//! Reconciliation coordinator.
//!
//! Orchestrates every mutation as a two-store write so the policy service
//! and the resource store end up consistent, or neither changes visibly.
//!
//! Create protocol: open the store transaction, validate placement, call the
//! policy service, insert with the policy-assigned id, commit. A policy
//! failure rolls the transaction back with no state change anywhere. A
//! commit failure triggers a best-effort compensating DELETE upstream; if
//! that also fails the operation reports an integrity error naming the
//! orphaned upstream object.
//!
//! Update protocol: policy first, store second. A store failure after a
//! successful policy write triggers a compensating PATCH with the pre-image;
//! if compensation fails the resource is flagged for out-of-band
//! reconciliation in the audit log.
//!
//! Delete protocol: policy DELETE first (404 counts as success), then the
//! store soft-delete in one transaction, cascading to the metadata sibling.
//!
//! Cancellation: a dropped request aborts the in-flight policy call through
//! the HTTP client and rolls the open transaction back on drop. No work
//! outlives the request.

use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use uuid::Uuid;

use crate::error::CoreError;
use crate::policy::PolicyClient;
use crate::projection::{self, Organization, ResourceView};
use crate::registry::ResourceKind;
use crate::store::ResourceStore;

mod bindings;
mod org_units;
mod permissions;
mod roles;
mod root;
mod tenants;

pub use bindings::{CreateBindingInput, UpdateBindingInput};
pub use org_units::{
    CreateAccountInput, CreateOrgUnitInput, UpdateAccountInput, UpdateOrgUnitInput,
};
pub use permissions::{CreatePermissionInput, UpdatePermissionInput};
pub use roles::{CreateRoleInput, UpdateRoleInput};
pub use root::{CreateRootInput, UpdateRootInput};
pub use tenants::{CreateTenantInput, UpdateTenantInput};

/// Request-scoped caller identity, populated by the HTTP layer.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Authenticated identity, or the literal `system` fallback.
    pub caller_id: String,
    /// Tenant scope for reads; absent means unscoped.
    pub tenant_id: Option<Uuid>,
}

impl RequestContext {
    pub fn system() -> Self {
        Self {
            caller_id: "system".to_string(),
            tenant_id: None,
        }
    }
}

/// Two-store mutation coordinator and query surface.
#[derive(Debug, Clone)]
pub struct Coordinator {
    db: DatabaseConnection,
    store: ResourceStore,
    policy: PolicyClient,
}

/// Parent-chain walks are bounded; a live hierarchy deeper than this is
/// treated as corrupt.
const MAX_ANCESTOR_DEPTH: usize = 32;

impl Coordinator {
    pub fn new(db: DatabaseConnection, store: ResourceStore, policy: PolicyClient) -> Self {
        Self { db, store, policy }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    pub fn policy(&self) -> &PolicyClient {
        &self.policy
    }

    /// Reject the zero UUID in required id inputs.
    pub(crate) fn require_id(id: Uuid, field: &str) -> Result<Uuid, CoreError> {
        if id.is_nil() {
            return Err(CoreError::validation(format!("{} must not be zero", field)));
        }
        Ok(id)
    }

    /// Whether `ancestor` is equal to `node` or appears in its live parent
    /// chain.
    pub(crate) async fn is_ancestor_or_equal<C: ConnectionTrait>(
        &self,
        db: &C,
        ancestor: Uuid,
        node: Uuid,
    ) -> Result<bool, CoreError> {
        let mut current = Some(node);
        for _ in 0..MAX_ANCESTOR_DEPTH {
            let Some(id) = current else {
                return Ok(false);
            };
            if id == ancestor {
                return Ok(true);
            }
            current = match self.store.find_live(db, id).await? {
                Some(row) => row.parent_resource_id,
                None => return Ok(false),
            };
        }
        Err(CoreError::Internal(format!(
            "parent chain of {} exceeds depth {}",
            node, MAX_ANCESTOR_DEPTH
        )))
    }

    /// Project a row's parent as an Organization, if it has one.
    pub(crate) async fn parent_org<C: ConnectionTrait>(
        &self,
        db: &C,
        parent_id: Option<Uuid>,
    ) -> Result<Option<Organization>, CoreError> {
        let Some(parent_id) = parent_id else {
            return Ok(None);
        };
        let Some(parent) = self.store.find_live(db, parent_id).await? else {
            return Ok(None);
        };
        let kind = self.store.kind_of_row(&parent)?;
        let metadata = self.store.load_metadata(db, parent.id).await?;
        Ok(projection::project_parent_org(
            kind,
            &parent,
            metadata.as_ref(),
        ))
    }

    /// Shallow projection of a referenced resource (no parent resolution).
    pub(crate) async fn project_ref<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
    ) -> Result<Option<ResourceView>, CoreError> {
        let Some(row) = self.store.find_live(db, id).await? else {
            return Ok(None);
        };
        let kind = self.store.kind_of_row(&row)?;
        let metadata = self.store.load_metadata(db, row.id).await?;
        let specialization = if kind == ResourceKind::Role {
            self.store.find_role_row(db, row.id).await?
        } else {
            None
        };
        Ok(Some(projection::project_resource(
            kind,
            &row,
            metadata.as_ref(),
            specialization.as_ref(),
            None,
            None,
            None,
        )))
    }

    /// Full projection of one row: metadata, parent organization, role
    /// specialization, binding principal and scope reference as the kind
    /// requires. Reference failures degrade to null fields.
    pub(crate) async fn project_full(
        &self,
        row: &crate::models::resource::Model,
    ) -> Result<ResourceView, CoreError> {
        let db = &self.db;
        let kind = self.store.kind_of_row(row)?;
        let metadata = self.store.load_metadata(db, row.id).await?;
        let parent_org = self.parent_org(db, row.parent_resource_id).await?;

        let specialization = if kind == ResourceKind::Role {
            self.store.find_role_row(db, row.id).await?
        } else {
            None
        };

        let scope_ref = match (kind, row.parent_resource_id) {
            (ResourceKind::Role | ResourceKind::Binding, Some(parent_id)) => {
                self.project_ref(db, parent_id).await?
            }
            _ => None,
        };

        let principal = if kind == ResourceKind::Binding {
            self.binding_principal(metadata.as_ref()).await
        } else {
            None
        };

        Ok(projection::project_resource(
            kind,
            row,
            metadata.as_ref(),
            specialization.as_ref(),
            parent_org,
            scope_ref,
            principal,
        ))
    }

    /// Resolve a binding's principal against the policy directory. Lookup
    /// failures degrade to a bare principal carrying only the id.
    pub(crate) async fn binding_principal(
        &self,
        metadata: Option<&serde_json::Value>,
    ) -> Option<crate::projection::Principal> {
        use crate::metadata::{BindingMetadata, PrincipalType};
        use crate::projection::{GroupView, Principal, UserView};

        let meta: BindingMetadata =
            serde_json::from_value(metadata?.clone()).ok()?;
        match meta.principal_type {
            PrincipalType::User => {
                let directory = self.policy.get_user(meta.principal_id).await.ok().flatten();
                Some(Principal::User(match directory {
                    Some(user) => UserView {
                        id: user.key,
                        email: user.email,
                        first_name: user.first_name,
                        last_name: user.last_name,
                    },
                    None => UserView {
                        id: meta.principal_id.to_string(),
                        email: None,
                        first_name: None,
                        last_name: None,
                    },
                }))
            }
            // The policy directory exposes no group detail endpoint; the id
            // doubles as the display name.
            PrincipalType::Group => Some(Principal::Group(GroupView {
                id: meta.principal_id.to_string(),
                name: meta.principal_id.to_string(),
            })),
        }
    }

    /// Begin a store transaction.
    pub(crate) async fn begin(&self) -> Result<sea_orm::DatabaseTransaction, CoreError> {
        Ok(self.db.begin().await?)
    }
}
