//! Startup seeding.
//!
//! Two idempotent passes run from `main` after migrations and before the
//! type registry loads: the fixed resource type catalog and a baseline
//! master role catalog. Existing rows are left untouched.

use chrono::Utc;
use sea_orm::{ActiveValue::Set, ConnectionTrait, EntityTrait, PaginatorTrait};
use uuid::{Uuid, uuid};

use crate::models::{
    master_permission, master_role, master_role_permission, resource_type,
};
use crate::registry::ResourceKind;

/// Well-known catalog ids. Every environment shares these so resource rows
/// stay portable across databases.
pub const TYPE_ID_ROOT: Uuid = uuid!("a0000000-0000-4000-8000-000000000001");
pub const TYPE_ID_TENANT: Uuid = uuid!("a0000000-0000-4000-8000-000000000002");
pub const TYPE_ID_ACCOUNT: Uuid = uuid!("a0000000-0000-4000-8000-000000000003");
pub const TYPE_ID_CLIENT_ORG_UNIT: Uuid = uuid!("a0000000-0000-4000-8000-000000000004");
pub const TYPE_ID_ROLE: Uuid = uuid!("a0000000-0000-4000-8000-000000000005");
pub const TYPE_ID_PERMISSION: Uuid = uuid!("a0000000-0000-4000-8000-000000000006");
pub const TYPE_ID_BINDING: Uuid = uuid!("a0000000-0000-4000-8000-000000000007");

const MASTER_ROLE_TENANT_ADMIN: Uuid = uuid!("b0000000-0000-4000-8000-000000000001");
const MASTER_ROLE_VIEWER: Uuid = uuid!("b0000000-0000-4000-8000-000000000002");
const MASTER_PERMISSION_READ: Uuid = uuid!("c0000000-0000-4000-8000-000000000001");
const MASTER_PERMISSION_MANAGE: Uuid = uuid!("c0000000-0000-4000-8000-000000000002");

pub fn type_id_for(kind: ResourceKind) -> Uuid {
    match kind {
        ResourceKind::Root => TYPE_ID_ROOT,
        ResourceKind::Tenant => TYPE_ID_TENANT,
        ResourceKind::Account => TYPE_ID_ACCOUNT,
        ResourceKind::ClientOrganizationUnit => TYPE_ID_CLIENT_ORG_UNIT,
        ResourceKind::Role => TYPE_ID_ROLE,
        ResourceKind::Permission => TYPE_ID_PERMISSION,
        ResourceKind::Binding => TYPE_ID_BINDING,
    }
}

/// Insert any missing `mst_resource_type` rows.
pub async fn seed_resource_types<C: ConnectionTrait>(db: &C) -> Result<(), sea_orm::DbErr> {
    let existing: Vec<String> = resource_type::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.name)
        .collect();

    for kind in ResourceKind::ALL {
        if existing.iter().any(|name| name == kind.as_str()) {
            continue;
        }
        let row = resource_type::ActiveModel {
            id: Set(type_id_for(kind)),
            name: Set(kind.as_str().to_string()),
            created_at: Set(Utc::now().into()),
        };
        resource_type::Entity::insert(row).exec(db).await?;
        tracing::info!(kind = %kind, "seeded resource type");
    }
    Ok(())
}

/// Insert the baseline master catalog when the master tables are empty.
///
/// TenantAdmin holds every baseline permission; Viewer holds the read-only
/// subset. Tenant provisioning copies these into each new tenant as DEFAULT
/// roles.
pub async fn seed_master_catalog<C: ConnectionTrait>(db: &C) -> Result<(), sea_orm::DbErr> {
    if master_role::Entity::find().count(db).await? > 0 {
        return Ok(());
    }

    let now = Utc::now().into();

    let permissions = [
        (MASTER_PERMISSION_READ, "iam", "read", "iam:read"),
        (MASTER_PERMISSION_MANAGE, "iam", "manage", "iam:manage"),
    ];
    for (id, service_id, action, name) in permissions {
        master_permission::Entity::insert(master_permission::ActiveModel {
            id: Set(id),
            service_id: Set(service_id.to_string()),
            action: Set(action.to_string()),
            name: Set(name.to_string()),
            created_at: Set(now),
        })
        .exec(db)
        .await?;
    }

    let roles = [
        (
            MASTER_ROLE_TENANT_ADMIN,
            "TenantAdmin",
            "Full control over the tenant subtree",
        ),
        (
            MASTER_ROLE_VIEWER,
            "Viewer",
            "Read-only access to the tenant subtree",
        ),
    ];
    for (id, name, description) in roles {
        master_role::Entity::insert(master_role::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            description: Set(Some(description.to_string())),
            version: Set(1),
            created_at: Set(now),
        })
        .exec(db)
        .await?;
    }

    let grants = [
        (MASTER_ROLE_TENANT_ADMIN, MASTER_PERMISSION_READ),
        (MASTER_ROLE_TENANT_ADMIN, MASTER_PERMISSION_MANAGE),
        (MASTER_ROLE_VIEWER, MASTER_PERMISSION_READ),
    ];
    for (role_id, permission_id) in grants {
        master_role_permission::Entity::insert(master_role_permission::ActiveModel {
            role_id: Set(role_id),
            permission_id: Set(permission_id),
        })
        .exec(db)
        .await?;
    }

    tracing::info!("seeded master role catalog");
    Ok(())
}
