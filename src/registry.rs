//! Type registry: the fixed catalog of resource kinds.
//!
//! The seven resource kinds are seeded into `mst_resource_type` and loaded
//! exactly once at startup. The registry is immutable afterwards and is
//! shared read-only through the services bundle. A missing catalog row is a
//! fatal configuration error, not a runtime condition.

use std::collections::HashMap;
use std::fmt;

use sea_orm::{ConnectionTrait, EntityTrait};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::resource_type;

/// The fixed set of resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ResourceKind {
    Root,
    Tenant,
    Account,
    ClientOrganizationUnit,
    Role,
    Permission,
    Binding,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Root,
        ResourceKind::Tenant,
        ResourceKind::Account,
        ResourceKind::ClientOrganizationUnit,
        ResourceKind::Role,
        ResourceKind::Permission,
        ResourceKind::Binding,
    ];

    /// Catalog name as stored in `mst_resource_type.name`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Root => "Root",
            ResourceKind::Tenant => "Tenant",
            ResourceKind::Account => "Account",
            ResourceKind::ClientOrganizationUnit => "ClientOrganizationUnit",
            ResourceKind::Role => "Role",
            ResourceKind::Permission => "Permission",
            ResourceKind::Binding => "Binding",
        }
    }

    pub fn from_name(name: &str) -> Option<ResourceKind> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == name)
    }

    /// Legal parent kinds for a resource of this kind.
    ///
    /// A role's stored parent is its assignable scope; a binding's parent is
    /// its scope reference and may be any live resource (checked separately).
    pub fn legal_parents(&self) -> &'static [ResourceKind] {
        match self {
            ResourceKind::Root => &[],
            ResourceKind::Tenant => &[ResourceKind::Root],
            ResourceKind::ClientOrganizationUnit => {
                &[ResourceKind::Tenant, ResourceKind::ClientOrganizationUnit]
            }
            ResourceKind::Account => {
                &[ResourceKind::Tenant, ResourceKind::ClientOrganizationUnit]
            }
            ResourceKind::Role => &[
                ResourceKind::Tenant,
                ResourceKind::ClientOrganizationUnit,
                ResourceKind::Account,
            ],
            // Binding scope refs are validated against the role's assignable
            // scope, not a static parent set.
            ResourceKind::Binding => &ResourceKind::ALL,
            ResourceKind::Permission => &[],
        }
    }

    /// Whether rows of this kind require a tenant ancestor.
    pub fn requires_tenant(&self) -> bool {
        !matches!(self, ResourceKind::Root | ResourceKind::Tenant)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog entry: kind plus its stable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub kind: ResourceKind,
    pub id: Uuid,
}

/// Errors raised while loading the type catalog.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("resource type '{0}' is not configured in mst_resource_type")]
    NotConfigured(ResourceKind),
    #[error("failed to load resource type catalog: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// In-memory, read-only view of the resource type catalog.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    by_kind: HashMap<ResourceKind, Uuid>,
    by_id: HashMap<Uuid, ResourceKind>,
}

impl TypeRegistry {
    /// Load the catalog and verify every kind is present.
    pub async fn load<C: ConnectionTrait>(db: &C) -> Result<Self, RegistryError> {
        let rows = resource_type::Entity::find().all(db).await?;

        let mut by_kind = HashMap::new();
        let mut by_id = HashMap::new();
        for row in rows {
            if let Some(kind) = ResourceKind::from_name(&row.name) {
                by_kind.insert(kind, row.id);
                by_id.insert(row.id, kind);
            }
        }

        for kind in ResourceKind::ALL {
            if !by_kind.contains_key(&kind) {
                return Err(RegistryError::NotConfigured(kind));
            }
        }

        Ok(Self { by_kind, by_id })
    }

    /// Build a registry from explicit descriptors (test seam).
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        let mut by_kind = HashMap::new();
        let mut by_id = HashMap::new();
        for descriptor in descriptors {
            by_kind.insert(descriptor.kind, descriptor.id);
            by_id.insert(descriptor.id, descriptor.kind);
        }
        Self { by_kind, by_id }
    }

    /// Identifier for a kind. Load-time validation guarantees presence.
    pub fn type_id(&self, kind: ResourceKind) -> Uuid {
        self.by_kind[&kind]
    }

    /// Kind for a stored `resource_type_id`, if it is part of the catalog.
    pub fn kind_of(&self, id: Uuid) -> Option<ResourceKind> {
        self.by_id.get(&id).copied()
    }

    /// All catalog entries.
    pub fn all(&self) -> Vec<TypeDescriptor> {
        ResourceKind::ALL
            .iter()
            .map(|&kind| TypeDescriptor {
                kind,
                id: self.by_kind[&kind],
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::from_descriptors(ResourceKind::ALL.iter().map(|&kind| TypeDescriptor {
            kind,
            id: Uuid::new_v4(),
        }))
    }

    #[test]
    fn kind_and_id_round_trip() {
        let registry = registry();
        for kind in ResourceKind::ALL {
            let id = registry.type_id(kind);
            assert_eq!(registry.kind_of(id), Some(kind));
        }
        assert_eq!(registry.kind_of(Uuid::new_v4()), None);
    }

    #[test]
    fn legal_parent_sets_match_hierarchy_rules() {
        assert_eq!(
            ResourceKind::Tenant.legal_parents(),
            &[ResourceKind::Root]
        );
        assert!(
            ResourceKind::Account
                .legal_parents()
                .contains(&ResourceKind::ClientOrganizationUnit)
        );
        assert!(
            !ResourceKind::Account
                .legal_parents()
                .contains(&ResourceKind::Root)
        );
        assert!(
            ResourceKind::Role
                .legal_parents()
                .contains(&ResourceKind::Account)
        );
        assert!(ResourceKind::Root.legal_parents().is_empty());
    }

    #[test]
    fn tenant_requirement_excludes_root_and_tenant() {
        assert!(!ResourceKind::Root.requires_tenant());
        assert!(!ResourceKind::Tenant.requires_tenant());
        assert!(ResourceKind::Account.requires_tenant());
        assert!(ResourceKind::Binding.requires_tenant());
    }

    #[test]
    fn catalog_names_round_trip() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(ResourceKind::from_name("Widget"), None);
    }
}
