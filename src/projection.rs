//! Projection engine: stored rows to the polymorphic response surface.
//!
//! Projection is pure. Callers load whatever rows a projection needs (the
//! resource row, its metadata blob, the parent row, the role specialization,
//! the directory principal) and the functions here only map them into the
//! tagged unions. A missing parent or metadata row degrades the affected
//! fields to `None` so list queries never fail on a single bad row.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::metadata::{
    AccountMetadata, BillingInfo, BindingMetadata, ContactInfo, CouMetadata, RootMetadata,
    TenantMetadata, parse_lenient,
};
use crate::models::{permission, resource, role};
use crate::registry::ResourceKind;

/// Shared fields present on every projected resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceHeader {
    pub id: Uuid,
    pub name: String,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl ResourceHeader {
    fn from_row(row: &resource::Model) -> Self {
        Self {
            id: row.id,
            name: row.name.clone(),
            created_by: row.created_by.clone(),
            updated_by: row.updated_by.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RootView {
    #[serde(flatten)]
    pub header: ResourceHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantView {
    #[serde(flatten)]
    pub header: ResourceHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<ContactInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(no_recursion)]
    pub parent_org: Option<Box<Organization>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    #[serde(flatten)]
    pub header: ResourceHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_info: Option<BillingInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(no_recursion)]
    pub parent_org: Option<Box<Organization>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientOrganizationUnitView {
    #[serde(flatten)]
    pub header: ResourceHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(no_recursion)]
    pub parent_org: Option<Box<Organization>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleView {
    #[serde(flatten)]
    pub header: ResourceHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    pub role_type: role::RoleType,
    pub version: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(no_recursion)]
    pub assignable_scope: Option<Box<ResourceView>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionView {
    pub id: Uuid,
    pub service_id: String,
    pub action: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BindingView {
    #[serde(flatten)]
    pub header: ResourceHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(no_recursion)]
    pub scope_ref: Option<Box<ResourceView>>,
    pub version: i32,
}

/// A user principal, sourced from the policy service directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// A group principal, sourced from the policy service directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub id: String,
    pub name: String,
}

/// Organization sum type: the four hierarchical container kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum Organization {
    Root(RootView),
    Tenant(TenantView),
    Account(AccountView),
    ClientOrganizationUnit(ClientOrganizationUnitView),
}

/// Principal sum type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum Principal {
    User(UserView),
    Group(GroupView),
}

/// Resource sum type: every concrete projection the API can return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum ResourceView {
    Root(RootView),
    Tenant(TenantView),
    Account(AccountView),
    ClientOrganizationUnit(ClientOrganizationUnitView),
    Role(RoleView),
    Permission(PermissionView),
    Binding(BindingView),
    User(UserView),
    Group(GroupView),
}

impl ResourceView {
    pub fn id(&self) -> Option<Uuid> {
        match self {
            ResourceView::Root(v) => Some(v.header.id),
            ResourceView::Tenant(v) => Some(v.header.id),
            ResourceView::Account(v) => Some(v.header.id),
            ResourceView::ClientOrganizationUnit(v) => Some(v.header.id),
            ResourceView::Role(v) => Some(v.header.id),
            ResourceView::Permission(v) => Some(v.id),
            ResourceView::Binding(v) => Some(v.header.id),
            ResourceView::User(_) | ResourceView::Group(_) => None,
        }
    }
}

impl From<Organization> for ResourceView {
    fn from(org: Organization) -> Self {
        match org {
            Organization::Root(v) => ResourceView::Root(v),
            Organization::Tenant(v) => ResourceView::Tenant(v),
            Organization::Account(v) => ResourceView::Account(v),
            Organization::ClientOrganizationUnit(v) => ResourceView::ClientOrganizationUnit(v),
        }
    }
}

pub fn project_root(row: &resource::Model, metadata: Option<&serde_json::Value>) -> RootView {
    let meta: RootMetadata = metadata.map(parse_lenient).unwrap_or_default();
    RootView {
        header: ResourceHeader::from_row(row),
        description: meta.description,
    }
}

pub fn project_tenant(
    row: &resource::Model,
    metadata: Option<&serde_json::Value>,
    parent_org: Option<Organization>,
) -> TenantView {
    let meta: TenantMetadata = metadata.map(parse_lenient).unwrap_or_default();
    TenantView {
        header: ResourceHeader::from_row(row),
        description: meta.description,
        contact_info: meta.contact_info,
        parent_org: parent_org.map(Box::new),
    }
}

pub fn project_account(
    row: &resource::Model,
    metadata: Option<&serde_json::Value>,
    parent_org: Option<Organization>,
) -> AccountView {
    let meta: AccountMetadata = metadata.map(parse_lenient).unwrap_or_default();
    AccountView {
        header: ResourceHeader::from_row(row),
        tenant_id: row.tenant_id,
        description: meta.description,
        billing_info: meta.billing_info,
        parent_org: parent_org.map(Box::new),
    }
}

pub fn project_client_organization_unit(
    row: &resource::Model,
    metadata: Option<&serde_json::Value>,
    parent_org: Option<Organization>,
) -> ClientOrganizationUnitView {
    let meta: CouMetadata = metadata.map(parse_lenient).unwrap_or_default();
    ClientOrganizationUnitView {
        header: ResourceHeader::from_row(row),
        tenant_id: row.tenant_id,
        description: meta.description,
        parent_org: parent_org.map(Box::new),
    }
}

pub fn project_role(
    row: &resource::Model,
    specialization: Option<&role::Model>,
    assignable_scope: Option<ResourceView>,
) -> RoleView {
    RoleView {
        header: ResourceHeader::from_row(row),
        tenant_id: row.tenant_id,
        role_type: specialization
            .map(|r| r.role_type.clone())
            .unwrap_or(role::RoleType::Custom),
        version: specialization.map(|r| r.version).unwrap_or(1),
        description: specialization.and_then(|r| r.description.clone()),
        assignable_scope: assignable_scope.map(Box::new),
    }
}

pub fn project_permission(row: &permission::Model) -> PermissionView {
    PermissionView {
        id: row.id,
        service_id: row.service_id.clone(),
        action: row.action.clone(),
        name: row.name.clone(),
    }
}

pub fn project_binding(
    row: &resource::Model,
    metadata: Option<&serde_json::Value>,
    principal: Option<Principal>,
    scope_ref: Option<ResourceView>,
) -> BindingView {
    let meta: Option<BindingMetadata> =
        metadata.and_then(|value| serde_json::from_value(value.clone()).ok());
    BindingView {
        header: ResourceHeader::from_row(row),
        tenant_id: row.tenant_id,
        principal,
        role_id: meta.as_ref().map(|m| m.role_id),
        scope_ref: scope_ref.map(Box::new),
        version: meta.as_ref().map(|m| m.version).unwrap_or(1),
    }
}

/// Project a resource row as an Organization, or `None` when the row's kind
/// is not an organization type.
pub fn project_parent_org(
    kind: ResourceKind,
    row: &resource::Model,
    metadata: Option<&serde_json::Value>,
) -> Option<Organization> {
    match kind {
        ResourceKind::Root => Some(Organization::Root(project_root(row, metadata))),
        ResourceKind::Tenant => Some(Organization::Tenant(project_tenant(row, metadata, None))),
        ResourceKind::Account => Some(Organization::Account(project_account(row, metadata, None))),
        ResourceKind::ClientOrganizationUnit => Some(Organization::ClientOrganizationUnit(
            project_client_organization_unit(row, metadata, None),
        )),
        _ => None,
    }
}

/// Branch on the type tag and construct the concrete Resource variant.
///
/// Auxiliary rows a variant needs (role specialization, parent organization,
/// binding principal, scope ref) are supplied by the caller; absent ones
/// degrade to null fields.
pub fn project_resource(
    kind: ResourceKind,
    row: &resource::Model,
    metadata: Option<&serde_json::Value>,
    specialization: Option<&role::Model>,
    parent_org: Option<Organization>,
    scope_ref: Option<ResourceView>,
    principal: Option<Principal>,
) -> ResourceView {
    match kind {
        ResourceKind::Root => ResourceView::Root(project_root(row, metadata)),
        ResourceKind::Tenant => ResourceView::Tenant(project_tenant(row, metadata, parent_org)),
        ResourceKind::Account => ResourceView::Account(project_account(row, metadata, parent_org)),
        ResourceKind::ClientOrganizationUnit => ResourceView::ClientOrganizationUnit(
            project_client_organization_unit(row, metadata, parent_org),
        ),
        ResourceKind::Role => ResourceView::Role(project_role(row, specialization, scope_ref)),
        ResourceKind::Binding => {
            ResourceView::Binding(project_binding(row, metadata, principal, scope_ref))
        }
        // Permission rows live in tnt_permission and are projected through
        // project_permission; a resource row tagged Permission carries no
        // extension attributes.
        ResourceKind::Permission => ResourceView::Permission(PermissionView {
            id: row.id,
            service_id: String::new(),
            action: String::new(),
            name: row.name.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ROW_STATUS_LIVE;
    use chrono::Utc;
    use serde_json::json;

    fn row(kind_name: &str) -> resource::Model {
        resource::Model {
            id: Uuid::new_v4(),
            resource_type_id: Uuid::new_v4(),
            parent_resource_id: Some(Uuid::new_v4()),
            tenant_id: Some(Uuid::new_v4()),
            name: kind_name.to_string(),
            row_status: ROW_STATUS_LIVE,
            created_by: "alice".to_string(),
            updated_by: "alice".to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn tenant_projection_reads_metadata_keys() {
        let row = row("acme");
        let meta = json!({
            "description": "x",
            "contactInfo": {"email": "a@b", "address": {"city": "Paris"}}
        });

        let view = project_tenant(&row, Some(&meta), None);

        assert_eq!(view.header.name, "acme");
        assert_eq!(view.description.as_deref(), Some("x"));
        let contact = view.contact_info.unwrap();
        assert_eq!(contact.email.as_deref(), Some("a@b"));
        assert_eq!(contact.address.unwrap().city.as_deref(), Some("Paris"));
    }

    #[test]
    fn missing_metadata_degrades_to_null_fields() {
        let row = row("acme");
        let view = project_tenant(&row, None, None);
        assert!(view.description.is_none());
        assert!(view.contact_info.is_none());
    }

    #[test]
    fn parent_org_is_none_for_non_organization_kinds() {
        let row = row("viewer");
        assert!(project_parent_org(ResourceKind::Role, &row, None).is_none());
        assert!(project_parent_org(ResourceKind::Binding, &row, None).is_none());
        assert!(project_parent_org(ResourceKind::Root, &row, None).is_some());
    }

    #[test]
    fn resource_union_serializes_with_type_tag() {
        let row = row("acme");
        let view = project_resource(
            ResourceKind::Tenant,
            &row,
            None,
            None,
            None,
            None,
            None,
        );
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["type"], "Tenant");
        assert_eq!(value["name"], "acme");
        assert_eq!(value["createdBy"], "alice");
    }

    #[test]
    fn binding_projection_reads_triple_from_metadata() {
        let row = row("grant");
        let role_id = Uuid::new_v4();
        let scope_id = Uuid::new_v4();
        let meta = json!({
            "principalId": Uuid::new_v4(),
            "principalType": "USER",
            "roleId": role_id,
            "scopeRefId": scope_id,
            "version": 3
        });

        let view = project_binding(&row, Some(&meta), None, None);
        assert_eq!(view.role_id, Some(role_id));
        assert_eq!(view.version, 3);
    }

    #[test]
    fn role_projection_defaults_without_specialization() {
        let row = row("viewer");
        let view = project_role(&row, None, None);
        assert_eq!(view.role_type, role::RoleType::Custom);
        assert_eq!(view.version, 1);
        assert!(view.description.is_none());
    }
}
