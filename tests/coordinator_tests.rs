//! Coordinator integration tests: two-store protocols against sqlite and a
//! wiremock policy server.

mod test_utils;

use iam_registry::coordinator::{
    CreateAccountInput, CreateBindingInput, CreateOrgUnitInput, CreateTenantInput, RequestContext,
    UpdateAccountInput, UpdateTenantInput,
};
use iam_registry::envelope::OperationResult;
use iam_registry::error::CoreError;
use iam_registry::metadata::{ContactInfo, PrincipalType, TenantMetadata};
use iam_registry::models::{self, ROW_STATUS_DELETED, ROW_STATUS_LIVE};
use iam_registry::models::role::RoleType;
use iam_registry::registry::ResourceKind;
use iam_registry::store::NewResource;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use test_utils::{coordinator, create_root, facts_path, provision_tenant, setup_test_db};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn tenant_provisioning_copies_the_master_catalog() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    let coordinator = coordinator(&db, &server.uri()).await.unwrap();

    let (_root_id, tenant_id) = provision_tenant(&coordinator, &server).await.unwrap();

    // One DEFAULT role per master catalog entry, parented under the tenant.
    let role_rows = coordinator
        .store()
        .children_of(&db, tenant_id)
        .await
        .unwrap();
    assert_eq!(role_rows.len(), 2);
    for row in &role_rows {
        assert_eq!(row.tenant_id, Some(tenant_id));
        let role = coordinator
            .store()
            .find_role_row(&db, row.id)
            .await
            .unwrap()
            .expect("role specialization row");
        assert_eq!(role.role_type, RoleType::Default);
        let granted = coordinator
            .store()
            .permissions_for_role(&db, row.id)
            .await
            .unwrap();
        assert!(!granted.is_empty());
    }

    let names: Vec<String> = role_rows.iter().map(|r| r.name.clone()).collect();
    assert!(names.contains(&"TenantAdmin".to_string()));
    assert!(names.contains(&"Viewer".to_string()));
}

#[tokio::test]
async fn upstream_failure_leaves_no_local_rows() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    let coordinator = coordinator(&db, &server.uri()).await.unwrap();
    let root_id = create_root(&coordinator).await.unwrap();

    Mock::given(method("POST"))
        .and(path(facts_path("tenants")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let err = coordinator
        .create_tenant(
            &RequestContext::system(),
            CreateTenantInput {
                name: "Acme".to_string(),
                parent_org_id: root_id,
                description: None,
                contact_info: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "502");

    // Only the root row exists; the failed provisioning wrote nothing.
    let live = models::Resource::find()
        .filter(models::resource::Column::RowStatus.eq(ROW_STATUS_LIVE))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(live, 1);
}

#[tokio::test]
async fn resource_instance_failure_compensates_the_policy_tenant() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    let coordinator = coordinator(&db, &server.uri()).await.unwrap();
    let root_id = create_root(&coordinator).await.unwrap();

    let tenant_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path(facts_path("tenants")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": tenant_id,
            "key": tenant_id.to_string(),
            "attributes": {},
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(facts_path("resource_instances")))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(facts_path(&format!("tenants/{}", tenant_id))))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let err = coordinator
        .create_tenant(
            &RequestContext::system(),
            CreateTenantInput {
                name: "Acme".to_string(),
                parent_org_id: root_id,
                description: None,
                contact_info: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "502");

    assert!(
        coordinator
            .store()
            .find_live(&db, tenant_id)
            .await
            .unwrap()
            .is_none()
    );
    server.verify().await;
}

#[tokio::test]
async fn org_unit_rejects_a_mismatched_tenant_claim() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    let coordinator = coordinator(&db, &server.uri()).await.unwrap();
    let (_root_id, tenant_id) = provision_tenant(&coordinator, &server).await.unwrap();

    let err = coordinator
        .create_org_unit(
            &RequestContext::system(),
            CreateOrgUnitInput {
                name: "Engineering".to_string(),
                parent_org_id: tenant_id,
                tenant_id: Some(Uuid::new_v4()),
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "400");
}

#[tokio::test]
async fn tenant_delete_cascades_to_its_roles() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    let coordinator = coordinator(&db, &server.uri()).await.unwrap();
    let (_root_id, tenant_id) = provision_tenant(&coordinator, &server).await.unwrap();

    Mock::given(method("DELETE"))
        .and(path(facts_path(&format!("tenants/{}", tenant_id))))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    coordinator
        .delete_tenant(&RequestContext::system(), tenant_id)
        .await
        .unwrap();

    assert!(
        coordinator
            .store()
            .find_live(&db, tenant_id)
            .await
            .unwrap()
            .is_none()
    );
    // The DEFAULT role copies are soft-deleted with the tenant.
    let live_roles = coordinator
        .store()
        .list_of_kind(&db, ResourceKind::Role)
        .await
        .unwrap();
    assert!(live_roles.is_empty());

    // The rows are still there for the admin-only include-deleted path.
    let deleted = coordinator
        .store()
        .find_resource(&db, tenant_id, true)
        .await
        .unwrap()
        .expect("soft-deleted tenant row");
    assert_eq!(deleted.row_status, ROW_STATUS_DELETED);
    let all_roles = coordinator
        .store()
        .resources_of_kind(&db, ResourceKind::Role, true)
        .await
        .unwrap();
    assert_eq!(all_roles.len(), 2);

    // A second delete finds nothing.
    let err = coordinator
        .delete_tenant(&RequestContext::system(), tenant_id)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "404");
}

#[tokio::test]
async fn tenant_update_merges_metadata_field_wise() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    let coordinator = coordinator(&db, &server.uri()).await.unwrap();
    let (_root_id, tenant_id) = provision_tenant(&coordinator, &server).await.unwrap();

    Mock::given(method("PATCH"))
        .and(path(facts_path(&format!("tenants/{}", tenant_id))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": tenant_id,
            "key": tenant_id.to_string(),
            "attributes": {},
        })))
        .mount(&server)
        .await;

    // First patch sets contact info, second patches the description only.
    coordinator
        .update_tenant(
            &RequestContext::system(),
            tenant_id,
            UpdateTenantInput {
                name: None,
                description: None,
                contact_info: Some(ContactInfo {
                    email: Some("ops@acme.example".to_string()),
                    phone_number: None,
                    address: None,
                }),
            },
        )
        .await
        .unwrap();
    coordinator
        .update_tenant(
            &RequestContext::system(),
            tenant_id,
            UpdateTenantInput {
                name: None,
                description: Some("updated".to_string()),
                contact_info: None,
            },
        )
        .await
        .unwrap();

    let blob = coordinator
        .store()
        .load_metadata(&db, tenant_id)
        .await
        .unwrap()
        .expect("tenant metadata");
    let metadata: TenantMetadata = serde_json::from_value(blob).unwrap();
    assert_eq!(metadata.description.as_deref(), Some("updated"));
    assert_eq!(
        metadata.contact_info.and_then(|c| c.email).as_deref(),
        Some("ops@acme.example")
    );
}

#[tokio::test]
async fn binding_scope_must_sit_under_the_assignable_scope() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    let coordinator = coordinator(&db, &server.uri()).await.unwrap();
    let (root_id, tenant_id) = provision_tenant(&coordinator, &server).await.unwrap();

    let role_id = coordinator
        .store()
        .children_of(&db, tenant_id)
        .await
        .unwrap()
        .first()
        .expect("default role")
        .id;

    // The root sits above the role's assignable scope (the tenant), so a
    // grant there must be refused before any policy call.
    let err = coordinator
        .create_binding(
            &RequestContext::system(),
            CreateBindingInput {
                principal_id: Uuid::new_v4(),
                principal_type: PrincipalType::User,
                role_id,
                scope_ref_id: root_id,
                name: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "400");
}

#[tokio::test]
async fn tenant_commit_failure_removes_the_upstream_objects() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    let coordinator = coordinator(&db, &server.uri()).await.unwrap();
    let root_id = create_root(&coordinator).await.unwrap();

    // Occupy the id the policy service will assign so the local insert fails
    // after both upstream writes succeed.
    let tenant_id = Uuid::new_v4();
    coordinator
        .store()
        .insert_resource(
            &db,
            NewResource {
                id: tenant_id,
                kind: ResourceKind::Tenant,
                parent_id: Some(root_id),
                name: "Squatter".to_string(),
                metadata: json!({}),
                caller: "system".to_string(),
            },
        )
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path(facts_path("tenants")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": tenant_id,
            "key": tenant_id.to_string(),
            "attributes": {},
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(facts_path("resource_instances")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": Uuid::new_v4(),
            "key": tenant_id.to_string(),
        })))
        .expect(1)
        .mount(&server)
        .await;
    // Compensation removes the instance and then the tenant.
    Mock::given(method("DELETE"))
        .and(path(facts_path(&format!(
            "resource_instances/{}",
            tenant_id
        ))))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(facts_path(&format!("tenants/{}", tenant_id))))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let err = coordinator
        .create_tenant(
            &RequestContext::system(),
            CreateTenantInput {
                name: "Acme".to_string(),
                parent_org_id: root_id,
                description: None,
                contact_info: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "500");
    assert!(matches!(
        err,
        CoreError::Integrity {
            orphaned_upstream_id: None,
            ..
        }
    ));
    server.verify().await;
}

#[tokio::test]
async fn failed_compensation_names_the_orphaned_tenant() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    let coordinator = coordinator(&db, &server.uri()).await.unwrap();
    let root_id = create_root(&coordinator).await.unwrap();

    let tenant_id = Uuid::new_v4();
    coordinator
        .store()
        .insert_resource(
            &db,
            NewResource {
                id: tenant_id,
                kind: ResourceKind::Tenant,
                parent_id: Some(root_id),
                name: "Squatter".to_string(),
                metadata: json!({}),
                caller: "system".to_string(),
            },
        )
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path(facts_path("tenants")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": tenant_id,
            "key": tenant_id.to_string(),
            "attributes": {},
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(facts_path("resource_instances")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": Uuid::new_v4(),
            "key": tenant_id.to_string(),
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(facts_path(&format!(
            "resource_instances/{}",
            tenant_id
        ))))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    // The compensating tenant delete fails, leaving an orphan upstream.
    Mock::given(method("DELETE"))
        .and(path(facts_path(&format!("tenants/{}", tenant_id))))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let err = coordinator
        .create_tenant(
            &RequestContext::system(),
            CreateTenantInput {
                name: "Acme".to_string(),
                parent_org_id: root_id,
                description: None,
                contact_info: None,
            },
        )
        .await
        .unwrap_err();

    match &err {
        CoreError::Integrity {
            orphaned_upstream_id,
            ..
        } => assert_eq!(orphaned_upstream_id.as_deref(), Some(tenant_id.to_string().as_str())),
        other => panic!("expected integrity error, got {:?}", other),
    }
    let envelope = serde_json::to_value(OperationResult::from(err)).unwrap();
    assert_eq!(
        envelope["errorDetails"]["orphanedUpstreamId"],
        tenant_id.to_string()
    );
    server.verify().await;
}

#[tokio::test]
async fn account_moves_under_a_sibling_org_unit() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    let coordinator = coordinator(&db, &server.uri()).await.unwrap();

    // Kind-specific instance mocks first so each create gets its own id.
    let cou_id = Uuid::new_v4();
    let account_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path(facts_path("resource_instances")))
        .and(body_partial_json(json!({ "resource": "ClientOrganizationUnit" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": cou_id,
            "key": cou_id.to_string(),
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(facts_path("resource_instances")))
        .and(body_partial_json(json!({ "resource": "Account" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": account_id,
            "key": account_id.to_string(),
        })))
        .mount(&server)
        .await;

    let (_root_id, tenant_id) = provision_tenant(&coordinator, &server).await.unwrap();

    let cou = coordinator
        .create_org_unit(
            &RequestContext::system(),
            CreateOrgUnitInput {
                name: "Engineering".to_string(),
                parent_org_id: tenant_id,
                tenant_id: None,
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(cou.id(), Some(cou_id));

    let account = coordinator
        .create_account(
            &RequestContext::system(),
            CreateAccountInput {
                name: "Payroll".to_string(),
                parent_org_id: tenant_id,
                tenant_id: None,
                description: None,
                billing_info: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(account.id(), Some(account_id));

    Mock::given(method("PATCH"))
        .and(path(facts_path(&format!(
            "resource_instances/{}",
            account_id
        ))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": account_id,
            "key": account_id.to_string(),
        })))
        .mount(&server)
        .await;

    coordinator
        .update_account(
            &RequestContext::system(),
            account_id,
            UpdateAccountInput {
                name: None,
                parent_org_id: Some(cou_id),
                description: None,
                billing_info: None,
            },
        )
        .await
        .unwrap();

    let row = coordinator
        .store()
        .find_live(&db, account_id)
        .await
        .unwrap()
        .expect("account row");
    assert_eq!(row.parent_resource_id, Some(cou_id));
    assert_eq!(row.tenant_id, Some(tenant_id));
}

#[tokio::test]
async fn reparenting_cannot_change_the_tenant() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    let coordinator = coordinator(&db, &server.uri()).await.unwrap();

    let account_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path(facts_path("resource_instances")))
        .and(body_partial_json(json!({ "resource": "Account" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": account_id,
            "key": account_id.to_string(),
        })))
        .mount(&server)
        .await;

    let (root_id, tenant_id) = provision_tenant(&coordinator, &server).await.unwrap();

    coordinator
        .create_account(
            &RequestContext::system(),
            CreateAccountInput {
                name: "Payroll".to_string(),
                parent_org_id: tenant_id,
                tenant_id: None,
                description: None,
                billing_info: None,
            },
        )
        .await
        .unwrap();

    // A second tenant exists locally; moving the account under it would
    // change the tenant ancestor, which is immutable.
    let other_tenant = Uuid::new_v4();
    coordinator
        .store()
        .insert_resource(
            &db,
            NewResource {
                id: other_tenant,
                kind: ResourceKind::Tenant,
                parent_id: Some(root_id),
                name: "Other".to_string(),
                metadata: json!({}),
                caller: "system".to_string(),
            },
        )
        .await
        .unwrap();

    // Rejected before any upstream call.
    Mock::given(method("PATCH"))
        .and(path(facts_path(&format!(
            "resource_instances/{}",
            account_id
        ))))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let err = coordinator
        .update_account(
            &RequestContext::system(),
            account_id,
            UpdateAccountInput {
                name: None,
                parent_org_id: Some(other_tenant),
                description: None,
                billing_info: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "400");
    server.verify().await;
}

#[tokio::test]
async fn empty_name_patch_never_reaches_the_policy_service() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    let coordinator = coordinator(&db, &server.uri()).await.unwrap();
    let (_root_id, tenant_id) = provision_tenant(&coordinator, &server).await.unwrap();

    Mock::given(method("PATCH"))
        .and(path(facts_path(&format!("tenants/{}", tenant_id))))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let err = coordinator
        .update_tenant(
            &RequestContext::system(),
            tenant_id,
            UpdateTenantInput {
                name: Some("   ".to_string()),
                description: None,
                contact_info: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "400");
    server.verify().await;
}

#[tokio::test]
async fn zero_uuid_inputs_are_rejected() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    let coordinator = coordinator(&db, &server.uri()).await.unwrap();

    let err = coordinator.get_tenant(Uuid::nil()).await.unwrap_err();
    assert_eq!(err.error_code(), "400");
}
