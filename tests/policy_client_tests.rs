//! Policy client integration tests against a wiremock server.

mod test_utils;

use serde_json::json;
use test_utils::{facts_path, policy_client, schema_path};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn create_tenant_posts_with_bearer_token() {
    let server = MockServer::start().await;
    let tenant_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(facts_path("tenants")))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({ "name": "Acme" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": tenant_id,
            "key": "acme",
            "name": "Acme",
            "attributes": {},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = policy_client(&server.uri());
    let tenant = client
        .create_tenant("acme", "Acme", json!({}))
        .await
        .unwrap();
    assert_eq!(tenant.id, tenant_id);
    assert_eq!(tenant.key, "acme");
}

#[tokio::test]
async fn delete_treats_absent_object_as_success() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path(facts_path(&format!("tenants/{}", id))))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = policy_client(&server.uri());
    client.delete_tenant(id).await.unwrap();
}

#[tokio::test]
async fn list_tenants_merges_all_pages() {
    let server = MockServer::start().await;
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(facts_path("tenants")))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "100"))
        .and(query_param("include_total_count", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": first, "key": "one", "attributes": {} }],
            "page_count": 2,
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(facts_path("tenants")))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": second, "key": "two", "attributes": {} }],
            "page_count": 2,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = policy_client(&server.uri());
    let tenants = client.list_tenants().await.unwrap();
    assert_eq!(tenants.len(), 2);
    assert_eq!(tenants[0].id, first);
    assert_eq!(tenants[1].id, second);
}

#[tokio::test]
async fn failures_surface_status_and_body_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(schema_path("roles")))
        .respond_with(ResponseTemplate::new(422).set_body_string("duplicate role key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = policy_client(&server.uri());
    let err = client
        .create_role("admins", "Admins", None, &[])
        .await
        .unwrap_err();

    match err {
        iam_registry::policy::PolicyError::Http { status, body } => {
            assert_eq!(status, 422);
            assert_eq!(body, "duplicate role key");
        }
        other => panic!("expected http error, got {:?}", other),
    }
    // expect(1) on the mock verifies the request was not retried.
    server.verify().await;
}

#[tokio::test]
async fn role_assignment_names_the_principal_kind() {
    let server = MockServer::start().await;
    let principal = Uuid::new_v4();
    let assignment = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(facts_path("role_assignments")))
        .and(body_partial_json(json!({
            "user": principal.to_string(),
            "role": "role-key",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": assignment,
            "user": principal.to_string(),
            "role": "role-key",
            "tenant": "tenant-key",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = policy_client(&server.uri());
    let created = client
        .create_role_assignment(
            principal,
            iam_registry::metadata::PrincipalType::User,
            "role-key",
            "tenant-key",
            None,
        )
        .await
        .unwrap();
    assert_eq!(created.id, assignment);
}

#[tokio::test]
async fn resource_action_delete_targets_the_service_resource() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(schema_path("resources/billing/actions/read")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = policy_client(&server.uri());
    client
        .delete_resource_action("billing", "read")
        .await
        .unwrap();
}
