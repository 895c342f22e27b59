//! Test utilities for database and coordinator testing.
//!
//! Sets up in-memory SQLite databases with migrations and seeds applied,
//! plus a policy client pointed at a wiremock server.

use std::time::Duration;

use anyhow::Result;
use iam_registry::coordinator::{Coordinator, CreateRootInput, CreateTenantInput, RequestContext};
use iam_registry::policy::{PolicyClient, PolicySettings};
use iam_registry::projection::ResourceView;
use iam_registry::registry::TypeRegistry;
use iam_registry::seeds;
use iam_registry::store::ResourceStore;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::json;
use url::Url;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_PROJECT: &str = "iam";
pub const TEST_ENV: &str = "test";
pub const TEST_TOKEN: &str = "test-token";

/// Sets up an in-memory SQLite database with migrations and seeds applied.
#[allow(dead_code)]
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;

    // SQLite does not enforce our Postgres foreign key semantics; disable FK
    // checks so fixtures can be inserted in any order.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = OFF".to_string(),
    ))
    .await?;

    seeds::seed_resource_types(&db).await?;
    seeds::seed_master_catalog(&db).await?;
    Ok(db)
}

/// Policy client pointed at a mock server.
#[allow(dead_code)]
pub fn policy_client(base: &str) -> PolicyClient {
    PolicyClient::new(PolicySettings {
        endpoint: Url::parse(base).expect("mock server uri"),
        project: TEST_PROJECT.to_string(),
        environment: TEST_ENV.to_string(),
        token: TEST_TOKEN.to_string(),
        timeout: Duration::from_secs(5),
    })
    .expect("policy client")
}

/// Coordinator over the given database and mock policy server.
#[allow(dead_code)]
pub async fn coordinator(db: &DatabaseConnection, mock_uri: &str) -> Result<Coordinator> {
    let registry = TypeRegistry::load(db).await?;
    Ok(Coordinator::new(
        db.clone(),
        ResourceStore::new(registry),
        policy_client(mock_uri),
    ))
}

#[allow(dead_code)]
pub fn facts_path(suffix: &str) -> String {
    format!("/v2/facts/{}/{}/{}", TEST_PROJECT, TEST_ENV, suffix)
}

#[allow(dead_code)]
pub fn schema_path(suffix: &str) -> String {
    format!("/v2/schema/{}/{}/{}", TEST_PROJECT, TEST_ENV, suffix)
}

/// Create the singular root resource, returning its id.
#[allow(dead_code)]
pub async fn create_root(coordinator: &Coordinator) -> Result<Uuid> {
    let view = coordinator
        .create_root(
            &RequestContext::system(),
            CreateRootInput {
                name: "Acme Root".to_string(),
                description: None,
            },
        )
        .await?;
    Ok(view.id().expect("root view id"))
}

/// Mount the two mocks a successful tenant provisioning hits and return the
/// tenant id the policy service will assign.
#[allow(dead_code)]
pub async fn mock_tenant_provisioning(server: &MockServer) -> Uuid {
    let tenant_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(facts_path("tenants")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": tenant_id,
            "key": tenant_id.to_string(),
            "name": "upstream",
            "attributes": {},
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(facts_path("resource_instances")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": Uuid::new_v4(),
            "key": tenant_id.to_string(),
            "tenant": tenant_id.to_string(),
            "resource": "Tenant",
        })))
        .mount(server)
        .await;

    tenant_id
}

/// Provision a root and a tenant under it, returning (root_id, tenant_id).
#[allow(dead_code)]
pub async fn provision_tenant(
    coordinator: &Coordinator,
    server: &MockServer,
) -> Result<(Uuid, Uuid)> {
    let root_id = create_root(coordinator).await?;
    let tenant_id = mock_tenant_provisioning(server).await;

    let view = coordinator
        .create_tenant(
            &RequestContext::system(),
            CreateTenantInput {
                name: "Acme".to_string(),
                parent_org_id: root_id,
                description: Some("primary tenant".to_string()),
                contact_info: None,
            },
        )
        .await?;
    assert!(matches!(view, ResourceView::Tenant(_)));
    assert_eq!(view.id(), Some(tenant_id));

    Ok((root_id, tenant_id))
}
