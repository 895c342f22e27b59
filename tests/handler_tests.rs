//! Handler tests: full router via `oneshot`, asserting the envelope carries
//! the outcome while the HTTP status stays 200.

mod test_utils;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use iam_registry::server::{AppState, create_app};
use serde_json::{Value, json};
use test_utils::{coordinator, mock_tenant_provisioning, setup_test_db};
use tower::ServiceExt;
use wiremock::MockServer;

async fn test_app(server: &MockServer) -> Router {
    let db = setup_test_db().await.unwrap();
    let coordinator = coordinator(&db, &server.uri()).await.unwrap();
    create_app(AppState { db, coordinator })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn service_info_names_the_service() {
    let server = MockServer::start().await;
    let app = test_app(&server).await;

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["service"], "iam-registry");
}

#[tokio::test]
async fn missing_root_is_a_404_envelope_with_http_200() {
    let server = MockServer::start().await;
    let app = test_app(&server).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/root")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["isSuccess"], false);
    assert_eq!(body["errorCode"], "404");
}

#[tokio::test]
async fn root_bootstrap_succeeds_once_then_conflicts() {
    let server = MockServer::start().await;
    let app = test_app(&server).await;

    let create = |name: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/v1/root")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "name": name }).to_string()))
            .unwrap()
    };

    let response = app.clone().oneshot(create("Acme Root")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["isSuccess"], true);
    assert_eq!(body["data"][0]["type"], "Root");
    assert_eq!(body["data"][0]["name"], "Acme Root");

    let response = app.oneshot(create("Second Root")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["isSuccess"], false);
    assert_eq!(body["errorCode"], "409");
}

#[tokio::test]
async fn malformed_tenant_header_yields_a_400_envelope() {
    let server = MockServer::start().await;
    let app = test_app(&server).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/bindings")
                .header("x-tenant-id", "not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["isSuccess"], false);
    assert_eq!(body["errorCode"], "400");
}

#[tokio::test]
async fn tenant_create_round_trips_through_the_envelope() {
    let server = MockServer::start().await;
    let db = setup_test_db().await.unwrap();
    let coordinator = coordinator(&db, &server.uri()).await.unwrap();
    let app = create_app(AppState {
        db,
        coordinator: coordinator.clone(),
    });

    let root = test_utils::create_root(&coordinator).await.unwrap();
    let tenant_id = mock_tenant_provisioning(&server).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/tenants")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-caller-id", "alice")
                .body(Body::from(
                    json!({
                        "name": "Acme",
                        "parentOrgId": root,
                        "description": "primary tenant",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["isSuccess"], true);
    let tenant = &body["data"][0];
    assert_eq!(tenant["type"], "Tenant");
    assert_eq!(tenant["id"], tenant_id.to_string());
    assert_eq!(tenant["createdBy"], "alice");
    assert_eq!(tenant["description"], "primary tenant");
    assert_eq!(tenant["parentOrg"]["type"], "Root");

    // The new tenant is readable through the single-resource route.
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/tenants/{}", tenant_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["isSuccess"], true);
    assert_eq!(body["data"][0]["id"], tenant_id.to_string());
}

#[tokio::test]
async fn responses_echo_the_request_correlation_id() {
    let server = MockServer::start().await;
    let app = test_app(&server).await;

    // A caller-supplied id is echoed on the response and lands in the error
    // envelope of a failed operation.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/root")
                .header("x-request-id", "corr-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .unwrap()
            .to_str()
            .unwrap(),
        "corr-42"
    );
    let body = body_json(response).await;
    assert_eq!(body["isSuccess"], false);
    assert_eq!(body["traceId"], "corr-42");

    // Without one, the server assigns a fresh UUID.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/root")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let assigned = response
        .headers()
        .get("x-request-id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(assigned.len(), 36);
    let body = body_json(response).await;
    assert_eq!(body["traceId"], assigned);
}

#[tokio::test]
async fn unknown_input_fields_are_rejected() {
    let server = MockServer::start().await;
    let app = test_app(&server).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/root")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "name": "Root", "bogus": true }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    // axum's Json extractor rejects undeclared keys at the transport level.
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
