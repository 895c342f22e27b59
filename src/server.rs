//! Server setup: router, shared state and OpenAPI documentation.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::coordinator::Coordinator;
use crate::handlers;
use crate::telemetry::{self, TraceContext};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Give every request a correlation id (the caller's `x-request-id` when
/// present), scope the trace context around the handler and echo the id on
/// the response.
async fn trace_context(request: Request, next: Next) -> Response {
    let trace_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let context = TraceContext {
        trace_id: trace_id.clone(),
    };

    let mut response = telemetry::with_trace_context(context, next.run(request)).await;
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub coordinator: Coordinator,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::service_info))
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/tenants",
            get(handlers::tenants::list).post(handlers::tenants::create),
        )
        .route(
            "/api/v1/tenants/{id}",
            get(handlers::tenants::get)
                .patch(handlers::tenants::update)
                .delete(handlers::tenants::delete),
        )
        .route(
            "/api/v1/accounts",
            get(handlers::accounts::list).post(handlers::accounts::create),
        )
        .route(
            "/api/v1/accounts/{id}",
            get(handlers::accounts::get)
                .patch(handlers::accounts::update)
                .delete(handlers::accounts::delete),
        )
        .route(
            "/api/v1/client-org-units",
            get(handlers::org_units::list).post(handlers::org_units::create),
        )
        .route(
            "/api/v1/client-org-units/{id}",
            get(handlers::org_units::get)
                .patch(handlers::org_units::update)
                .delete(handlers::org_units::delete),
        )
        .route(
            "/api/v1/roles",
            get(handlers::roles::list).post(handlers::roles::create),
        )
        .route(
            "/api/v1/roles/assignable/{scopeId}",
            get(handlers::roles::assignable),
        )
        .route(
            "/api/v1/roles/{id}",
            get(handlers::roles::get)
                .patch(handlers::roles::update)
                .delete(handlers::roles::delete),
        )
        .route(
            "/api/v1/permissions",
            get(handlers::permissions::list).post(handlers::permissions::create),
        )
        .route(
            "/api/v1/permissions/{id}",
            get(handlers::permissions::get)
                .patch(handlers::permissions::update)
                .delete(handlers::permissions::delete),
        )
        .route(
            "/api/v1/bindings",
            get(handlers::bindings::list).post(handlers::bindings::create),
        )
        .route(
            "/api/v1/bindings/{id}",
            get(handlers::bindings::get)
                .patch(handlers::bindings::update)
                .delete(handlers::bindings::delete),
        )
        .route(
            "/api/v1/root",
            get(handlers::root::get).post(handlers::root::create),
        )
        .route(
            "/api/v1/root/{id}",
            axum::routing::patch(handlers::root::update).delete(handlers::root::delete),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(trace_context))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_app(state);

    let addr = config
        .socket_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile = %config.profile, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::service_info,
        crate::handlers::health,
        crate::handlers::tenants::create,
        crate::handlers::tenants::list,
        crate::handlers::tenants::get,
        crate::handlers::tenants::update,
        crate::handlers::tenants::delete,
        crate::handlers::accounts::create,
        crate::handlers::accounts::list,
        crate::handlers::accounts::get,
        crate::handlers::accounts::update,
        crate::handlers::accounts::delete,
        crate::handlers::org_units::create,
        crate::handlers::org_units::list,
        crate::handlers::org_units::get,
        crate::handlers::org_units::update,
        crate::handlers::org_units::delete,
        crate::handlers::roles::create,
        crate::handlers::roles::list,
        crate::handlers::roles::assignable,
        crate::handlers::roles::get,
        crate::handlers::roles::update,
        crate::handlers::roles::delete,
        crate::handlers::permissions::create,
        crate::handlers::permissions::list,
        crate::handlers::permissions::get,
        crate::handlers::permissions::update,
        crate::handlers::permissions::delete,
        crate::handlers::bindings::create,
        crate::handlers::bindings::list,
        crate::handlers::bindings::get,
        crate::handlers::bindings::update,
        crate::handlers::bindings::delete,
        crate::handlers::root::create,
        crate::handlers::root::get,
        crate::handlers::root::update,
        crate::handlers::root::delete,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::envelope::OperationResult,
            crate::envelope::SuccessEnvelope,
            crate::envelope::ErrorEnvelope,
            crate::projection::ResourceView,
            crate::projection::Organization,
            crate::projection::Principal,
            crate::coordinator::CreateTenantInput,
            crate::coordinator::UpdateTenantInput,
            crate::coordinator::CreateAccountInput,
            crate::coordinator::UpdateAccountInput,
            crate::coordinator::CreateOrgUnitInput,
            crate::coordinator::UpdateOrgUnitInput,
            crate::coordinator::CreateRoleInput,
            crate::coordinator::UpdateRoleInput,
            crate::coordinator::CreatePermissionInput,
            crate::coordinator::UpdatePermissionInput,
            crate::coordinator::CreateBindingInput,
            crate::coordinator::UpdateBindingInput,
            crate::coordinator::CreateRootInput,
            crate::coordinator::UpdateRootInput,
        )
    ),
    info(
        title = "IAM Registry API",
        description = "Identity and access management over a hierarchical resource graph",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
