//! HTTP endpoint handlers.
//!
//! Every resource endpoint answers HTTP 200 with an
//! [`OperationResult`](crate::envelope::OperationResult) envelope; the
//! envelope itself carries success or failure.

use axum::extract::State;
use axum::response::Json;

use crate::models::ServiceInfo;
use crate::server::AppState;

pub mod accounts;
pub mod bindings;
pub mod org_units;
pub mod permissions;
pub mod roles;
pub mod root;
pub mod tenants;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "service"
)]
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness probe covering the database pool.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Database unreachable")
    ),
    tag = "service"
)]
pub async fn health(State(state): State<AppState>) -> axum::http::StatusCode {
    match crate::db::health_check(&state.db).await {
        Ok(()) => axum::http::StatusCode::OK,
        Err(err) => {
            tracing::error!(error = %err, "health check failed");
            axum::http::StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
