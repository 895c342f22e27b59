//! Tenant endpoints.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use crate::coordinator::{CreateTenantInput, RequestContext, UpdateTenantInput};
use crate::envelope::OperationResult;
use crate::server::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/tenants",
    request_body = CreateTenantInput,
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "tenants"
)]
pub async fn create(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(input): Json<CreateTenantInput>,
) -> OperationResult {
    state
        .coordinator
        .create_tenant(&ctx, input)
        .await
        .map(|view| OperationResult::success_one("tenant created", view))
        .into()
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants",
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "tenants"
)]
pub async fn list(State(state): State<AppState>, ctx: RequestContext) -> OperationResult {
    state
        .coordinator
        .list_tenants(&ctx)
        .await
        .map(|views| OperationResult::success("tenants", views))
        .into()
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{id}",
    params(("id" = Uuid, Path, description = "Tenant id")),
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "tenants"
)]
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> OperationResult {
    state
        .coordinator
        .get_tenant(id)
        .await
        .map(|view| OperationResult::success_one("tenant", view))
        .into()
}

#[utoipa::path(
    patch,
    path = "/api/v1/tenants/{id}",
    params(("id" = Uuid, Path, description = "Tenant id")),
    request_body = UpdateTenantInput,
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "tenants"
)]
pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTenantInput>,
) -> OperationResult {
    state
        .coordinator
        .update_tenant(&ctx, id, input)
        .await
        .map(|view| OperationResult::success_one("tenant updated", view))
        .into()
}

#[utoipa::path(
    delete,
    path = "/api/v1/tenants/{id}",
    params(("id" = Uuid, Path, description = "Tenant id")),
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "tenants"
)]
pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> OperationResult {
    state
        .coordinator
        .delete_tenant(&ctx, id)
        .await
        .map(|()| OperationResult::success_empty("tenant deleted"))
        .into()
}
