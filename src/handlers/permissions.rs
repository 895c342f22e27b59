//! Permission endpoints.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use crate::coordinator::{CreatePermissionInput, RequestContext, UpdatePermissionInput};
use crate::envelope::OperationResult;
use crate::server::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/permissions",
    request_body = CreatePermissionInput,
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "permissions"
)]
pub async fn create(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(input): Json<CreatePermissionInput>,
) -> OperationResult {
    state
        .coordinator
        .create_permission(&ctx, input)
        .await
        .map(|view| OperationResult::success_one("permission created", view))
        .into()
}

#[utoipa::path(
    get,
    path = "/api/v1/permissions",
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "permissions"
)]
pub async fn list(State(state): State<AppState>) -> OperationResult {
    state
        .coordinator
        .all_permissions()
        .await
        .map(|views| OperationResult::success("permissions", views))
        .into()
}

#[utoipa::path(
    get,
    path = "/api/v1/permissions/{id}",
    params(("id" = Uuid, Path, description = "Permission id")),
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "permissions"
)]
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> OperationResult {
    state
        .coordinator
        .get_permission(id)
        .await
        .map(|view| OperationResult::success_one("permission", view))
        .into()
}

#[utoipa::path(
    patch,
    path = "/api/v1/permissions/{id}",
    params(("id" = Uuid, Path, description = "Permission id")),
    request_body = UpdatePermissionInput,
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "permissions"
)]
pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePermissionInput>,
) -> OperationResult {
    state
        .coordinator
        .update_permission(&ctx, id, input)
        .await
        .map(|view| OperationResult::success_one("permission updated", view))
        .into()
}

#[utoipa::path(
    delete,
    path = "/api/v1/permissions/{id}",
    params(("id" = Uuid, Path, description = "Permission id")),
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "permissions"
)]
pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> OperationResult {
    state
        .coordinator
        .delete_permission(&ctx, id)
        .await
        .map(|()| OperationResult::success_empty("permission deleted"))
        .into()
}
