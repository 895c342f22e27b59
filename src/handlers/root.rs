//! Root resource endpoints.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use crate::coordinator::{CreateRootInput, RequestContext, UpdateRootInput};
use crate::envelope::OperationResult;
use crate::server::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/root",
    request_body = CreateRootInput,
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "root"
)]
pub async fn create(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(input): Json<CreateRootInput>,
) -> OperationResult {
    state
        .coordinator
        .create_root(&ctx, input)
        .await
        .map(|view| OperationResult::success_one("root created", view))
        .into()
}

#[utoipa::path(
    get,
    path = "/api/v1/root",
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "root"
)]
pub async fn get(State(state): State<AppState>) -> OperationResult {
    state
        .coordinator
        .get_root()
        .await
        .map(|view| OperationResult::success_one("root", view))
        .into()
}

#[utoipa::path(
    patch,
    path = "/api/v1/root/{id}",
    params(("id" = Uuid, Path, description = "Root id")),
    request_body = UpdateRootInput,
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "root"
)]
pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateRootInput>,
) -> OperationResult {
    state
        .coordinator
        .update_root(&ctx, id, input)
        .await
        .map(|view| OperationResult::success_one("root updated", view))
        .into()
}

#[utoipa::path(
    delete,
    path = "/api/v1/root/{id}",
    params(("id" = Uuid, Path, description = "Root id")),
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "root"
)]
pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> OperationResult {
    state
        .coordinator
        .delete_root(&ctx, id)
        .await
        .map(|()| OperationResult::success_empty("root deleted"))
        .into()
}
