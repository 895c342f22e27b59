//! Binding endpoints.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use crate::coordinator::{CreateBindingInput, RequestContext, UpdateBindingInput};
use crate::envelope::OperationResult;
use crate::server::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/bindings",
    request_body = CreateBindingInput,
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "bindings"
)]
pub async fn create(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(input): Json<CreateBindingInput>,
) -> OperationResult {
    state
        .coordinator
        .create_binding(&ctx, input)
        .await
        .map(|view| OperationResult::success_one("binding created", view))
        .into()
}

#[utoipa::path(
    get,
    path = "/api/v1/bindings",
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "bindings"
)]
pub async fn list(State(state): State<AppState>, ctx: RequestContext) -> OperationResult {
    state
        .coordinator
        .bindings(&ctx)
        .await
        .map(|views| OperationResult::success("bindings", views))
        .into()
}

#[utoipa::path(
    get,
    path = "/api/v1/bindings/{id}",
    params(("id" = Uuid, Path, description = "Binding id")),
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "bindings"
)]
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> OperationResult {
    state
        .coordinator
        .get_binding(id)
        .await
        .map(|view| OperationResult::success_one("binding", view))
        .into()
}

#[utoipa::path(
    patch,
    path = "/api/v1/bindings/{id}",
    params(("id" = Uuid, Path, description = "Binding id")),
    request_body = UpdateBindingInput,
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "bindings"
)]
pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateBindingInput>,
) -> OperationResult {
    state
        .coordinator
        .update_binding(&ctx, id, input)
        .await
        .map(|view| OperationResult::success_one("binding updated", view))
        .into()
}

#[utoipa::path(
    delete,
    path = "/api/v1/bindings/{id}",
    params(("id" = Uuid, Path, description = "Binding id")),
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "bindings"
)]
pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> OperationResult {
    state
        .coordinator
        .delete_binding(&ctx, id)
        .await
        .map(|()| OperationResult::success_empty("binding deleted"))
        .into()
}
