//! Account endpoints.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use crate::coordinator::{CreateAccountInput, RequestContext, UpdateAccountInput};
use crate::envelope::OperationResult;
use crate::server::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    request_body = CreateAccountInput,
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "accounts"
)]
pub async fn create(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(input): Json<CreateAccountInput>,
) -> OperationResult {
    state
        .coordinator
        .create_account(&ctx, input)
        .await
        .map(|view| OperationResult::success_one("account created", view))
        .into()
}

#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "accounts"
)]
pub async fn list(State(state): State<AppState>, ctx: RequestContext) -> OperationResult {
    state
        .coordinator
        .all_accounts(&ctx)
        .await
        .map(|views| OperationResult::success("accounts", views))
        .into()
}

#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}",
    params(("id" = Uuid, Path, description = "Account id")),
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "accounts"
)]
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> OperationResult {
    state
        .coordinator
        .get_account(id)
        .await
        .map(|view| OperationResult::success_one("account", view))
        .into()
}

#[utoipa::path(
    patch,
    path = "/api/v1/accounts/{id}",
    params(("id" = Uuid, Path, description = "Account id")),
    request_body = UpdateAccountInput,
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "accounts"
)]
pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateAccountInput>,
) -> OperationResult {
    state
        .coordinator
        .update_account(&ctx, id, input)
        .await
        .map(|view| OperationResult::success_one("account updated", view))
        .into()
}

#[utoipa::path(
    delete,
    path = "/api/v1/accounts/{id}",
    params(("id" = Uuid, Path, description = "Account id")),
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "accounts"
)]
pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> OperationResult {
    state
        .coordinator
        .delete_account(&ctx, id)
        .await
        .map(|()| OperationResult::success_empty("account deleted"))
        .into()
}
