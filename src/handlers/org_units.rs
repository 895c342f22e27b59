//! Client organization unit endpoints.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use crate::coordinator::{CreateOrgUnitInput, RequestContext, UpdateOrgUnitInput};
use crate::envelope::OperationResult;
use crate::server::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/client-org-units",
    request_body = CreateOrgUnitInput,
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "client-org-units"
)]
pub async fn create(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(input): Json<CreateOrgUnitInput>,
) -> OperationResult {
    state
        .coordinator
        .create_org_unit(&ctx, input)
        .await
        .map(|view| OperationResult::success_one("client organization unit created", view))
        .into()
}

#[utoipa::path(
    get,
    path = "/api/v1/client-org-units",
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "client-org-units"
)]
pub async fn list(State(state): State<AppState>, ctx: RequestContext) -> OperationResult {
    state
        .coordinator
        .all_org_units(&ctx)
        .await
        .map(|views| OperationResult::success("client organization units", views))
        .into()
}

#[utoipa::path(
    get,
    path = "/api/v1/client-org-units/{id}",
    params(("id" = Uuid, Path, description = "Organization unit id")),
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "client-org-units"
)]
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> OperationResult {
    state
        .coordinator
        .get_org_unit(id)
        .await
        .map(|view| OperationResult::success_one("client organization unit", view))
        .into()
}

#[utoipa::path(
    patch,
    path = "/api/v1/client-org-units/{id}",
    params(("id" = Uuid, Path, description = "Organization unit id")),
    request_body = UpdateOrgUnitInput,
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "client-org-units"
)]
pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateOrgUnitInput>,
) -> OperationResult {
    state
        .coordinator
        .update_org_unit(&ctx, id, input)
        .await
        .map(|view| OperationResult::success_one("client organization unit updated", view))
        .into()
}

#[utoipa::path(
    delete,
    path = "/api/v1/client-org-units/{id}",
    params(("id" = Uuid, Path, description = "Organization unit id")),
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "client-org-units"
)]
pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> OperationResult {
    state
        .coordinator
        .delete_org_unit(&ctx, id)
        .await
        .map(|()| OperationResult::success_empty("client organization unit deleted"))
        .into()
}
