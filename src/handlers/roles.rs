//! Role endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::coordinator::{CreateRoleInput, RequestContext, UpdateRoleInput};
use crate::envelope::OperationResult;
use crate::error::CoreError;
use crate::server::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct RoleListQuery {
    /// Restrict the listing to roles assignable at exactly this scope.
    pub scope: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AssignableRolesQuery {
    /// Comma-separated role ids to leave out of the result.
    pub exclude_ids: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/roles",
    request_body = CreateRoleInput,
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "roles"
)]
pub async fn create(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(input): Json<CreateRoleInput>,
) -> OperationResult {
    state
        .coordinator
        .create_role(&ctx, input)
        .await
        .map(|view| OperationResult::success_one("role created", view))
        .into()
}

#[utoipa::path(
    get,
    path = "/api/v1/roles",
    params(RoleListQuery),
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "roles"
)]
pub async fn list(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<RoleListQuery>,
) -> OperationResult {
    state
        .coordinator
        .all_roles(&ctx, query.scope)
        .await
        .map(|views| OperationResult::success("roles", views))
        .into()
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/assignable/{scopeId}",
    params(
        ("scopeId" = Uuid, Path, description = "Scope resource id"),
        AssignableRolesQuery
    ),
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "roles"
)]
pub async fn assignable(
    State(state): State<AppState>,
    Path(scope_id): Path<Uuid>,
    Query(query): Query<AssignableRolesQuery>,
) -> OperationResult {
    let exclude_ids = match parse_id_list(query.exclude_ids.as_deref()) {
        Ok(ids) => ids,
        Err(err) => return err.into(),
    };
    state
        .coordinator
        .roles_for_assignable_scope(scope_id, &exclude_ids)
        .await
        .map(|views| OperationResult::success("assignable roles", views))
        .into()
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/{id}",
    params(("id" = Uuid, Path, description = "Role id")),
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "roles"
)]
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> OperationResult {
    state
        .coordinator
        .get_role(id)
        .await
        .map(|view| OperationResult::success_one("role", view))
        .into()
}

#[utoipa::path(
    patch,
    path = "/api/v1/roles/{id}",
    params(("id" = Uuid, Path, description = "Role id")),
    request_body = UpdateRoleInput,
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "roles"
)]
pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateRoleInput>,
) -> OperationResult {
    state
        .coordinator
        .update_role(&ctx, id, input)
        .await
        .map(|view| OperationResult::success_one("role updated", view))
        .into()
}

#[utoipa::path(
    delete,
    path = "/api/v1/roles/{id}",
    params(("id" = Uuid, Path, description = "Role id")),
    responses((status = 200, description = "Operation outcome", body = OperationResult)),
    tag = "roles"
)]
pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> OperationResult {
    state
        .coordinator
        .delete_role(&ctx, id)
        .await
        .map(|()| OperationResult::success_empty("role deleted"))
        .into()
}

fn parse_id_list(raw: Option<&str>) -> Result<Vec<Uuid>, CoreError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse()
                .map_err(|_| CoreError::validation(format!("invalid id in excludeIds: {}", part)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_parses_and_trims() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let raw = format!("{} , {}", a, b);
        assert_eq!(parse_id_list(Some(&raw)).unwrap(), vec![a, b]);
        assert!(parse_id_list(None).unwrap().is_empty());
        assert!(parse_id_list(Some("nope")).is_err());
    }
}
