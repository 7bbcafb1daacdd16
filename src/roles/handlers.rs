use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::repo::{Role, RoleForm};
use crate::{
    auth::extractors::{RequireAdmin, RequireRole},
    error::{internal, is_foreign_key_violation, is_unique_violation, not_found, still_referenced},
    outcome::{Created, Outcome},
    state::AppState,
};

type HandlerResult<T> = Result<T, (StatusCode, String)>;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/roles", get(list_roles).post(create_role))
        .route(
            "/api/roles/:id",
            get(get_role).put(update_role).delete(delete_role),
        )
}

fn role_taken(form: &RoleForm) -> Response {
    (
        StatusCode::CONFLICT,
        Json(Outcome::error(format!(
            "Role [{}] already exists.",
            form.role_name
        ))),
    )
        .into_response()
}

#[instrument(skip(state))]
pub async fn list_roles(
    State(state): State<AppState>,
    RequireRole(admin_id, _): RequireAdmin,
) -> HandlerResult<Json<Vec<Role>>> {
    Ok(Json(Role::get_all(&state.db).await.map_err(internal)?))
}

#[instrument(skip(state))]
pub async fn get_role(
    State(state): State<AppState>,
    RequireRole(admin_id, _): RequireAdmin,
    Path(id): Path<i64>,
) -> HandlerResult<Json<Role>> {
    Role::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("Role"))
}

#[instrument(skip(state))]
pub async fn create_role(
    State(state): State<AppState>,
    RequireRole(admin_id, _): RequireAdmin,
    Json(form): Json<RoleForm>,
) -> HandlerResult<Response> {
    match Role::create(&state.db, &form).await {
        Ok(id) => {
            info!(role_id = id, role_name = %form.role_name, admin_id, "role created");
            Ok((StatusCode::CREATED, Json(Created { id })).into_response())
        }
        Err(e) if is_unique_violation(&e) => Ok(role_taken(&form)),
        Err(e) => Err(internal(e)),
    }
}

#[instrument(skip(state))]
pub async fn update_role(
    State(state): State<AppState>,
    RequireRole(admin_id, _): RequireAdmin,
    Path(id): Path<i64>,
    Json(form): Json<RoleForm>,
) -> HandlerResult<Response> {
    match Role::update(&state.db, id, &form).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT.into_response()),
        Ok(false) => Err(not_found("Role")),
        Err(e) if is_unique_violation(&e) => Ok(role_taken(&form)),
        Err(e) => Err(internal(e)),
    }
}

#[instrument(skip(state))]
pub async fn delete_role(
    State(state): State<AppState>,
    RequireRole(admin_id, _): RequireAdmin,
    Path(id): Path<i64>,
) -> HandlerResult<Response> {
    match Role::delete(&state.db, id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT.into_response()),
        Ok(false) => Err(not_found("Role")),
        Err(e) if is_foreign_key_violation(&e) => Ok(still_referenced("Role")),
        Err(e) => Err(internal(e)),
    }
}
