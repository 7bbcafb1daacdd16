use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{NewUser, UserUpdate};
use super::repo::{username_taken_message, User};
use crate::{
    auth::extractors::{RequireAdmin, RequireRole},
    error::{
        internal, is_foreign_key_violation, is_unique_violation, not_found, still_referenced,
        unknown_reference,
    },
    outcome::{Created, Outcome},
    state::AppState,
};

type HandlerResult<T> = Result<T, (StatusCode, String)>;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

fn username_taken(username: &str) -> Response {
    (
        StatusCode::CONFLICT,
        Json(Outcome::error(username_taken_message(username))),
    )
        .into_response()
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    RequireRole(admin_id, _): RequireAdmin,
) -> HandlerResult<Json<Vec<User>>> {
    Ok(Json(User::get_all(&state.db).await.map_err(internal)?))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    RequireRole(admin_id, _): RequireAdmin,
    Path(id): Path<i64>,
) -> HandlerResult<Json<User>> {
    User::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("User"))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    RequireRole(admin_id, _): RequireAdmin,
    Json(payload): Json<NewUser>,
) -> HandlerResult<Response> {
    if User::get_by_username(&state.db, &payload.username)
        .await
        .map_err(internal)?
        .is_some()
    {
        return Ok(username_taken(&payload.username));
    }
    match User::register(&state.db, &payload).await {
        Ok(id) => {
            info!(user_id = id, username = %payload.username, admin_id, "user created by admin");
            Ok((StatusCode::CREATED, Json(Created { id })).into_response())
        }
        Err(e) if is_unique_violation(&e) => Ok(username_taken(&payload.username)),
        Err(e) if is_foreign_key_violation(&e) => Ok(unknown_reference("User")),
        Err(e) => Err(internal(e)),
    }
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    RequireRole(admin_id, _): RequireAdmin,
    Path(id): Path<i64>,
    Json(payload): Json<UserUpdate>,
) -> HandlerResult<Response> {
    match User::update(&state.db, id, &payload).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT.into_response()),
        Ok(false) => Err(not_found("User")),
        Err(e) if is_unique_violation(&e) => Ok(username_taken(&payload.username)),
        Err(e) if is_foreign_key_violation(&e) => Ok(unknown_reference("User")),
        Err(e) => Err(internal(e)),
    }
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireRole(admin_id, _): RequireAdmin,
    Path(id): Path<i64>,
) -> HandlerResult<Response> {
    match User::delete(&state.db, id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT.into_response()),
        Ok(false) => Err(not_found("User")),
        Err(e) if is_foreign_key_violation(&e) => Ok(still_referenced("User")),
        Err(e) => Err(internal(e)),
    }
}
