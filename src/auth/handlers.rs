use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use super::directory::UserLookup;
use super::extractors::{AuthSession, RequireAuth};
use super::session::AuthError;
use crate::{
    error::{internal, is_unique_violation, not_found},
    outcome::Outcome,
    roles::repo::Role,
    state::AppState,
    users::{
        dto::{LoginRequest, NewUser, PublicUser, RegisterRequest},
        repo::{username_taken_message, User},
    },
};

type HandlerResult<T> = Result<T, (StatusCode, String)>;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/dashboard", get(dashboard))
}

fn auth_failure(e: AuthError) -> (StatusCode, String) {
    error!(error = %e, "session update failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".into(),
    )
}

fn session_failure(e: tower_sessions::session::Error) -> (StatusCode, String) {
    auth_failure(AuthError::Session(e))
}

#[instrument(skip(auth))]
pub async fn index(auth: AuthSession) -> Json<Value> {
    Json(json!({ "authenticated": auth.ctx.is_authenticated() }))
}

#[instrument(skip(state, auth, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    mut auth: AuthSession,
    Json(payload): Json<LoginRequest>,
) -> HandlerResult<(StatusCode, Json<Outcome>)> {
    if auth.ctx.is_authenticated() {
        return Ok((StatusCode::OK, Json(Outcome::success_with("Already logged in."))));
    }

    let outcome = User::validate_login(&state.db, &payload)
        .await
        .map_err(internal)?;
    if !outcome.is_success() {
        warn!("login rejected");
        return Ok((StatusCode::UNAUTHORIZED, Json(outcome)));
    }

    let user_id = auth
        .ctx
        .authenticate(
            state.directory.as_ref(),
            UserLookup::Username(payload.username.clone()),
        )
        .await
        .map_err(auth_failure)?;
    auth.session.cycle_id().await.map_err(session_failure)?;
    auth.save().await.map_err(session_failure)?;

    info!(user_id, "logged in");
    Ok((StatusCode::OK, Json(Outcome::success_with("Logged in."))))
}

#[instrument(skip(state, auth, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    mut auth: AuthSession,
    Json(payload): Json<RegisterRequest>,
) -> HandlerResult<(StatusCode, Json<Outcome>)> {
    let outcome = User::validate_register(&state.db, &payload)
        .await
        .map_err(internal)?;
    if !outcome.is_success() {
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(outcome)));
    }

    let role = Role::get_by_name(&state.db, &state.config.default_role)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            internal(anyhow::anyhow!(
                "default role [{}] is not seeded",
                state.config.default_role
            ))
        })?;

    let new_user = NewUser {
        username: payload.username.clone(),
        password: payload.password,
        role_id: role.id,
    };
    let user_id = match User::register(&state.db, &new_user).await {
        Ok(id) => id,
        Err(e) if is_unique_violation(&e) => {
            warn!("username lost insert race");
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(Outcome::error(username_taken_message(&new_user.username))),
            ));
        }
        Err(e) => return Err(internal(e)),
    };

    auth.ctx
        .authenticate(state.directory.as_ref(), UserLookup::Id(user_id))
        .await
        .map_err(auth_failure)?;
    auth.session.cycle_id().await.map_err(session_failure)?;
    auth.save().await.map_err(session_failure)?;

    info!(user_id, role = %role.role_name, "self-registered");
    Ok((
        StatusCode::CREATED,
        Json(Outcome::success_with(format!(
            "Account [{}] created.",
            new_user.username
        ))),
    ))
}

/// Safe to call on an anonymous session.
#[instrument(skip(auth))]
pub async fn logout(mut auth: AuthSession) -> HandlerResult<Json<Outcome>> {
    auth.ctx.clear_authentication();
    auth.save().await.map_err(session_failure)?;
    Ok(Json(Outcome::success_with("Logged out.")))
}

#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
) -> HandlerResult<Json<PublicUser>> {
    let user = User::get_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("User"))?;
    Ok(Json(PublicUser::from(&user)))
}
