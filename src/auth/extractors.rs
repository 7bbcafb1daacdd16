use std::marker::PhantomData;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use tower_sessions::Session;
use tracing::{error, warn};

use super::directory::Directory;
use super::session::SessionContext;
use crate::outcome::Outcome;

/// Why a gated route refused the request.
#[derive(Debug)]
pub enum AuthRejection {
    /// Anonymous session on an `/api` route.
    Unauthenticated,
    /// Anonymous session on a page route; the browser goes back to login.
    LoginRequired,
    Forbidden { required: String },
    Unavailable(String),
}

impl AuthRejection {
    fn for_path(self, path: &str) -> Self {
        match self {
            AuthRejection::Unauthenticated if !path.starts_with("/api/") => {
                AuthRejection::LoginRequired
            }
            other => other,
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            AuthRejection::Unauthenticated | AuthRejection::LoginRequired => {
                Outcome::error("You must be logged in to access this page.")
            }
            AuthRejection::Forbidden { required } => Outcome::error(format!(
                "You don't have permission to access this page: [{required}] role required."
            )),
            AuthRejection::Unavailable(_) => Outcome::error("Session unavailable, try again."),
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = Json(self.outcome());
        match self {
            AuthRejection::LoginRequired => Redirect::to("/").into_response(),
            AuthRejection::Unauthenticated => (StatusCode::UNAUTHORIZED, body).into_response(),
            AuthRejection::Forbidden { required } => {
                warn!(%required, "permission denied");
                (StatusCode::FORBIDDEN, body).into_response()
            }
            AuthRejection::Unavailable(reason) => {
                error!(%reason, "auth check failed");
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

/// The session plus its decoded identity. Never rejects an anonymous visitor.
pub struct AuthSession {
    pub session: Session,
    pub ctx: SessionContext,
}

impl AuthSession {
    pub async fn save(&self) -> Result<(), tower_sessions::session::Error> {
        self.ctx.save(&self.session).await
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AuthRejection::Unavailable(msg.to_string()))?;
        let ctx = SessionContext::load(&session)
            .await
            .map_err(|e| AuthRejection::Unavailable(e.to_string()))?;
        Ok(Self { session, ctx })
    }
}

/// Requires an authenticated session, yielding the user id.
pub struct RequireAuth(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthSession::from_request_parts(parts, state).await?;
        auth.ctx
            .require_authenticated()
            .map(RequireAuth)
            .map_err(|r| r.for_path(parts.uri.path()))
    }
}

pub trait RoleName {
    const NAME: &'static str;
}

pub struct Admin;

impl RoleName for Admin {
    const NAME: &'static str = "admin";
}

/// Requires a session whose role is named `R::NAME`, yielding the user id.
pub struct RequireRole<R>(pub i64, pub PhantomData<R>);

pub type RequireAdmin = RequireRole<Admin>;

#[async_trait]
impl<S, R> FromRequestParts<S> for RequireRole<R>
where
    S: Send + Sync,
    R: RoleName,
    Arc<dyn Directory>: FromRef<S>,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthSession::from_request_parts(parts, state).await?;
        let directory = <Arc<dyn Directory> as FromRef<S>>::from_ref(state);
        auth.ctx
            .require_role(directory.as_ref(), R::NAME)
            .await
            .map(|user_id| RequireRole(user_id, PhantomData))
            .map_err(|r| r.for_path(parts.uri.path()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Category;

    #[test]
    fn unauthenticated_page_request_redirects() {
        let rejection = AuthRejection::Unauthenticated.for_path("/dashboard");
        assert!(matches!(rejection, AuthRejection::LoginRequired));
        let res = rejection.into_response();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
    }

    #[test]
    fn unauthenticated_api_request_is_401() {
        let rejection = AuthRejection::Unauthenticated.for_path("/api/products");
        assert_eq!(rejection.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn forbidden_carries_error_outcome() {
        let rejection = AuthRejection::Forbidden {
            required: "admin".into(),
        };
        let outcome = rejection.outcome();
        assert_eq!(outcome.category, Category::Error);
        assert!(outcome.messages[0].contains("permission"));
        assert_eq!(rejection.into_response().status(), StatusCode::FORBIDDEN);
    }
}
