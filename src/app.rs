use std::net::SocketAddr;

use anyhow::Context;
use axum::{routing::get, Router};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::{
    cookie::SameSite, ExpiredDeletion, Expiry, SessionManagerLayer, SessionStore,
};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::SessionConfig;
use crate::state::AppState;
use crate::{auth, inventory, orders, products, roles, users, utils};

pub const SESSION_COOKIE_NAME: &str = "shop_admin_session";

const EXPIRED_SESSION_SWEEP: tokio::time::Duration = tokio::time::Duration::from_secs(60);

/// Postgres-backed session store on the app pool, with its table created
/// and a background task deleting expired sessions.
pub async fn session_store(db: &PgPool) -> anyhow::Result<PostgresStore> {
    let store = PostgresStore::new(db.clone());
    store.migrate().await.context("migrate session store")?;

    let sweeper = store.clone();
    tokio::spawn(async move {
        if let Err(e) = sweeper
            .continuously_delete_expired(EXPIRED_SESSION_SWEEP)
            .await
        {
            tracing::error!(error = %e, "expired session sweep stopped");
        }
    });

    Ok(store)
}

fn session_layer<S>(store: S, config: &SessionConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::minutes(config.ttl_minutes),
        ))
        .with_secure(config.secure_cookie)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

pub fn build_app<S>(state: AppState, store: S) -> Router
where
    S: SessionStore + Clone,
{
    let sessions = session_layer(store, &state.config.session);

    Router::new()
        .merge(auth::router())
        .merge(products::router())
        .merge(roles::router())
        .merge(users::router())
        .merge(inventory::router())
        .merge(orders::router())
        .merge(utils::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(sessions)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = addr.parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    use std::sync::Arc;

    use tower_sessions::{MemoryStore, Session};

    use super::*;
    use crate::auth::directory::FakeDirectory;
    use crate::auth::session::SessionContext;
    use crate::outcome::{Category, Outcome};

    fn app_with(store: MemoryStore) -> Router {
        build_app(
            AppState::fake(
                FakeDirectory::new()
                    .with_role(1, "admin")
                    .with_role(2, "customer")
                    .with_user(10, "root", 1)
                    .with_user(11, "alice", 2),
            ),
            store,
        )
    }

    fn app() -> Router {
        app_with(MemoryStore::default())
    }

    /// Stores a signed-in session and returns the `Cookie` header for it.
    async fn signed_in(store: &MemoryStore, user_id: i64, role_id: i64) -> String {
        let session = Session::new(None, Arc::new(store.clone()), None);
        SessionContext {
            user_id: Some(user_id),
            role_id: Some(role_id),
        }
        .save(&session)
        .await
        .unwrap();
        session.save().await.unwrap();
        let id = session.id().expect("saved session has an id");
        format!("{SESSION_COOKIE_NAME}={id}")
    }

    async fn body_json<T: serde::de::DeserializeOwned>(res: axum::response::Response) -> T {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let res = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn utils_host_echoes_host_header() {
        let res = app()
            .oneshot(
                Request::get("/utils/host")
                    .header(header::HOST, "shop.example:8080")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json: serde_json::Value = body_json(res).await;
        assert_eq!(json["host"], "shop.example:8080");
    }

    #[tokio::test]
    async fn index_reports_anonymous_session() {
        let res = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json: serde_json::Value = body_json(res).await;
        assert_eq!(json["authenticated"], false);
    }

    #[tokio::test]
    async fn dashboard_without_session_redirects_to_login() {
        let res = app()
            .oneshot(Request::get("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "/");
    }

    #[tokio::test]
    async fn api_without_session_is_unauthorized() {
        let res = app()
            .oneshot(Request::get("/api/products").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let outcome: Outcome = body_json(res).await;
        assert_eq!(outcome.category, Category::Error);
    }

    #[tokio::test]
    async fn admin_api_without_session_is_unauthorized() {
        let res = app()
            .oneshot(Request::get("/api/roles").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let app = app();
        for _ in 0..2 {
            let res = app
                .clone()
                .oneshot(Request::post("/logout").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
            let outcome: Outcome = body_json(res).await;
            assert!(outcome.is_success());
        }
    }

    #[tokio::test]
    async fn customer_is_forbidden_from_admin_api() {
        let store = MemoryStore::default();
        let cookie = signed_in(&store, 11, 2).await;
        let res = app_with(store)
            .oneshot(
                Request::get("/api/roles")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let outcome: Outcome = body_json(res).await;
        assert_eq!(outcome.category, Category::Error);
        assert!(outcome.messages[0].contains("[admin]"));
    }

    #[tokio::test]
    async fn product_page_with_zero_rows_is_bad_request() {
        let store = MemoryStore::default();
        let cookie = signed_in(&store, 10, 1).await;
        let res = app_with(store)
            .oneshot(
                Request::post("/products/page")
                    .header(header::COOKIE, cookie)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"page_number":0,"rows_per_page":0}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
