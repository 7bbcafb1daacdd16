use axum::{extract::Host, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HostInfo {
    pub host: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/utils/host", get(host))
}

/// Host the client addressed, as seen by the server.
pub async fn host(Host(host): Host) -> Json<HostInfo> {
    Json(HostInfo { host })
}
