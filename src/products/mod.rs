pub mod dto;
pub mod handlers;
pub mod repo;
pub mod validation;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::page_routes())
        .merge(handlers::api_routes())
}
