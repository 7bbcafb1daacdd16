use crate::state::AppState;
use axum::Router;

pub mod directory;
pub(crate) mod extractors;
pub mod handlers;
pub mod password;
pub mod session;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
