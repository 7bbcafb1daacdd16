pub mod handlers;
pub mod items;
pub mod repo;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
