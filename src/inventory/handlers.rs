use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::repo::{Inventory, InventoryForm};
use crate::{
    auth::extractors::RequireAuth,
    error::{internal, is_foreign_key_violation, not_found, unknown_reference},
    outcome::{Created, Outcome},
    state::AppState,
};

type HandlerResult<T> = Result<T, (StatusCode, String)>;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/inventory", get(list_inventory).post(create_inventory))
        .route(
            "/api/inventory/:id",
            get(get_inventory)
                .put(update_inventory)
                .delete(delete_inventory),
        )
}

fn validate_quantity(form: &InventoryForm) -> Option<Response> {
    (form.quantity < 0).then(|| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(Outcome::error("Quantity must not be negative.")),
        )
            .into_response()
    })
}

#[instrument(skip(state))]
pub async fn list_inventory(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
) -> HandlerResult<Json<Vec<Inventory>>> {
    Ok(Json(Inventory::get_all(&state.db).await.map_err(internal)?))
}

#[instrument(skip(state))]
pub async fn get_inventory(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
    Path(id): Path<i64>,
) -> HandlerResult<Json<Inventory>> {
    Inventory::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("Inventory item"))
}

#[instrument(skip(state))]
pub async fn create_inventory(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
    Json(form): Json<InventoryForm>,
) -> HandlerResult<Response> {
    if let Some(rejected) = validate_quantity(&form) {
        return Ok(rejected);
    }
    match Inventory::create(&state.db, &form).await {
        Ok(id) => {
            info!(inventory_id = id, product_id = form.product_id, "inventory created");
            Ok((StatusCode::CREATED, Json(Created { id })).into_response())
        }
        Err(e) if is_foreign_key_violation(&e) => Ok(unknown_reference("Inventory item")),
        Err(e) => Err(internal(e)),
    }
}

#[instrument(skip(state))]
pub async fn update_inventory(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
    Path(id): Path<i64>,
    Json(form): Json<InventoryForm>,
) -> HandlerResult<Response> {
    if let Some(rejected) = validate_quantity(&form) {
        return Ok(rejected);
    }
    match Inventory::update(&state.db, id, &form).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT.into_response()),
        Ok(false) => Err(not_found("Inventory item")),
        Err(e) if is_foreign_key_violation(&e) => Ok(unknown_reference("Inventory item")),
        Err(e) => Err(internal(e)),
    }
}

#[instrument(skip(state))]
pub async fn delete_inventory(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
    Path(id): Path<i64>,
) -> HandlerResult<StatusCode> {
    match Inventory::delete(&state.db, id).await.map_err(internal)? {
        true => Ok(StatusCode::NO_CONTENT),
        false => Err(not_found("Inventory item")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_quantity_is_rejected() {
        let res = validate_quantity(&InventoryForm {
            quantity: -1,
            product_id: 1,
        })
        .expect("rejected");
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(validate_quantity(&InventoryForm {
            quantity: 0,
            product_id: 1
        })
        .is_none());
    }
}
