use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, instrument};

use super::items::{OrderItem, OrderItemForm};
use super::repo::Order;
use crate::{
    auth::extractors::RequireAuth,
    error::{internal, is_foreign_key_violation, not_found, unknown_reference},
    outcome::{Created, Outcome},
    state::AppState,
};

type HandlerResult<T> = Result<T, (StatusCode, String)>;

/// Purchaser of an order; defaults to the signed-in user.
#[derive(Debug, Deserialize)]
pub struct OrderForm {
    pub user_id: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list_orders).post(create_order))
        .route(
            "/api/orders/:id",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/api/order-items", get(list_items).post(create_item))
        .route(
            "/api/order-items/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
}

#[instrument(skip(state))]
pub async fn list_orders(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
) -> HandlerResult<Json<Vec<Order>>> {
    Ok(Json(Order::get_all(&state.db).await.map_err(internal)?))
}

#[instrument(skip(state))]
pub async fn get_order(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
    Path(id): Path<i64>,
) -> HandlerResult<Json<Order>> {
    Order::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("Order"))
}

#[instrument(skip(state))]
pub async fn create_order(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
    Json(form): Json<OrderForm>,
) -> HandlerResult<Response> {
    let purchaser = form.user_id.unwrap_or(user_id);
    match Order::create(&state.db, purchaser).await {
        Ok(id) => {
            info!(order_id = id, purchaser, "order created");
            Ok((StatusCode::CREATED, Json(Created { id })).into_response())
        }
        Err(e) if is_foreign_key_violation(&e) => Ok(unknown_reference("Order")),
        Err(e) => Err(internal(e)),
    }
}

#[instrument(skip(state))]
pub async fn update_order(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
    Path(id): Path<i64>,
    Json(form): Json<OrderForm>,
) -> HandlerResult<Response> {
    let purchaser = form.user_id.unwrap_or(user_id);
    match Order::update(&state.db, id, purchaser).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT.into_response()),
        Ok(false) => Err(not_found("Order")),
        Err(e) if is_foreign_key_violation(&e) => Ok(unknown_reference("Order")),
        Err(e) => Err(internal(e)),
    }
}

#[instrument(skip(state))]
pub async fn delete_order(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
    Path(id): Path<i64>,
) -> HandlerResult<StatusCode> {
    match Order::delete(&state.db, id).await.map_err(internal)? {
        true => Ok(StatusCode::NO_CONTENT),
        false => Err(not_found("Order")),
    }
}

#[instrument(skip(state))]
pub async fn list_items(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
) -> HandlerResult<Json<Vec<OrderItem>>> {
    Ok(Json(OrderItem::get_all(&state.db).await.map_err(internal)?))
}

#[instrument(skip(state))]
pub async fn get_item(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
    Path(id): Path<i64>,
) -> HandlerResult<Json<OrderItem>> {
    OrderItem::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("Order item"))
}

fn invalid_quantity(form: &OrderItemForm) -> Option<Response> {
    (form.quantity <= 0).then(|| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(Outcome::error("Quantity must be greater than 0.")),
        )
            .into_response()
    })
}

#[instrument(skip(state))]
pub async fn create_item(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
    Json(form): Json<OrderItemForm>,
) -> HandlerResult<Response> {
    if let Some(rejected) = invalid_quantity(&form) {
        return Ok(rejected);
    }
    match OrderItem::create(&state.db, &form).await {
        Ok(id) => {
            info!(order_item_id = id, order_id = form.order_id, "order item created");
            Ok((StatusCode::CREATED, Json(Created { id })).into_response())
        }
        Err(e) if is_foreign_key_violation(&e) => Ok(unknown_reference("Order item")),
        Err(e) => Err(internal(e)),
    }
}

#[instrument(skip(state))]
pub async fn update_item(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
    Path(id): Path<i64>,
    Json(form): Json<OrderItemForm>,
) -> HandlerResult<Response> {
    if let Some(rejected) = invalid_quantity(&form) {
        return Ok(rejected);
    }
    match OrderItem::update(&state.db, id, &form).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT.into_response()),
        Ok(false) => Err(not_found("Order item")),
        Err(e) if is_foreign_key_violation(&e) => Ok(unknown_reference("Order item")),
        Err(e) => Err(internal(e)),
    }
}

#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
    Path(id): Path<i64>,
) -> HandlerResult<StatusCode> {
    match OrderItem::delete(&state.db, id).await.map_err(internal)? {
        true => Ok(StatusCode::NO_CONTENT),
        false => Err(not_found("Order item")),
    }
}
