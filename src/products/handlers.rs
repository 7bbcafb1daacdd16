use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use super::dto::{ProductForm, ReferenceCheck};
use super::repo::Product;
use super::validation::{reference_taken_message, validate_product};
use crate::{
    auth::extractors::RequireAuth,
    error::{internal, is_foreign_key_violation, is_unique_violation, not_found, still_referenced},
    outcome::Outcome,
    pagination::{Page, PageRequest},
    state::AppState,
};

type HandlerResult<T> = Result<T, (StatusCode, String)>;

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/check-reference", post(check_reference))
        .route("/products/create", post(create_product))
        .route("/products/page", post(products_page))
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
) -> HandlerResult<Json<Vec<Product>>> {
    let products = Product::get_all(&state.db).await.map_err(internal)?;
    Ok(Json(products))
}

#[instrument(skip(state))]
pub async fn check_reference(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
    Json(payload): Json<ReferenceCheck>,
) -> HandlerResult<Json<Outcome>> {
    let existing = Product::get_by_reference(&state.db, &payload.reference)
        .await
        .map_err(internal)?;
    let outcome = match existing {
        Some(_) => Outcome::error(reference_taken_message(&payload.reference)),
        None => Outcome::success_with(format!(
            "Reference [{}] is available.",
            payload.reference
        )),
    };
    Ok(Json(outcome))
}

/// Validation, reference pre-check, insert. The pre-check is only a fast
/// path: a concurrent insert still loses on the UNIQUE constraint and gets
/// the same message.
async fn create_checked(db: &PgPool, form: &ProductForm) -> anyhow::Result<Outcome> {
    let mut outcome = validate_product(form);
    if Product::get_by_reference(db, &form.reference).await?.is_some() {
        outcome.push_error(reference_taken_message(&form.reference));
    }
    if !outcome.is_success() {
        return Ok(outcome);
    }

    match Product::create(db, form).await {
        Ok(id) => {
            info!(product_id = id, reference = %form.reference, "product created");
            Ok(Outcome::success_with(format!(
                "Product [{}] created.",
                form.reference
            )))
        }
        Err(e) if is_unique_violation(&e) => {
            warn!(reference = %form.reference, "reference lost insert race");
            Ok(Outcome::error(reference_taken_message(&form.reference)))
        }
        Err(e) => Err(e),
    }
}

#[instrument(skip(state, form))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
    Json(form): Json<ProductForm>,
) -> HandlerResult<(StatusCode, Json<Outcome>)> {
    let outcome = create_checked(&state.db, &form).await.map_err(internal)?;
    let status = if outcome.is_success() {
        StatusCode::CREATED
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(outcome)))
}

#[instrument(skip(state))]
pub async fn products_page(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
    Json(request): Json<PageRequest>,
) -> HandlerResult<Json<Page<Product>>> {
    Product::get_all_pagination(&state.db, request)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or((
            StatusCode::BAD_REQUEST,
            "rows_per_page must be greater than 0".into(),
        ))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
    Path(id): Path<i64>,
) -> HandlerResult<Json<Product>> {
    Product::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("Product"))
}

#[instrument(skip(state, form))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
    Path(id): Path<i64>,
    Json(form): Json<ProductForm>,
) -> HandlerResult<(StatusCode, Json<Outcome>)> {
    let outcome = validate_product(&form);
    if !outcome.is_success() {
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(outcome)));
    }
    match Product::update(&state.db, id, &form).await {
        Ok(true) => Ok((StatusCode::OK, Json(Outcome::success_with("Product updated.")))),
        Ok(false) => Err(not_found("Product")),
        Err(e) if is_unique_violation(&e) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(Outcome::error(reference_taken_message(&form.reference))),
        )),
        Err(e) => Err(internal(e)),
    }
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAuth(_user_id): RequireAuth,
    Path(id): Path<i64>,
) -> HandlerResult<Response> {
    match Product::delete(&state.db, id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT.into_response()),
        Ok(false) => Err(not_found("Product")),
        Err(e) if is_foreign_key_violation(&e) => Ok(still_referenced("Product")),
        Err(e) => Err(internal(e)),
    }
}
