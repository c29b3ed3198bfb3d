use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::AuthUser,
    error::reject,
    orders::{
        dto::{AddProductRequest, CreateOrderRequest, UserOrdersQuery},
        repo_types::{CompletionFilter, Order, OrderDetails},
    },
    state::AppState,
};

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/:id", get(get_order).delete(delete_order))
        .route("/orders/:id/products", post(add_product))
        .route("/orders/:id/complete", post(complete_order))
}

pub fn user_order_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:id/orders", get(user_orders))
        .route("/users/:id/current-order", get(current_order))
}

#[instrument(skip(state, _caller))]
pub async fn list_orders(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> Result<Json<Vec<Order>>, (StatusCode, String)> {
    let orders = state.orders.list().await.map_err(reject)?;
    Ok(Json(orders))
}

#[instrument(skip(state))]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OrderDetails>, (StatusCode, String)> {
    let order = state.orders.show(id).await.map_err(reject)?;
    Ok(Json(order))
}

#[instrument(skip(state))]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderDetails>), (StatusCode, String)> {
    let order = state.orders.create(payload.user_id).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(OrderDetails::empty(order))))
}

#[instrument(skip(state))]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Option<Order>>, (StatusCode, String)> {
    let deleted = state.orders.delete(id).await.map_err(reject)?;
    Ok(Json(deleted))
}

/// Adds (or merges) a line item and answers with the updated order.
#[instrument(skip(state))]
pub async fn add_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<AddProductRequest>,
) -> Result<Json<OrderDetails>, (StatusCode, String)> {
    state
        .orders
        .add_product(id, payload.product_id, payload.quantity)
        .await
        .map_err(reject)?;
    let order = state.orders.show(id).await.map_err(reject)?;
    Ok(Json(order))
}

#[instrument(skip(state))]
pub async fn complete_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.orders.complete(id).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn user_orders(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(q): Query<UserOrdersQuery>,
) -> Result<Json<Vec<OrderDetails>>, (StatusCode, String)> {
    let filter = CompletionFilter::from_completed(q.completed);
    let orders = state
        .orders
        .show_by_user(user_id, filter)
        .await
        .map_err(reject)?;
    Ok(Json(orders))
}

#[instrument(skip(state))]
pub async fn current_order(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<OrderDetails>, (StatusCode, String)> {
    state
        .orders
        .current_for_user(user_id)
        .await
        .map_err(reject)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("user {user_id} has no active order")))
}
