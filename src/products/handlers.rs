use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::AuthUser,
    error::reject,
    products::{
        dto::{PopularQuery, ProductFilter},
        repo_types::{NewProduct, Product},
    },
    state::AppState,
};

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/popular", get(popular_products))
        .route("/products/:id", get(get_product).delete(delete_product))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, (StatusCode, String)> {
    let products = match filter.category.as_deref() {
        Some(category) => state.products.by_category_name(category).await,
        None => state.products.list().await,
    }
    .map_err(reject)?;
    Ok(Json(products))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, (StatusCode, String)> {
    let product = state.products.get(id).await.map_err(reject)?;
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn popular_products(
    State(state): State<AppState>,
    Query(q): Query<PopularQuery>,
) -> Result<Json<Vec<Product>>, (StatusCode, String)> {
    let products = state.products.most_popular(q.count).await.map_err(reject)?;
    Ok(Json(products))
}

#[instrument(skip(state, caller, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), (StatusCode, String)> {
    let product = state.products.create(&payload).await.map_err(reject)?;
    info!(product_id = product.id, by = caller.sub, "product added to catalog");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, caller))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Product>, (StatusCode, String)> {
    match state.products.delete(id).await.map_err(reject)? {
        Some(product) => {
            info!(product_id = id, by = caller.sub, "product removed from catalog");
            Ok(Json(product))
        }
        None => Err((StatusCode::NOT_FOUND, format!("product {id} not found"))),
    }
}
