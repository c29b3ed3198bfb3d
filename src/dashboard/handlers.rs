use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use crate::{dashboard::queries::PopularProduct, error::reject, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    #[serde(default = "crate::dashboard::queries::default_popular_count")]
    pub count: i64,
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/dashboard/popular-products", get(popular_products))
}

/// Ranking with the line-item count behind each position.
#[instrument(skip(state))]
pub async fn popular_products(
    State(state): State<AppState>,
    Query(q): Query<RankingQuery>,
) -> Result<Json<Vec<PopularProduct>>, (StatusCode, String)> {
    let ranked = state.dashboard.most_popular(q.count).await.map_err(reject)?;
    Ok(Json(ranked))
}
