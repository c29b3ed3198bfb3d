use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use crate::error::{StoreContext, StoreError};
use crate::products::repo_types::{Category, Product};

/// Ranking size used when a caller does not ask for one.
pub const DEFAULT_POPULAR_COUNT: i64 = 5;

pub(crate) fn default_popular_count() -> i64 {
    DEFAULT_POPULAR_COUNT
}

/// A product together with the number of line items that reference it.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct PopularProduct {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub category: Category,
    pub line_item_count: i64,
}

impl From<PopularProduct> for Product {
    fn from(p: PopularProduct) -> Self {
        Product {
            id: p.id,
            name: p.name,
            price: p.price,
            category: p.category,
        }
    }
}

/// Cross-entity reporting queries over orders and the catalog.
#[derive(Clone)]
pub struct DashboardQueries {
    db: PgPool,
}

impl DashboardQueries {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Products ranked by how many line items reference them, across active and
    /// completed orders alike. Each line item counts once whatever its quantity;
    /// ties go to the lower product id.
    pub async fn most_popular(&self, count: i64) -> Result<Vec<PopularProduct>, StoreError> {
        let context = || format!("rank {count} most popular products");
        if count <= 0 {
            return Err(StoreError::validation(context(), "count must be a positive integer"));
        }

        let rows = sqlx::query_as::<_, PopularProduct>(
            r#"
            SELECT p.id, p.name, p.price, p.category, COUNT(op.id) AS line_item_count
              FROM products p
              JOIN order_products op ON op.product_id = p.id
             GROUP BY p.id
             ORDER BY COUNT(op.id) DESC, p.id ASC
             LIMIT $1
            "#,
        )
        .bind(count)
        .fetch_all(&self.db)
        .await
        .store_context(context)?;

        debug!(requested = count, returned = rows.len(), "popularity ranking");
        Ok(rows)
    }
}
