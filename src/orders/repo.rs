use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::error::{StoreContext, StoreError};
use crate::orders::aggregate::fold_order_rows;
use crate::orders::repo_types::{CompletionFilter, Order, OrderDetails, OrderLineRow};
use crate::orders::services::{ensure_open, merged_quantity, validate_quantity};

/// Order rows joined with their line items and products, one row per line item
/// (or a single all-NULL item row for an empty order).
macro_rules! order_detail_query {
    ($tail:literal) => {
        concat!(
            r#"
            SELECT o.id, o.user_id, o.is_completed,
                   op.id AS line_item_id, op.quantity,
                   p.id AS product_id, p.name, p.price, p.category
              FROM orders o
              LEFT JOIN order_products op ON op.order_id = o.id
              LEFT JOIN products p ON p.id = op.product_id
            "#,
            $tail,
            "\n ORDER BY o.id ASC, op.id ASC"
        )
    };
}

#[derive(Clone)]
pub struct OrderRepo {
    db: PgPool,
}

impl OrderRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All orders without their line items.
    pub async fn list(&self) -> Result<Vec<Order>, StoreError> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, is_completed
              FROM orders
             ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .store_context(|| "list orders")
    }

    pub async fn show(&self, id: i64) -> Result<OrderDetails, StoreError> {
        let context = || format!("show order {id}");
        let rows = sqlx::query_as::<_, OrderLineRow>(order_detail_query!(" WHERE o.id = $1"))
            .bind(id)
            .fetch_all(&self.db)
            .await
            .store_context(context)?;

        fold_order_rows(rows)
            .map_err(|e| StoreError::infrastructure(context(), e))?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found(context()))
    }

    /// Opens an empty order for `user_id`.
    ///
    /// The user row is locked for the duration of the check so concurrent calls
    /// for one user serialize; the partial unique index on active orders rejects
    /// anything that slips past.
    pub async fn create(&self, user_id: i64) -> Result<Order, StoreError> {
        let context = || format!("create order for user {user_id}");
        let mut tx = self.db.begin().await.store_context(context)?;

        let user = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .store_context(context)?;
        if user.is_none() {
            warn!(user_id, "order requested for unknown user");
            return Err(StoreError::conflict(context(), "user does not exist"));
        }

        let active = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM orders WHERE user_id = $1 AND NOT is_completed",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .store_context(context)?;
        if let Some(active_id) = active {
            warn!(user_id, active_order_id = active_id, "user already has an active order");
            return Err(StoreError::conflict(
                context(),
                format!("user already has an active order ({active_id})"),
            ));
        }

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (user_id, is_completed)
            VALUES ($1, false)
            RETURNING id, user_id, is_completed
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .store_context(context)?;

        tx.commit().await.store_context(context)?;
        info!(order_id = order.id, user_id, "order created");
        Ok(order)
    }

    /// Removes the order and its line items. Deleting an unknown id is `Ok(None)`.
    pub async fn delete(&self, id: i64) -> Result<Option<Order>, StoreError> {
        let context = || format!("delete order {id}");
        let mut tx = self.db.begin().await.store_context(context)?;

        let removed_items = sqlx::query("DELETE FROM order_products WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .store_context(context)?
            .rows_affected();

        let deleted = sqlx::query_as::<_, Order>(
            r#"
            DELETE FROM orders
             WHERE id = $1
            RETURNING id, user_id, is_completed
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .store_context(context)?;

        tx.commit().await.store_context(context)?;
        match &deleted {
            Some(o) => info!(order_id = o.id, removed_items, "order deleted"),
            None => debug!(order_id = id, "delete of unknown order"),
        }
        Ok(deleted)
    }

    /// Adds `quantity` of a product to an open order. A product already in the
    /// order has the quantity added to its existing line item.
    pub async fn add_product(
        &self,
        order_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<(), StoreError> {
        let context = || format!("add product {product_id} to order {order_id}");
        validate_quantity(context(), quantity)?;

        let mut tx = self.db.begin().await.store_context(context)?;

        // Row lock keeps completion and concurrent adds out until commit.
        let state = sqlx::query_scalar::<_, bool>(
            "SELECT is_completed FROM orders WHERE id = $1 FOR UPDATE",
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await
        .store_context(context)?;
        if let Err(e) = ensure_open(context(), state) {
            warn!(order_id, product_id, error = %e, "add to order refused");
            return Err(e);
        }

        // Line items of a locked order cannot change underneath us.
        let existing = sqlx::query_scalar::<_, i32>(
            "SELECT quantity FROM order_products WHERE order_id = $1 AND product_id = $2",
        )
        .bind(order_id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await
        .store_context(context)?;
        if let Err(e) = merged_quantity(context(), existing, quantity) {
            warn!(order_id, product_id, ?existing, added = quantity, "line item quantity overflow");
            return Err(e);
        }

        let total = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO order_products (order_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT order_products_order_product_key
            DO UPDATE SET quantity = order_products.quantity + EXCLUDED.quantity
            RETURNING quantity
            "#,
        )
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await
        .store_context(context)?;

        tx.commit().await.store_context(context)?;
        info!(order_id, product_id, added = quantity, total, "product added to order");
        Ok(())
    }

    /// Marks the order completed. Completing a completed order changes nothing.
    pub async fn complete(&self, id: i64) -> Result<(), StoreError> {
        let context = || format!("complete order {id}");
        let mut tx = self.db.begin().await.store_context(context)?;

        let state = sqlx::query_scalar::<_, bool>(
            "SELECT is_completed FROM orders WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .store_context(context)?;

        match state {
            None => return Err(StoreError::conflict(context(), "order does not exist")),
            Some(true) => {
                debug!(order_id = id, "order already completed");
                return Ok(());
            }
            Some(false) => {}
        }

        sqlx::query("UPDATE orders SET is_completed = true WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .store_context(context)?;

        tx.commit().await.store_context(context)?;
        info!(order_id = id, "order completed");
        Ok(())
    }

    /// Orders of one user, ascending by id, each with its line items.
    pub async fn show_by_user(
        &self,
        user_id: i64,
        filter: CompletionFilter,
    ) -> Result<Vec<OrderDetails>, StoreError> {
        let context = || format!("list orders of user {user_id} ({filter:?})");
        let query = match filter {
            CompletionFilter::Any => {
                sqlx::query_as::<_, OrderLineRow>(order_detail_query!(" WHERE o.user_id = $1"))
                    .bind(user_id)
            }
            CompletionFilter::ActiveOnly | CompletionFilter::CompletedOnly => {
                sqlx::query_as::<_, OrderLineRow>(order_detail_query!(
                    " WHERE o.user_id = $1 AND o.is_completed = $2"
                ))
                .bind(user_id)
                .bind(filter == CompletionFilter::CompletedOnly)
            }
        };

        let rows = query.fetch_all(&self.db).await.store_context(context)?;
        fold_order_rows(rows).map_err(|e| StoreError::infrastructure(context(), e))
    }

    /// The user's active order, if any.
    pub async fn current_for_user(&self, user_id: i64) -> Result<Option<OrderDetails>, StoreError> {
        let active = self.show_by_user(user_id, CompletionFilter::ActiveOnly).await?;
        Ok(active.into_iter().next())
    }
}
