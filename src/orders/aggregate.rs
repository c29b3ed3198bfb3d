//! Folds flat order/line-item/product join rows into nested orders.
//!
//! Input rows must be grouped by order id in ascending order (the queries in
//! `repo.rs` sort by `orders.id, order_products.id`). A single pass builds the
//! output; a row whose order id goes backwards is reported instead of silently
//! producing a split order.

use crate::orders::repo_types::{LineItem, OrderDetails, OrderLineRow};
use crate::products::repo_types::Product;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FoldError {
    #[error("rows are not grouped by ascending order id ({previous} followed by {next})")]
    Unsorted { previous: i64, next: i64 },
    #[error("order {order_id} has a line item row with missing product columns")]
    IncompleteLineItem { order_id: i64 },
}

pub fn fold_order_rows<I>(rows: I) -> Result<Vec<OrderDetails>, FoldError>
where
    I: IntoIterator<Item = OrderLineRow>,
{
    rows.into_iter().try_fold(Vec::new(), |mut orders: Vec<OrderDetails>, row| {
        let starts_new = match orders.last() {
            None => true,
            Some(current) if current.id == row.id => false,
            Some(current) if current.id < row.id => true,
            Some(current) => {
                return Err(FoldError::Unsorted {
                    previous: current.id,
                    next: row.id,
                })
            }
        };

        if starts_new {
            orders.push(OrderDetails {
                id: row.id,
                user_id: row.user_id,
                is_completed: row.is_completed,
                items: Vec::new(),
            });
        }

        if let Some(item) = line_item(&row)? {
            if let Some(current) = orders.last_mut() {
                current.items.push(item);
            }
        }
        Ok(orders)
    })
}

fn line_item(row: &OrderLineRow) -> Result<Option<LineItem>, FoldError> {
    let Some(line_item_id) = row.line_item_id else {
        return Ok(None);
    };

    match (row.product_id, &row.name, row.price, row.category, row.quantity) {
        (Some(product_id), Some(name), Some(price), Some(category), Some(quantity)) => {
            Ok(Some(LineItem {
                id: line_item_id,
                product_id,
                quantity,
                product: Product {
                    id: product_id,
                    name: name.clone(),
                    price,
                    category,
                },
            }))
        }
        _ => Err(FoldError::IncompleteLineItem { order_id: row.id }),
    }
}
