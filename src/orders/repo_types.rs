use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use crate::products::repo_types::{Category, Product};

/// Order row without line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub is_completed: bool,
}

/// One product entry in an order, with a snapshot of the product row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub product: Product,
}

/// An order with its line items, ascending by line item id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDetails {
    pub id: i64,
    pub user_id: i64,
    pub is_completed: bool,
    pub items: Vec<LineItem>,
}

impl OrderDetails {
    pub fn empty(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            is_completed: order.is_completed,
            items: Vec::new(),
        }
    }
}

/// One row of `orders LEFT JOIN order_products LEFT JOIN products`.
///
/// Every line item column is `NULL` on the single row produced for an order
/// without items.
#[derive(Debug, Clone, FromRow)]
pub struct OrderLineRow {
    pub id: i64,
    pub user_id: i64,
    pub is_completed: bool,
    pub line_item_id: Option<i64>,
    pub quantity: Option<i32>,
    pub product_id: Option<i64>,
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<Category>,
}

/// Which orders of a user to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionFilter {
    #[default]
    Any,
    ActiveOnly,
    CompletedOnly,
}

impl CompletionFilter {
    /// `None` means no filter.
    pub fn from_completed(completed: Option<bool>) -> Self {
        match completed {
            None => CompletionFilter::Any,
            Some(false) => CompletionFilter::ActiveOnly,
            Some(true) => CompletionFilter::CompletedOnly,
        }
    }
}
