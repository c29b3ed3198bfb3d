use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct AddProductRequest {
    pub product_id: i64,
    pub quantity: i32,
}

/// `?completed=true|false`; absent means both.
#[derive(Debug, Deserialize)]
pub struct UserOrdersQuery {
    pub completed: Option<bool>,
}
