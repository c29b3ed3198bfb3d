use crate::error::StoreError;

/// Lifecycle gate for mutating an order's line items.
///
/// `state` is the `is_completed` column as read under lock, `None` when the
/// order row does not exist.
pub fn ensure_open(context: impl Into<String>, state: Option<bool>) -> Result<(), StoreError> {
    match state {
        None => Err(StoreError::conflict(context, "order does not exist")),
        Some(true) => Err(StoreError::conflict(context, "order is completed")),
        Some(false) => Ok(()),
    }
}

pub fn validate_quantity(context: impl Into<String>, quantity: i32) -> Result<(), StoreError> {
    if quantity <= 0 {
        return Err(StoreError::validation(context, "quantity must be a positive integer"));
    }
    Ok(())
}

/// Quantity a line item holds after adding `added` to what it already has.
pub fn merged_quantity(
    context: impl Into<String>,
    existing: Option<i32>,
    added: i32,
) -> Result<i32, StoreError> {
    existing.unwrap_or(0).checked_add(added).ok_or_else(|| {
        StoreError::validation(context, format!("quantity would exceed {}", i32::MAX))
    })
}
