//! Store error types.

use swapdesk_common::{ExchangeError, OrderId, OrderNumber, OrderStatus};
use thiserror::Error;

/// Errors returned by a [`Store`](crate::Store).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Another order already uses this number.
    #[error("Order number already taken: {0}")]
    DuplicateOrderNumber(OrderNumber),

    /// The order's status changed since it was read.
    #[error("Order {id} changed concurrently: expected {expected}, found {actual}")]
    StaleWrite {
        id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// Order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Operation exceeded its time bound.
    #[error("Store operation timed out: {0}")]
    Timeout(String),

    /// Backend failure.
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for ExchangeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateOrderNumber(number) => {
                ExchangeError::Conflict(format!("Duplicate order number {number}"))
            }
            StoreError::StaleWrite { id, expected, actual } => ExchangeError::Conflict(format!(
                "Order {id} moved from {expected} to {actual} concurrently"
            )),
            StoreError::OrderNotFound(id) => ExchangeError::OrderNotFound(id.to_string()),
            other => ExchangeError::Persistence(other.to_string()),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use swapdesk_common::ErrorKind;

    #[test]
    fn test_store_error_mapping() {
        let dup: ExchangeError = StoreError::DuplicateOrderNumber("ORD1".into()).into();
        assert_eq!(dup.kind(), ErrorKind::Conflict);

        let timeout: ExchangeError = StoreError::Timeout("commit".into()).into();
        assert_eq!(timeout.kind(), ErrorKind::Persistence);

        let missing: ExchangeError = StoreError::OrderNotFound(OrderId::new()).into();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }
}
