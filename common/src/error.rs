//! Error types for SwapDesk operations.

use crate::{CurrencyCode, CurrencyPair, OrderStatus};
use rust_decimal::Decimal;
use thiserror::Error;

/// Coarse error classes the calling layer maps onto transport responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    InvalidTransition,
    UpstreamUnavailable,
    Persistence,
}

/// Main error type for SwapDesk operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    /// No active rate for the pair.
    #[error("Exchange rate not found for {0}")]
    RateNotFound(CurrencyPair),

    /// Currency absent.
    #[error("Currency not found: {0}")]
    CurrencyNotFound(CurrencyCode),

    /// Order absent.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Amount below the source currency's minimum.
    #[error("Amount {amount} is below minimum {min} for {currency}")]
    BelowMinimum {
        currency: CurrencyCode,
        amount: Decimal,
        min: Decimal,
    },

    /// Amount above the source currency's maximum.
    #[error("Amount {amount} exceeds maximum {max} for {currency}")]
    AboveMaximum {
        currency: CurrencyCode,
        amount: Decimal,
        max: Decimal,
    },

    /// Malformed request.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        message: String,
        field: Option<String>,
    },

    /// Currency missing or inactive when creating an order.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(CurrencyCode),

    /// Uniqueness or concurrent-write conflict.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Status change not allowed by the order state machine.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Price source failed or timed out.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Store failure.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl ExchangeError {
    /// Shorthand for a field-level validation failure.
    pub fn invalid_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        ExchangeError::InvalidRequest {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Get the taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExchangeError::RateNotFound(_)
            | ExchangeError::CurrencyNotFound(_)
            | ExchangeError::OrderNotFound(_) => ErrorKind::NotFound,
            ExchangeError::BelowMinimum { .. }
            | ExchangeError::AboveMaximum { .. }
            | ExchangeError::InvalidRequest { .. }
            | ExchangeError::UnknownCurrency(_) => ErrorKind::Validation,
            ExchangeError::Conflict(_) => ErrorKind::Conflict,
            ExchangeError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            ExchangeError::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            ExchangeError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::Conflict(_)
                | ExchangeError::UpstreamUnavailable(_)
                | ExchangeError::Persistence(_)
        )
    }

    /// Get error code for the transport layer.
    pub fn error_code(&self) -> &'static str {
        match self {
            ExchangeError::RateNotFound(_) => "RATE_NOT_FOUND",
            ExchangeError::CurrencyNotFound(_) => "CURRENCY_NOT_FOUND",
            ExchangeError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            ExchangeError::BelowMinimum { .. } => "BELOW_MINIMUM",
            ExchangeError::AboveMaximum { .. } => "ABOVE_MAXIMUM",
            ExchangeError::InvalidRequest { .. } => "INVALID_REQUEST",
            ExchangeError::UnknownCurrency(_) => "UNKNOWN_CURRENCY",
            ExchangeError::Conflict(_) => "CONFLICT",
            ExchangeError::InvalidTransition { .. } => "INVALID_TRANSITION",
            ExchangeError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            ExchangeError::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }
}

/// Result type alias for SwapDesk operations.
pub type Result<T> = std::result::Result<T, ExchangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let pair = CurrencyPair::new(CurrencyCode::btc(), CurrencyCode::eth());
        assert_eq!(ExchangeError::RateNotFound(pair).kind(), ErrorKind::NotFound);
        assert_eq!(
            ExchangeError::UnknownCurrency(CurrencyCode::btc()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ExchangeError::InvalidTransition {
                from: OrderStatus::Confirmed,
                to: OrderStatus::Completed,
            }
            .kind(),
            ErrorKind::InvalidTransition
        );
    }

    #[test]
    fn test_retryable() {
        assert!(ExchangeError::Conflict("stale".into()).is_retryable());
        assert!(!ExchangeError::invalid_field("bad", "amount").is_retryable());
    }

    #[test]
    fn test_transition_message() {
        let err = ExchangeError::InvalidTransition {
            from: OrderStatus::Confirmed,
            to: OrderStatus::Completed,
        };
        assert_eq!(err.to_string(), "Invalid transition from confirmed to completed");
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
    }
}
