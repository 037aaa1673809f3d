//! FX error types.

use swapdesk_common::{CurrencyPair, ExchangeError};
use swapdesk_store::StoreError;
use thiserror::Error;

/// Errors that can occur while fetching, deriving or serving rates.
#[derive(Debug, Error)]
pub enum FxError {
    /// Price source returned an error.
    #[error("Price source error: {0}")]
    Provider(String),

    /// Price source did not answer in time.
    #[error("Price source timed out after {0} ms")]
    Timeout(u64),

    /// Some rule had no usable spot price, so the whole cycle was dropped.
    #[error("Incomplete spot prices, missing: {}", .missing.join(", "))]
    IncompletePrices { missing: Vec<String> },

    /// Rate not available for the requested currency pair.
    #[error("Rate not available for {0}")]
    RateNotFound(CurrencyPair),

    /// Persisting rates failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<FxError> for ExchangeError {
    fn from(err: FxError) -> Self {
        match err {
            FxError::RateNotFound(pair) => ExchangeError::RateNotFound(pair),
            FxError::Store(store) => store.into(),
            other => ExchangeError::UpstreamUnavailable(other.to_string()),
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
