//! Time bounds for store calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{StoreError, StoreResult};

/// Run a store operation, failing with [`StoreError::Timeout`] after `limit`.
pub async fn bounded<T, F>(limit: Duration, operation: &str, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, timeout_ms = limit.as_millis() as u64, "Store call timed out");
            Err(StoreError::Timeout(operation.to_string()))
        }
    }
}
