//! In-process rate cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use swapdesk_common::{CurrencyPair, ExchangeRate};
use swapdesk_store::Store;
use tracing::{debug, info};

use crate::error::{FxError, FxResult};

/// Thread-safe cache of the latest served rates.
///
/// Reads never touch the network or the store. A refresh swaps a whole batch
/// under one write lock, so readers see either the old or the new set.
#[derive(Default)]
pub struct RateCache {
    rates: RwLock<HashMap<CurrencyPair, ExchangeRate>>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the active rate for a pair.
    pub fn get(&self, pair: &CurrencyPair) -> FxResult<ExchangeRate> {
        match self.rates.read().get(pair) {
            Some(rate) if rate.is_active => {
                debug!(pair = %pair, "Cache hit");
                Ok(rate.clone())
            }
            _ => {
                debug!(pair = %pair, "Cache miss");
                Err(FxError::RateNotFound(pair.clone()))
            }
        }
    }

    /// All active rates, ordered by pair.
    pub fn get_all(&self) -> Vec<ExchangeRate> {
        let mut rates: Vec<ExchangeRate> = self
            .rates
            .read()
            .values()
            .filter(|rate| rate.is_active)
            .cloned()
            .collect();
        rates.sort_by(|a, b| a.pair.cmp(&b.pair));
        rates
    }

    /// Upsert a batch of rates by pair.
    pub fn replace(&self, batch: Vec<ExchangeRate>) {
        let mut rates = self.rates.write();
        for rate in batch {
            rates.insert(rate.pair.clone(), rate);
        }
    }

    /// Load the persisted rates. Returns how many were loaded.
    pub async fn warm(&self, store: &dyn Store) -> FxResult<usize> {
        let persisted = store.list_rates().await?;
        let count = persisted.len();
        self.replace(persisted);

        info!(count, "Rate cache warmed from store");
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.rates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.read().is_empty()
    }
}

/// Shared rate cache.
pub type SharedRateCache = Arc<RateCache>;
