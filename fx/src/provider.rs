//! Spot price sources.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::{FxError, FxResult};

#[cfg(any(test, feature = "test-utils"))]
use dashmap::DashMap;
#[cfg(any(test, feature = "test-utils"))]
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Spot prices keyed by asset, then by quote currency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpotPrices {
    prices: BTreeMap<String, BTreeMap<String, Decimal>>,
}

impl SpotPrices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the price of one `asset` in `quote`.
    pub fn insert(&mut self, asset: impl Into<String>, quote: impl Into<String>, price: Decimal) {
        self.prices
            .entry(asset.into())
            .or_default()
            .insert(quote.into(), price);
    }

    /// Price of `asset` in `quote`, if present.
    pub fn get(&self, asset: &str, quote: &str) -> Option<Decimal> {
        self.prices.get(asset).and_then(|quotes| quotes.get(quote)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.values().all(BTreeMap::is_empty)
    }
}

/// Trait for spot price sources.
///
/// Assets absent from the upstream answer are simply missing from the
/// result. Only transport or decoding failures are errors.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Source name recorded on derived rates.
    fn name(&self) -> &str;

    /// Fetch prices of `assets` in each of `quotes`.
    async fn fetch(
        &self,
        assets: &BTreeSet<String>,
        quotes: &BTreeSet<String>,
    ) -> FxResult<SpotPrices>;
}

/// Default CoinGecko API root.
pub const COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko `/simple/price` client.
pub struct CoinGeckoPriceSource {
    client: Client,
    base_url: String,
}

impl CoinGeckoPriceSource {
    /// Create a client against `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> FxResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FxError::Provider(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn join(items: &BTreeSet<String>) -> String {
        items.iter().map(String::as_str).collect::<Vec<_>>().join(",")
    }
}

#[async_trait]
impl PriceSource for CoinGeckoPriceSource {
    fn name(&self) -> &str {
        "coingecko"
    }

    async fn fetch(
        &self,
        assets: &BTreeSet<String>,
        quotes: &BTreeSet<String>,
    ) -> FxResult<SpotPrices> {
        let url = format!("{}/simple/price", self.base_url);
        let ids = Self::join(assets);
        let vs_currencies = Self::join(quotes);

        let response = self
            .client
            .get(&url)
            .query(&[("ids", ids.as_str()), ("vs_currencies", vs_currencies.as_str())])
            .send()
            .await
            .map_err(|e| FxError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FxError::Provider(format!(
                "CoinGecko returned status {}",
                response.status()
            )));
        }

        let body: HashMap<String, HashMap<String, f64>> = response
            .json()
            .await
            .map_err(|e| FxError::Provider(format!("Failed to parse CoinGecko response: {e}")))?;

        let mut prices = SpotPrices::new();
        for (asset, by_quote) in body {
            for (quote, value) in by_quote {
                match Decimal::from_f64(value) {
                    Some(price) => prices.insert(asset.clone(), quote, price),
                    None => warn!(asset = %asset, quote = %quote, value, "Unrepresentable price"),
                }
            }
        }

        debug!(assets = %ids, quotes = %vs_currencies, "Fetched spot prices");
        Ok(prices)
    }
}

/// Mock price source for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockPriceSource {
    prices: DashMap<(String, String), Decimal>,
    failing: AtomicBool,
    delay_ms: AtomicU64,
    fetches: AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockPriceSource {
    pub fn new() -> Self {
        Self {
            prices: DashMap::new(),
            failing: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Mock seeded with the prices the default pair rules need.
    pub fn with_defaults() -> Self {
        let source = Self::new();
        source.set_price("bitcoin", "usd", Decimal::from(60_000));
        source.set_price("tether", "rub", Decimal::from(95));
        source
    }

    /// Set the price of `asset` in `quote`.
    pub fn set_price(&self, asset: &str, quote: &str, price: Decimal) {
        self.prices.insert((asset.to_string(), quote.to_string()), price);
    }

    /// Drop a price so it is missing from later fetches.
    pub fn remove_price(&self, asset: &str, quote: &str) {
        self.prices.remove(&(asset.to_string(), quote.to_string()));
    }

    /// Make every fetch fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every fetch.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of fetches attempted so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for MockPriceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl PriceSource for MockPriceSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(
        &self,
        assets: &BTreeSet<String>,
        quotes: &BTreeSet<String>,
    ) -> FxResult<SpotPrices> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(FxError::Provider("mock source unavailable".to_string()));
        }

        let mut prices = SpotPrices::new();
        for entry in self.prices.iter() {
            let (asset, quote) = entry.key();
            if assets.contains(asset) && quotes.contains(quote) {
                prices.insert(asset.clone(), quote.clone(), *entry.value());
            }
        }
        Ok(prices)
    }
}
