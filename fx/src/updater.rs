//! Periodic rate refresh.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use swapdesk_common::ExchangeRate;
use swapdesk_store::{bounded, SharedStore};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::cache::SharedRateCache;
use crate::error::{FxError, FxResult};
use crate::margin::{MarginPolicy, PairRule};
use crate::provider::{PriceSource, SpotPrices};

/// Configuration for the rate updater.
#[derive(Debug, Clone)]
pub struct RateUpdaterConfig {
    /// Time between scheduled refreshes.
    pub refresh_interval: Duration,
    /// Bound on one price source call.
    pub fetch_timeout: Duration,
    /// Bound on persisting one batch.
    pub store_timeout: Duration,
    pub margin: MarginPolicy,
    pub rules: Vec<PairRule>,
}

impl Default for RateUpdaterConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(10),
            store_timeout: Duration::from_millis(2000),
            margin: MarginPolicy::default(),
            rules: PairRule::defaults(),
        }
    }
}

/// Outcome of one successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub pairs_updated: usize,
    pub source: String,
    pub duration: Duration,
}

/// Fetches spot prices, applies margin and publishes the result.
pub struct RateUpdater {
    source: Arc<dyn PriceSource>,
    store: SharedStore,
    cache: SharedRateCache,
    config: RateUpdaterConfig,
}

impl RateUpdater {
    pub fn new(
        source: Arc<dyn PriceSource>,
        store: SharedStore,
        cache: SharedRateCache,
        config: RateUpdaterConfig,
    ) -> Self {
        Self {
            source,
            store,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &RateUpdaterConfig {
        &self.config
    }

    /// Run one refresh cycle.
    ///
    /// The batch is persisted before it is published. Any failure leaves
    /// both the store and the cache as they were.
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn refresh(&self) -> FxResult<RefreshReport> {
        let started = Instant::now();

        let assets: BTreeSet<String> = self.config.rules.iter().map(|r| r.asset.clone()).collect();
        let quotes: BTreeSet<String> = self.config.rules.iter().map(|r| r.quote.clone()).collect();

        let prices = tokio::time::timeout(
            self.config.fetch_timeout,
            self.source.fetch(&assets, &quotes),
        )
        .await
        .map_err(|_| FxError::Timeout(self.config.fetch_timeout.as_millis() as u64))??;

        let rates = self.derive(&prices)?;

        bounded(
            self.config.store_timeout,
            "upsert_rates",
            self.store.upsert_rates(&rates),
        )
        .await?;

        let pairs_updated = rates.len();
        self.cache.replace(rates);

        let report = RefreshReport {
            pairs_updated,
            source: self.source.name().to_string(),
            duration: started.elapsed(),
        };
        info!(
            pairs_updated,
            duration_ms = report.duration.as_millis() as u64,
            "Exchange rates refreshed"
        );
        Ok(report)
    }

    /// Turn spot prices into served rates. All rules must resolve.
    fn derive(&self, prices: &SpotPrices) -> FxResult<Vec<ExchangeRate>> {
        let now = Utc::now();
        let mut rates = Vec::with_capacity(self.config.rules.len());
        let mut missing = Vec::new();

        for rule in &self.config.rules {
            let derived = prices
                .get(&rule.asset, &rule.quote)
                .and_then(|price| self.config.margin.apply(price, rule.orientation))
                .and_then(|rate| {
                    ExchangeRate::new(rule.pair.clone(), rate, self.source.name(), now).ok()
                });

            match derived {
                Some(rate) => {
                    debug!(pair = %rate.pair, rate = %rate.rate, "Derived rate");
                    rates.push(rate);
                }
                None => {
                    let key = rule.price_key();
                    if !missing.contains(&key) {
                        missing.push(key);
                    }
                }
            }
        }

        if !missing.is_empty() {
            return Err(FxError::IncompletePrices { missing });
        }
        Ok(rates)
    }

    /// Refresh once, then on every interval tick until `shutdown` flips to `true`.
    ///
    /// Failures are logged and the previous rates stay in service.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.refresh_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh().await {
                        warn!(error = %e, "Rate refresh failed, keeping previous rates");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Rate updater stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RateCache;
    use crate::provider::MockPriceSource;
    use rust_decimal_macros::dec;
    use swapdesk_common::{CurrencyCode, CurrencyPair};
    use swapdesk_store::{MemoryStore, Store};

    struct Fixture {
        source: Arc<MockPriceSource>,
        store: Arc<MemoryStore>,
        cache: SharedRateCache,
        updater: RateUpdater,
    }

    fn fixture(config: RateUpdaterConfig) -> Fixture {
        let source = Arc::new(MockPriceSource::with_defaults());
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(RateCache::new());
        let updater = RateUpdater::new(source.clone(), store.clone(), cache.clone(), config);
        Fixture {
            source,
            store,
            cache,
            updater,
        }
    }

    fn btc_usdt() -> CurrencyPair {
        CurrencyPair::new(CurrencyCode::btc(), CurrencyCode::usdt_trc20())
    }

    #[tokio::test]
    async fn test_refresh_publishes_all_pairs() {
        let f = fixture(RateUpdaterConfig::default());

        let report = f.updater.refresh().await.unwrap();

        assert_eq!(report.pairs_updated, 4);
        assert_eq!(report.source, "mock");
        assert_eq!(f.cache.get_all().len(), 4);
        assert_eq!(f.store.list_rates().await.unwrap().len(), 4);

        let rate = f.cache.get(&btc_usdt()).unwrap();
        assert_eq!(rate.rate, dec!(61200));
        assert_eq!(rate.reverse_rate, rust_decimal::Decimal::ONE / rate.rate);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_cache_unchanged() {
        let f = fixture(RateUpdaterConfig::default());
        f.updater.refresh().await.unwrap();
        let before = f.cache.get_all();

        f.source.set_price("bitcoin", "usd", dec!(10));
        f.source.set_failing(true);
        assert!(matches!(f.updater.refresh().await, Err(FxError::Provider(_))));

        assert_eq!(f.cache.get_all(), before);
    }

    #[tokio::test]
    async fn test_missing_price_aborts_cycle() {
        let f = fixture(RateUpdaterConfig::default());
        f.source.remove_price("tether", "rub");

        let result = f.updater.refresh().await;

        match result {
            Err(FxError::IncompletePrices { missing }) => assert_eq!(missing, vec!["tether/rub"]),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(f.cache.is_empty());
        assert!(f.store.list_rates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_leaves_cache_unchanged() {
        let f = fixture(RateUpdaterConfig::default());
        f.store.fail_rate_upserts(true);

        assert!(matches!(f.updater.refresh().await, Err(FxError::Store(_))));
        assert!(f.cache.is_empty());
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        let f = fixture(RateUpdaterConfig {
            fetch_timeout: Duration::from_millis(20),
            ..Default::default()
        });
        f.source.set_delay(Duration::from_millis(500));

        assert!(matches!(f.updater.refresh().await, Err(FxError::Timeout(20))));
        assert!(f.cache.is_empty());
    }

    #[tokio::test]
    async fn test_run_refreshes_until_shutdown() {
        let f = fixture(RateUpdaterConfig {
            refresh_interval: Duration::from_millis(10),
            ..Default::default()
        });
        let (tx, rx) = watch::channel(false);
        let updater = Arc::new(f.updater);

        let handle = {
            let updater = updater.clone();
            tokio::spawn(async move { updater.run(rx).await })
        };

        tokio::time::sleep(Duration::from_millis(60)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        let fetches = f.source.fetch_count();
        assert!(fetches >= 2);
        assert_eq!(f.cache.get_all().len(), 4);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(f.source.fetch_count(), fetches);
    }
}
