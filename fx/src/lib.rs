//! SwapDesk FX
//!
//! Spot price ingestion, margin-adjusted rate caching and conversion quotes.
//!
//! # Features
//!
//! - Pluggable spot price sources (CoinGecko, mock)
//! - Configurable pair rules with a single margin convention
//! - In-process rate cache refreshed in whole batches
//! - Commission-aware conversion quotes
//!
//! # Example
//!
//! ```rust,ignore
//! use swapdesk_fx::{Calculator, CalculatorConfig, RateCache, RateUpdater, RateUpdaterConfig};
//!
//! let cache = Arc::new(RateCache::new());
//! let updater = RateUpdater::new(source, store.clone(), cache.clone(), RateUpdaterConfig::default());
//! updater.refresh().await?;
//!
//! let calculator = Calculator::new(cache, store, CalculatorConfig::default());
//! let quote = calculator.calculate(&"USDT_TRC20".into(), &"RUB_TBANK".into(), dec!(100)).await?;
//! ```

pub mod cache;
pub mod calculator;
pub mod error;
pub mod margin;
pub mod provider;
pub mod updater;

pub use cache::{RateCache, SharedRateCache};
pub use calculator::{apply_commission, Calculator, CalculatorConfig, Quote};
pub use error::{FxError, FxResult};
pub use margin::{MarginPolicy, Orientation, PairRule};
pub use provider::{CoinGeckoPriceSource, PriceSource, SpotPrices, COINGECKO_URL};
pub use updater::{RateUpdater, RateUpdaterConfig, RefreshReport};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockPriceSource;
