//! Node configuration.

use std::time::Duration;

use rust_decimal::Decimal;
use swapdesk_common::{
    default_commission_percent, DEFAULT_ORDER_EXPIRY_MINUTES, MAX_ORDER_EXPIRY_MINUTES,
};
use swapdesk_fx::{CalculatorConfig, MarginPolicy, PairRule, RateUpdaterConfig, COINGECKO_URL};
use swapdesk_orders::LifecycleConfig;

/// Rate refresh configuration.
#[derive(Debug, Clone)]
pub struct RateConfig {
    /// CoinGecko API root.
    pub coingecko_url: String,
    /// Time between refreshes.
    pub refresh_interval: Duration,
    /// Bound on one price fetch.
    pub fetch_timeout: Duration,
    /// Margin in percent applied to spot prices.
    pub margin_percent: Decimal,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            coingecko_url: COINGECKO_URL.to_string(),
            refresh_interval: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(10),
            margin_percent: Decimal::from(2),
        }
    }
}

/// Order handling configuration.
#[derive(Debug, Clone)]
pub struct OrderConfig {
    /// Time between expiry sweeps.
    pub sweep_interval: Duration,
    /// TTL used when the store setting is unusable.
    pub default_ttl_minutes: i64,
    /// Commission used when the store setting is unusable.
    pub default_commission_percent: Decimal,
    /// Attempts at a unique order number.
    pub order_number_attempts: usize,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            default_ttl_minutes: DEFAULT_ORDER_EXPIRY_MINUTES,
            default_commission_percent: default_commission_percent(),
            order_number_attempts: 5,
        }
    }
}

/// Main node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub rates: RateConfig,
    pub orders: OrderConfig,
    /// Bound on every store call.
    pub store_timeout: Duration,
    /// Log level.
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rates: RateConfig::default(),
            orders: OrderConfig::default(),
            store_timeout: Duration::from_millis(2000),
            log_level: "info".to_string(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("COINGECKO_URL") {
            config.rates.coingecko_url = url;
        }

        if let Some(secs) = env_parse::<u64>("RATE_REFRESH_INTERVAL_SECS") {
            config.rates.refresh_interval = Duration::from_secs(secs);
        }

        if let Some(secs) = env_parse::<u64>("RATE_FETCH_TIMEOUT_SECS") {
            config.rates.fetch_timeout = Duration::from_secs(secs);
        }

        if let Some(percent) = env_parse::<Decimal>("RATE_MARGIN_PERCENT") {
            config.rates.margin_percent = percent;
        }

        if let Some(secs) = env_parse::<u64>("ORDER_SWEEP_INTERVAL_SECS") {
            config.orders.sweep_interval = Duration::from_secs(secs);
        }

        if let Some(ms) = env_parse::<u64>("STORE_TIMEOUT_MS") {
            config.store_timeout = Duration::from_millis(ms);
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.rates.coingecko_url.is_empty() {
            return Err("CoinGecko URL cannot be empty".to_string());
        }

        if self.rates.refresh_interval.is_zero() {
            return Err("Rate refresh interval cannot be 0".to_string());
        }

        if self.rates.fetch_timeout.is_zero() {
            return Err("Rate fetch timeout cannot be 0".to_string());
        }

        if self.rates.margin_percent < Decimal::ZERO
            || self.rates.margin_percent >= Decimal::ONE_HUNDRED
        {
            return Err("Rate margin must be within [0, 100) percent".to_string());
        }

        if self.orders.sweep_interval.is_zero() {
            return Err("Order sweep interval cannot be 0".to_string());
        }

        if !(1..=MAX_ORDER_EXPIRY_MINUTES).contains(&self.orders.default_ttl_minutes) {
            return Err(format!(
                "Default order TTL must be within 1..={MAX_ORDER_EXPIRY_MINUTES} minutes"
            ));
        }

        if self.orders.order_number_attempts == 0 {
            return Err("Order number attempts cannot be 0".to_string());
        }

        if self.store_timeout.is_zero() {
            return Err("Store timeout cannot be 0".to_string());
        }

        Ok(())
    }

    pub fn updater_config(&self) -> RateUpdaterConfig {
        RateUpdaterConfig {
            refresh_interval: self.rates.refresh_interval,
            fetch_timeout: self.rates.fetch_timeout,
            store_timeout: self.store_timeout,
            margin: MarginPolicy::from_percent(self.rates.margin_percent),
            rules: PairRule::defaults(),
        }
    }

    pub fn calculator_config(&self) -> CalculatorConfig {
        CalculatorConfig {
            default_commission_percent: self.orders.default_commission_percent,
            store_timeout: self.store_timeout,
        }
    }

    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            store_timeout: self.store_timeout,
            order_number_attempts: self.orders.order_number_attempts,
            default_ttl_minutes: self.orders.default_ttl_minutes,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.trim().parse().ok())
}
