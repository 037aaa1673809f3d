//! Currency, currency pair and exchange rate records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency code as used by the exchange, e.g. `USDT_TRC20` or `BTC`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a new currency code. Codes are stored upper-cased.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Valid codes are non-empty, at most 16 chars, alphanumeric or underscore.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= 16
            && self.0.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    pub fn usdt_trc20() -> Self {
        Self::new("USDT_TRC20")
    }

    pub fn rub_tbank() -> Self {
        Self::new("RUB_TBANK")
    }

    pub fn btc() -> Self {
        Self::new("BTC")
    }

    pub fn eth() -> Self {
        Self::new("ETH")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A currency the exchange can quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// Unique code.
    pub code: CurrencyCode,
    /// Display name.
    pub name: String,
    /// Ticker symbol shown to clients.
    pub symbol: String,
    /// Transfer network (e.g. `TRC20`, `Bitcoin`).
    pub network: String,
    /// Smallest amount accepted as conversion input.
    pub min_amount: Decimal,
    /// Largest amount accepted as conversion input, if bounded.
    pub max_amount: Option<Decimal>,
    /// Decimal places used for this currency.
    pub decimals: u32,
    /// Inactive currencies cannot be quoted or ordered.
    pub is_active: bool,
}

impl Currency {
    /// Create an active currency with no upper bound.
    pub fn new(
        code: CurrencyCode,
        name: impl Into<String>,
        min_amount: Decimal,
        decimals: u32,
    ) -> Self {
        let symbol = code.as_str().split('_').next().unwrap_or_default().to_string();
        Self {
            code,
            name: name.into(),
            symbol,
            network: String::new(),
            min_amount,
            max_amount: None,
            decimals,
            is_active: true,
        }
    }

    /// Set the transfer network.
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    /// Set the upper bound.
    pub fn with_max_amount(mut self, max: Decimal) -> Self {
        self.max_amount = Some(max);
        self
    }

    /// The currencies seeded on first boot.
    pub fn defaults() -> Vec<Currency> {
        vec![
            Currency::new(CurrencyCode::usdt_trc20(), "Tether USDT", Decimal::from(10), 6)
                .with_network("TRC20"),
            Currency::new(CurrencyCode::rub_tbank(), "Russian Ruble", Decimal::from(500), 2)
                .with_network("T-Bank"),
            Currency::new(CurrencyCode::btc(), "Bitcoin", Decimal::new(1, 4), 8)
                .with_network("Bitcoin"),
            Currency::new(CurrencyCode::eth(), "Ethereum", Decimal::new(1, 2), 18)
                .with_network("Ethereum"),
        ]
    }
}

/// An ordered currency pair: converting `from` into `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Currency given by the client.
    pub from: CurrencyCode,
    /// Currency received by the client.
    pub to: CurrencyCode,
}

impl CurrencyPair {
    /// Create a new currency pair.
    pub fn new(from: CurrencyCode, to: CurrencyCode) -> Self {
        Self { from, to }
    }

    /// Get the inverse pair.
    pub fn inverse(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.from, self.to)
    }
}

/// Quoting rate for one ordered pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// The currency pair.
    pub pair: CurrencyPair,
    /// Units of `to` received per unit of `from`, margin included.
    pub rate: Decimal,
    /// `1 / rate`, computed from the same fetch.
    pub reverse_rate: Decimal,
    /// Where the underlying spot price came from.
    pub source: String,
    /// When this rate was written.
    pub updated_at: DateTime<Utc>,
    /// Inactive rates are never served.
    pub is_active: bool,
}

impl ExchangeRate {
    /// Create an active rate, deriving the reverse rate.
    pub fn new(
        pair: CurrencyPair,
        rate: Decimal,
        source: impl Into<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, NonPositiveRateError> {
        if rate <= Decimal::ZERO {
            return Err(NonPositiveRateError { pair, rate });
        }

        Ok(Self {
            reverse_rate: Decimal::ONE / rate,
            pair,
            rate,
            source: source.into(),
            updated_at,
            is_active: true,
        })
    }
}

/// Error when a rate would be zero or negative.
#[derive(Debug, Clone)]
pub struct NonPositiveRateError {
    pub pair: CurrencyPair,
    pub rate: Decimal,
}

impl fmt::Display for NonPositiveRateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rate for {} must be positive, got {}", self.pair, self.rate)
    }
}

impl std::error::Error for NonPositiveRateError {}
