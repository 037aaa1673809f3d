//! Runtime settings read from the store.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Setting key holding the order time-to-live in minutes.
pub const ORDER_EXPIRY_MINUTES: &str = "order_expiry_minutes";

/// Setting key holding the commission percentage.
pub const COMMISSION_PERCENT: &str = "commission_percent";

/// Order TTL used when the setting is missing or invalid.
pub const DEFAULT_ORDER_EXPIRY_MINUTES: i64 = 30;

/// Longest accepted order TTL (one year).
pub const MAX_ORDER_EXPIRY_MINUTES: i64 = 365 * 24 * 60;

/// Commission used when the setting is missing or invalid (1.5%).
pub fn default_commission_percent() -> Decimal {
    Decimal::new(15, 1)
}

/// A key/value setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub description: String,
}

impl Setting {
    pub fn new(key: impl Into<String>, value: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            description: description.into(),
        }
    }

    /// The settings seeded on first boot.
    pub fn defaults() -> Vec<Setting> {
        vec![
            Setting::new(
                ORDER_EXPIRY_MINUTES,
                DEFAULT_ORDER_EXPIRY_MINUTES.to_string(),
                "Order time-to-live in minutes",
            ),
            Setting::new(
                COMMISSION_PERCENT,
                default_commission_percent().to_string(),
                "Commission in percent",
            ),
        ]
    }
}

/// Parse a commission percentage. Accepts `0 <= p < 100`.
pub fn parse_commission_percent(raw: &str) -> Option<Decimal> {
    let percent: Decimal = raw.trim().parse().ok()?;
    (percent >= Decimal::ZERO && percent < Decimal::ONE_HUNDRED).then_some(percent)
}

/// Parse an order TTL in minutes. Accepts `1..=MAX_ORDER_EXPIRY_MINUTES`.
pub fn parse_ttl_minutes(raw: &str) -> Option<i64> {
    let minutes: i64 = raw.trim().parse().ok()?;
    (1..=MAX_ORDER_EXPIRY_MINUTES).contains(&minutes).then_some(minutes)
}
