//! Margin policy and pair derivation rules.

use rust_decimal::Decimal;
use swapdesk_common::{CurrencyCode, CurrencyPair};

/// How a pair's rate relates to its spot price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// `rate = price`: one unit of `from` is worth `price` units of `to`.
    Direct,
    /// `rate = 1 / price`: `from` is the quote currency of the spot price.
    Inverse,
}

/// Markup applied to spot prices before they are served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarginPolicy {
    /// Fraction, e.g. `0.02` for 2%.
    pub margin: Decimal,
}

impl MarginPolicy {
    pub fn new(margin: Decimal) -> Self {
        Self { margin }
    }

    /// Policy from a percentage, e.g. `2` for 2%.
    pub fn from_percent(percent: Decimal) -> Self {
        Self::new(percent / Decimal::ONE_HUNDRED)
    }

    /// Derive the served rate from a spot price.
    ///
    /// Direct legs are multiplied by `1 + margin`, inverse legs divided by it.
    /// Returns `None` for non-positive prices or when the result does not fit a `Decimal`.
    pub fn apply(&self, price: Decimal, orientation: Orientation) -> Option<Decimal> {
        if price <= Decimal::ZERO {
            return None;
        }
        let factor = Decimal::ONE + self.margin;
        if factor <= Decimal::ZERO {
            return None;
        }

        match orientation {
            Orientation::Direct => price.checked_mul(factor),
            Orientation::Inverse => Decimal::ONE.checked_div(price)?.checked_div(factor),
        }
    }
}

impl Default for MarginPolicy {
    fn default() -> Self {
        Self::new(Decimal::new(2, 2))
    }
}

/// How one configured pair is derived from a spot price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairRule {
    pub pair: CurrencyPair,
    /// Price source asset id, e.g. `bitcoin`.
    pub asset: String,
    /// Price source quote currency, e.g. `usd`.
    pub quote: String,
    pub orientation: Orientation,
}

impl PairRule {
    pub fn new(
        from: CurrencyCode,
        to: CurrencyCode,
        asset: impl Into<String>,
        quote: impl Into<String>,
        orientation: Orientation,
    ) -> Self {
        Self {
            pair: CurrencyPair::new(from, to),
            asset: asset.into(),
            quote: quote.into(),
            orientation,
        }
    }

    /// `asset/quote` label used in logs and errors.
    pub fn price_key(&self) -> String {
        format!("{}/{}", self.asset, self.quote)
    }

    /// The four pairs quoted out of the box.
    pub fn defaults() -> Vec<PairRule> {
        vec![
            PairRule::new(
                CurrencyCode::usdt_trc20(),
                CurrencyCode::btc(),
                "bitcoin",
                "usd",
                Orientation::Inverse,
            ),
            PairRule::new(
                CurrencyCode::btc(),
                CurrencyCode::usdt_trc20(),
                "bitcoin",
                "usd",
                Orientation::Direct,
            ),
            PairRule::new(
                CurrencyCode::usdt_trc20(),
                CurrencyCode::rub_tbank(),
                "tether",
                "rub",
                Orientation::Direct,
            ),
            PairRule::new(
                CurrencyCode::rub_tbank(),
                CurrencyCode::usdt_trc20(),
                "tether",
                "rub",
                Orientation::Inverse,
            ),
        ]
    }
}
