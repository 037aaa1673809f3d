//! Conversion quotes with commission.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use swapdesk_common::{
    default_commission_percent, parse_commission_percent, CurrencyCode, CurrencyPair,
    ExchangeError, ExchangeRate, COMMISSION_PERCENT,
};
use swapdesk_store::{bounded, SharedStore};
use tracing::{debug, instrument, warn};

use crate::cache::SharedRateCache;

/// A priced conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    pub from_amount: Decimal,
    /// Amount paid out, commission already deducted.
    pub to_amount: Decimal,
    pub rate: Decimal,
    pub commission: Decimal,
    pub commission_percent: Decimal,
    /// The cached rate the quote was priced from.
    pub rate_snapshot: ExchangeRate,
}

/// Calculator configuration.
#[derive(Debug, Clone)]
pub struct CalculatorConfig {
    /// Used when the commission setting is missing or out of range.
    pub default_commission_percent: Decimal,
    pub store_timeout: Duration,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            default_commission_percent: default_commission_percent(),
            store_timeout: Duration::from_millis(2000),
        }
    }
}

/// Split `amount × rate` into payout and commission.
///
/// Returns `(to_amount, commission)`, or `None` when the product does not fit a `Decimal`.
pub fn apply_commission(
    amount: Decimal,
    rate: Decimal,
    percent: Decimal,
) -> Option<(Decimal, Decimal)> {
    let base = amount.checked_mul(rate)?;
    let commission = base.checked_mul(percent)?.checked_div(Decimal::ONE_HUNDRED)?;
    Some((base.checked_sub(commission)?, commission))
}

/// Prices conversions from the rate cache.
pub struct Calculator {
    cache: SharedRateCache,
    store: SharedStore,
    config: CalculatorConfig,
}

impl Calculator {
    pub fn new(cache: SharedRateCache, store: SharedStore, config: CalculatorConfig) -> Self {
        Self {
            cache,
            store,
            config,
        }
    }

    /// Quote converting `from_amount` of `from` into `to`.
    #[instrument(skip(self), fields(from = %from, to = %to, amount = %from_amount))]
    pub async fn calculate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        from_amount: Decimal,
    ) -> Result<Quote, ExchangeError> {
        if from_amount <= Decimal::ZERO {
            return Err(ExchangeError::invalid_field("Amount must be positive", "from_amount"));
        }

        let pair = CurrencyPair::new(from.clone(), to.clone());
        let rate = self.cache.get(&pair)?;

        let currency = bounded(
            self.config.store_timeout,
            "get_currency",
            self.store.get_currency(from),
        )
        .await?
        .ok_or_else(|| ExchangeError::CurrencyNotFound(from.clone()))?;

        if from_amount < currency.min_amount {
            return Err(ExchangeError::BelowMinimum {
                currency: from.clone(),
                amount: from_amount,
                min: currency.min_amount,
            });
        }
        if let Some(max) = currency.max_amount {
            if from_amount > max {
                return Err(ExchangeError::AboveMaximum {
                    currency: from.clone(),
                    amount: from_amount,
                    max,
                });
            }
        }

        let commission_percent = self.commission_percent().await?;
        let (to_amount, commission) = apply_commission(from_amount, rate.rate, commission_percent)
            .ok_or_else(|| ExchangeError::invalid_field("Amount is too large", "from_amount"))?;

        debug!(%to_amount, %commission, "Quote calculated");
        Ok(Quote {
            from_currency: from.clone(),
            to_currency: to.clone(),
            from_amount,
            to_amount,
            rate: rate.rate,
            commission,
            commission_percent,
            rate_snapshot: rate,
        })
    }

    /// Current commission percentage, read on every call.
    pub async fn commission_percent(&self) -> Result<Decimal, ExchangeError> {
        let raw = bounded(
            self.config.store_timeout,
            "get_setting",
            self.store.get_setting(COMMISSION_PERCENT),
        )
        .await?;

        match raw.as_deref().map(|value| (value, parse_commission_percent(value))) {
            Some((_, Some(percent))) => Ok(percent),
            Some((value, None)) => {
                warn!(value, "Invalid commission setting, using default");
                Ok(self.config.default_commission_percent)
            }
            None => Ok(self.config.default_commission_percent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RateCache;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use swapdesk_common::{Currency, ErrorKind, Setting};
    use swapdesk_store::{MemoryStore, Store};

    async fn setup(rate: Decimal) -> (Calculator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        for currency in Currency::defaults() {
            store.upsert_currency(currency).await.unwrap();
        }

        let cache = Arc::new(RateCache::new());
        let pair = CurrencyPair::new(CurrencyCode::usdt_trc20(), CurrencyCode::rub_tbank());
        cache.replace(vec![ExchangeRate::new(pair, rate, "TEST", Utc::now()).unwrap()]);

        let calculator = Calculator::new(cache, store.clone(), CalculatorConfig::default());
        (calculator, store)
    }

    async fn set_commission(store: &MemoryStore, value: &str) {
        store
            .put_setting(Setting::new(COMMISSION_PERCENT, value, ""))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_commission_deducted_from_payout() {
        let (calculator, store) = setup(dec!(100)).await;
        set_commission(&store, "2").await;

        let quote = calculator
            .calculate(&CurrencyCode::usdt_trc20(), &CurrencyCode::rub_tbank(), dec!(10))
            .await
            .unwrap();

        assert_eq!(quote.to_amount, dec!(980));
        assert_eq!(quote.commission, dec!(20));
        assert_eq!(quote.commission_percent, dec!(2));
        assert_eq!(quote.rate, dec!(100));
    }

    #[tokio::test]
    async fn test_default_commission_when_setting_missing() {
        let (calculator, _) = setup(dec!(100)).await;

        let quote = calculator
            .calculate(&CurrencyCode::usdt_trc20(), &CurrencyCode::rub_tbank(), dec!(100))
            .await
            .unwrap();

        assert_eq!(quote.commission_percent, dec!(1.5));
        assert_eq!(quote.to_amount, dec!(9850));
    }

    #[tokio::test]
    async fn test_out_of_range_commission_falls_back() {
        let (calculator, store) = setup(dec!(100)).await;

        for value in ["-1", "100", "250", "abc"] {
            set_commission(&store, value).await;
            let percent = calculator.commission_percent().await.unwrap();
            assert_eq!(percent, dec!(1.5), "value {value}");
        }
    }

    #[tokio::test]
    async fn test_below_minimum() {
        let (calculator, _) = setup(dec!(100)).await;

        let err = calculator
            .calculate(&CurrencyCode::usdt_trc20(), &CurrencyCode::rub_tbank(), dec!(9.99))
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::BelowMinimum { min, .. } if min == dec!(10)));
    }

    #[tokio::test]
    async fn test_above_maximum() {
        let (calculator, store) = setup(dec!(100)).await;
        let capped = Currency::new(CurrencyCode::usdt_trc20(), "Tether USDT", dec!(10), 6)
            .with_max_amount(dec!(1000));
        store.upsert_currency(capped).await.unwrap();

        let err = calculator
            .calculate(&CurrencyCode::usdt_trc20(), &CurrencyCode::rub_tbank(), dec!(1000.01))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::AboveMaximum { .. }));

        assert!(calculator
            .calculate(&CurrencyCode::usdt_trc20(), &CurrencyCode::rub_tbank(), dec!(1000))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_missing_rate_is_not_found() {
        let (calculator, _) = setup(dec!(100)).await;

        let err = calculator
            .calculate(&CurrencyCode::btc(), &CurrencyCode::eth(), dec!(1))
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::RateNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_unknown_source_currency() {
        let (calculator, _) = setup(dec!(100)).await;
        let cache_pair = CurrencyPair::new(CurrencyCode::new("DOGE"), CurrencyCode::btc());
        calculator
            .cache
            .replace(vec![ExchangeRate::new(cache_pair, dec!(0.000002), "TEST", Utc::now()).unwrap()]);

        let err = calculator
            .calculate(&CurrencyCode::new("DOGE"), &CurrencyCode::btc(), dec!(100))
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::CurrencyNotFound(_)));
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let (calculator, _) = setup(dec!(100)).await;

        for amount in [Decimal::ZERO, dec!(-5)] {
            let err = calculator
                .calculate(&CurrencyCode::usdt_trc20(), &CurrencyCode::rub_tbank(), amount)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn test_oversized_amount_rejected() {
        let (calculator, _) = setup(dec!(97)).await;

        let err = tokio_test::assert_err!(
            calculator
                .calculate(&CurrencyCode::usdt_trc20(), &CurrencyCode::rub_tbank(), Decimal::MAX)
                .await
        );

        assert!(matches!(
            err,
            ExchangeError::InvalidRequest { ref field, .. } if field.as_deref() == Some("from_amount")
        ));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    proptest! {
        #[test]
        fn prop_payout_monotonic_in_amount(
            a in 1u64..1_000_000_000,
            b in 1u64..1_000_000_000,
            rate_milli in 1u64..10_000_000,
            percent_tenths in 0u32..999,
        ) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            let rate = Decimal::new(rate_milli as i64, 3);
            let percent = Decimal::new(percent_tenths as i64, 1);

            let (low_out, _) = apply_commission(Decimal::from(low), rate, percent).unwrap();
            let (high_out, _) = apply_commission(Decimal::from(high), rate, percent).unwrap();

            prop_assert!(low_out <= high_out);
            prop_assert!(low_out > Decimal::ZERO);
        }
    }
}
