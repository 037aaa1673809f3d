//! In-memory store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use swapdesk_common::{
    AuditEntry, Currency, CurrencyCode, CurrencyPair, ExchangeRate, Order, OrderId, OrderNumber,
    OrderStatus, Setting,
};

use crate::batch::{OrderMutation, OrderQuery, OrderWrite};
use crate::error::{StoreError, StoreResult};
use crate::traits::Store;

/// Orders and their audit trail share one lock so a commit is atomic.
#[derive(Default)]
struct OrderTables {
    orders: HashMap<OrderId, Order>,
    by_number: HashMap<OrderNumber, OrderId>,
    audit: Vec<AuditEntry>,
}

/// Injected failures for tests.
#[derive(Default)]
struct Faults {
    fail_audit: AtomicBool,
    fail_rates: AtomicBool,
    latency_ms: AtomicU64,
}

/// Thread-safe in-memory [`Store`].
#[derive(Default)]
pub struct MemoryStore {
    currencies: DashMap<CurrencyCode, Currency>,
    settings: DashMap<String, Setting>,
    rates: RwLock<HashMap<CurrencyPair, ExchangeRate>>,
    tables: RwLock<OrderTables>,
    faults: Faults,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of audit entries recorded.
    pub fn audit_len(&self) -> usize {
        self.tables.read().audit.len()
    }

    /// Make every commit fail as if the audit append was rejected.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn fail_audit_appends(&self, fail: bool) {
        self.faults.fail_audit.store(fail, Ordering::SeqCst);
    }

    /// Make every rate upsert fail.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn fail_rate_upserts(&self, fail: bool) {
        self.faults.fail_rates.store(fail, Ordering::SeqCst);
    }

    /// Delay commits, rate upserts and setting seeds by `latency`.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn set_latency(&self, latency: Duration) {
        self.faults
            .latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    async fn simulate_latency(&self) {
        let ms = self.faults.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    fn apply(&self, write: OrderWrite) -> StoreResult<Order> {
        let mut tables = self.tables.write();
        let fail_audit = self.faults.fail_audit.load(Ordering::SeqCst);

        // Every check runs before the first write so a failure leaves no trace.
        match write.mutation {
            OrderMutation::Insert(order) => {
                if tables.by_number.contains_key(&order.order_number) {
                    return Err(StoreError::DuplicateOrderNumber(order.order_number));
                }
                if fail_audit {
                    return Err(StoreError::Backend("audit append rejected".to_string()));
                }

                tables.by_number.insert(order.order_number.clone(), order.id);
                tables.orders.insert(order.id, order.clone());
                tables.audit.push(write.audit);

                debug!(order_number = %order.order_number, "Order inserted");
                Ok(order)
            }
            OrderMutation::UpdateStatus {
                id,
                expected,
                status,
                completed_at,
                at,
            } => {
                let current = tables
                    .orders
                    .get(&id)
                    .map(|order| order.status)
                    .ok_or(StoreError::OrderNotFound(id))?;

                if current != expected {
                    return Err(StoreError::StaleWrite {
                        id,
                        expected,
                        actual: current,
                    });
                }
                if fail_audit {
                    return Err(StoreError::Backend("audit append rejected".to_string()));
                }

                let updated = {
                    let order = tables
                        .orders
                        .get_mut(&id)
                        .ok_or(StoreError::OrderNotFound(id))?;
                    order.status = status;
                    order.updated_at = at;
                    if completed_at.is_some() {
                        order.completed_at = completed_at;
                    }
                    order.clone()
                };
                tables.audit.push(write.audit);

                debug!(order_id = %id, from = %expected, to = %status, "Order status updated");
                Ok(updated)
            }
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_currencies(&self, active_only: bool) -> StoreResult<Vec<Currency>> {
        let mut currencies: Vec<Currency> = self
            .currencies
            .iter()
            .filter(|entry| !active_only || entry.is_active)
            .map(|entry| entry.value().clone())
            .collect();
        currencies.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(currencies)
    }

    async fn get_currency(&self, code: &CurrencyCode) -> StoreResult<Option<Currency>> {
        Ok(self.currencies.get(code).map(|c| c.clone()))
    }

    async fn upsert_currency(&self, currency: Currency) -> StoreResult<()> {
        self.currencies.insert(currency.code.clone(), currency);
        Ok(())
    }

    async fn insert_currency_if_absent(&self, currency: Currency) -> StoreResult<bool> {
        let mut inserted = false;
        self.currencies
            .entry(currency.code.clone())
            .or_insert_with(|| {
                inserted = true;
                currency
            });
        Ok(inserted)
    }

    async fn upsert_rates(&self, rates: &[ExchangeRate]) -> StoreResult<()> {
        self.simulate_latency().await;
        if self.faults.fail_rates.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("rate upsert rejected".to_string()));
        }

        let mut table = self.rates.write();
        for rate in rates {
            table.insert(rate.pair.clone(), rate.clone());
        }
        Ok(())
    }

    async fn list_rates(&self) -> StoreResult<Vec<ExchangeRate>> {
        let mut rates: Vec<ExchangeRate> = self
            .rates
            .read()
            .values()
            .filter(|rate| rate.is_active)
            .cloned()
            .collect();
        rates.sort_by(|a, b| a.pair.cmp(&b.pair));
        Ok(rates)
    }

    async fn get_setting(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.settings.get(key).map(|s| s.value.clone()))
    }

    async fn put_setting(&self, setting: Setting) -> StoreResult<()> {
        self.settings.insert(setting.key.clone(), setting);
        Ok(())
    }

    async fn seed_setting(&self, setting: Setting) -> StoreResult<bool> {
        self.simulate_latency().await;
        let mut inserted = false;
        self.settings.entry(setting.key.clone()).or_insert_with(|| {
            inserted = true;
            setting
        });
        Ok(inserted)
    }

    async fn commit(&self, write: OrderWrite) -> StoreResult<Order> {
        self.simulate_latency().await;
        self.apply(write)
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.tables.read().orders.get(&id).cloned())
    }

    async fn get_order_by_number(&self, number: &OrderNumber) -> StoreResult<Option<Order>> {
        let tables = self.tables.read();
        Ok(tables
            .by_number
            .get(number)
            .and_then(|id| tables.orders.get(id))
            .cloned())
    }

    async fn query_orders(&self, query: &OrderQuery) -> StoreResult<(Vec<Order>, u64)> {
        let tables = self.tables.read();
        let mut matching: Vec<&Order> = tables
            .orders
            .values()
            .filter(|order| query.status.map_or(true, |status| order.status == status))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn expired_pending(&self, now: DateTime<Utc>) -> StoreResult<Vec<Order>> {
        let mut expired: Vec<Order> = self
            .tables
            .read()
            .orders
            .values()
            .filter(|order| order.is_expired_at(now))
            .cloned()
            .collect();
        expired.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));
        Ok(expired)
    }

    async fn count_by_status(&self) -> StoreResult<BTreeMap<OrderStatus, u64>> {
        let mut counts = BTreeMap::new();
        for order in self.tables.read().orders.values() {
            *counts.entry(order.status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn count_created_since(&self, since: DateTime<Utc>) -> StoreResult<u64> {
        let count = self
            .tables
            .read()
            .orders
            .values()
            .filter(|order| order.created_at >= since)
            .count();
        Ok(count as u64)
    }

    async fn audit_trail(&self, order_id: OrderId) -> StoreResult<Vec<AuditEntry>> {
        Ok(self
            .tables
            .read()
            .audit
            .iter()
            .filter(|entry| entry.order_id == Some(order_id))
            .cloned()
            .collect())
    }
}
