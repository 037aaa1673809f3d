//! The persistence contract.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use swapdesk_common::{
    AuditEntry, Currency, CurrencyCode, ExchangeRate, Order, OrderId, OrderNumber, OrderStatus,
    Setting,
};

use crate::batch::{OrderQuery, OrderWrite};
use crate::error::StoreResult;

/// Durable storage for SwapDesk records.
///
/// The audit trail is append-only: entries are only added through
/// [`Store::commit`] and nothing in this contract updates or removes them.
#[async_trait]
pub trait Store: Send + Sync {
    /// List currencies, optionally only active ones, ordered by code.
    async fn list_currencies(&self, active_only: bool) -> StoreResult<Vec<Currency>>;

    /// Get a currency by code regardless of activity.
    async fn get_currency(&self, code: &CurrencyCode) -> StoreResult<Option<Currency>>;

    /// Insert or replace a currency.
    async fn upsert_currency(&self, currency: Currency) -> StoreResult<()>;

    /// Insert a currency unless its code exists. Returns whether it was inserted.
    async fn insert_currency_if_absent(&self, currency: Currency) -> StoreResult<bool>;

    /// Upsert a batch of rates by pair. All or nothing.
    async fn upsert_rates(&self, rates: &[ExchangeRate]) -> StoreResult<()>;

    /// List active rates.
    async fn list_rates(&self) -> StoreResult<Vec<ExchangeRate>>;

    /// Get a setting value.
    async fn get_setting(&self, key: &str) -> StoreResult<Option<String>>;

    /// Insert or replace a setting.
    async fn put_setting(&self, setting: Setting) -> StoreResult<()>;

    /// Insert a setting unless its key exists. Returns whether it was inserted.
    async fn seed_setting(&self, setting: Setting) -> StoreResult<bool>;

    /// Apply an order mutation and append its audit entry atomically.
    /// Returns the order as stored after the write.
    async fn commit(&self, write: OrderWrite) -> StoreResult<Order>;

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    async fn get_order_by_number(&self, number: &OrderNumber) -> StoreResult<Option<Order>>;

    /// One page of orders, newest first, with the total matching count.
    async fn query_orders(&self, query: &OrderQuery) -> StoreResult<(Vec<Order>, u64)>;

    /// Pending orders whose `expires_at` is before `now`.
    async fn expired_pending(&self, now: DateTime<Utc>) -> StoreResult<Vec<Order>>;

    async fn count_by_status(&self) -> StoreResult<BTreeMap<OrderStatus, u64>>;

    async fn count_created_since(&self, since: DateTime<Utc>) -> StoreResult<u64>;

    /// Audit entries for an order, oldest first.
    async fn audit_trail(&self, order_id: OrderId) -> StoreResult<Vec<AuditEntry>>;
}

/// Shared store handle.
pub type SharedStore = Arc<dyn Store>;
