//! Order creation, status transitions and expiry.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use swapdesk_common::{
    expires_after, parse_ttl_minutes, ActorContext, CreateOrderRequest, Currency, CurrencyCode,
    ExchangeError, Order, OrderId, OrderNumber, OrderStatus, Result, DEFAULT_ORDER_EXPIRY_MINUTES,
    ORDER_EXPIRY_MINUTES,
};
use swapdesk_fx::Calculator;
use swapdesk_store::{bounded, OrderQuery, OrderWrite, SharedStore, StoreError};
use tracing::{debug, info, instrument, warn};

use crate::audit::AuditLog;
use crate::number::{NumberGenerator, TimestampNumbers};
use crate::stats::{windows, OrderStatistics};

/// Background job name recorded on expiry audit entries.
pub const EXPIRY_SWEEPER: &str = "expiry-sweeper";

/// Largest page `list_orders` will serve.
pub const MAX_PAGE_SIZE: usize = 100;

/// Configuration for the lifecycle manager.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Bound on every store call.
    pub store_timeout: Duration,
    /// Attempts at a unique order number before giving up.
    pub order_number_attempts: usize,
    /// TTL used when the setting is missing or invalid.
    pub default_ttl_minutes: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_millis(2000),
            order_number_attempts: 5,
            default_ttl_minutes: DEFAULT_ORDER_EXPIRY_MINUTES,
        }
    }
}

/// A created order with its resolved currencies.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    pub order: Order,
    pub from_currency: Currency,
    pub to_currency: Currency,
}

/// Result of one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Orders moved to `expired`.
    pub expired: usize,
    /// Orders that left `pending` before the sweep reached them.
    pub skipped: usize,
}

/// One page of orders, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPage {
    pub items: Vec<Order>,
    pub total: u64,
    pub page: usize,
    pub page_size: usize,
}

/// Owns the order state machine.
///
/// Every state change is one store commit carrying the order mutation and
/// its audit entry. Status writes are compare-and-set on the status read
/// beforehand, so concurrent writers on one order never both succeed.
pub struct OrderLifecycleManager {
    store: SharedStore,
    calculator: Arc<Calculator>,
    audit: AuditLog,
    numbers: Arc<dyn NumberGenerator>,
    config: LifecycleConfig,
}

impl OrderLifecycleManager {
    pub fn new(store: SharedStore, calculator: Arc<Calculator>, config: LifecycleConfig) -> Self {
        Self::with_numbers(store, calculator, Arc::new(TimestampNumbers), config)
    }

    /// Create a manager with a custom order number source.
    pub fn with_numbers(
        store: SharedStore,
        calculator: Arc<Calculator>,
        numbers: Arc<dyn NumberGenerator>,
        config: LifecycleConfig,
    ) -> Self {
        let audit = AuditLog::new(store.clone(), config.store_timeout);
        Self {
            store,
            calculator,
            audit,
            numbers,
            config,
        }
    }

    /// Create a pending order priced at the current rate.
    #[instrument(skip(self, request, actor), fields(
        from = %request.from_currency,
        to = %request.to_currency,
        amount = %request.from_amount
    ))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
        actor: ActorContext,
    ) -> Result<OrderDetails> {
        request.validate()?;

        let from_currency = self.resolve_currency(&request.from_currency).await?;
        let to_currency = self.resolve_currency(&request.to_currency).await?;

        let quote = self
            .calculator
            .calculate(&request.from_currency, &request.to_currency, request.from_amount)
            .await?;

        let ttl_minutes = self.ttl_minutes().await?;
        let now = Utc::now();
        let expires_at = expires_after(now, ttl_minutes).ok_or_else(|| {
            ExchangeError::invalid_field("Order TTL is out of range", ORDER_EXPIRY_MINUTES)
        })?;

        for attempt in 1..=self.config.order_number_attempts {
            let order = Order {
                id: OrderId::new(),
                order_number: self.numbers.next(now),
                from_currency: request.from_currency.clone(),
                to_currency: request.to_currency.clone(),
                from_amount: quote.from_amount,
                to_amount: quote.to_amount,
                rate: quote.rate,
                commission: quote.commission,
                commission_percent: quote.commission_percent,
                status: OrderStatus::Pending,
                client: request.client.clone(),
                actor: actor.clone(),
                created_at: now,
                updated_at: now,
                expires_at,
                completed_at: None,
            };
            let entry = self.audit.order_created(&order, actor.clone());

            match self.commit(OrderWrite::insert(order, entry)).await {
                Ok(order) => {
                    info!(
                        order_id = %order.id,
                        order_number = %order.order_number,
                        to_amount = %order.to_amount,
                        expires_at = %order.expires_at,
                        "Order created"
                    );
                    return Ok(OrderDetails {
                        order,
                        from_currency,
                        to_currency,
                    });
                }
                Err(StoreError::DuplicateOrderNumber(number)) => {
                    warn!(order_number = %number, attempt, "Order number taken, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ExchangeError::Conflict(format!(
            "No unique order number after {} attempts",
            self.config.order_number_attempts
        )))
    }

    /// Move an order to `new_status`.
    #[instrument(skip(self, actor), fields(order_id = %order_id, to = %new_status))]
    pub async fn transition_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        actor: ActorContext,
    ) -> Result<Order> {
        let order = self.get_order(order_id).await?;
        let from = order.status;

        if !from.can_transition_to(new_status) {
            return Err(ExchangeError::InvalidTransition {
                from,
                to: new_status,
            });
        }

        match self.write_status(&order, new_status, actor).await {
            Ok(updated) => {
                info!(
                    order_number = %updated.order_number,
                    from = %from,
                    to = %new_status,
                    "Order status updated"
                );
                Ok(updated)
            }
            Err(StoreError::StaleWrite { actual, .. }) if !actual.can_transition_to(new_status) => {
                Err(ExchangeError::InvalidTransition {
                    from: actual,
                    to: new_status,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Expire every pending order whose `expires_at` is before `now`.
    #[instrument(skip(self))]
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let overdue = bounded(
            self.config.store_timeout,
            "expired_pending",
            self.store.expired_pending(now),
        )
        .await?;

        let mut report = SweepReport::default();
        for order in overdue {
            let actor = ActorContext::system(EXPIRY_SWEEPER);
            match self.write_status(&order, OrderStatus::Expired, actor).await {
                Ok(_) => {
                    debug!(order_number = %order.order_number, "Order expired");
                    report.expired += 1;
                }
                Err(StoreError::StaleWrite { actual, .. }) => {
                    debug!(order_number = %order.order_number, status = %actual, "Order left pending, skipping");
                    report.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        if report.expired > 0 {
            info!(expired = report.expired, skipped = report.skipped, "Marked orders as expired");
        }
        Ok(report)
    }

    /// One page of orders, optionally filtered by status.
    pub async fn list_orders(
        &self,
        page: usize,
        page_size: usize,
        status: Option<OrderStatus>,
    ) -> Result<OrderPage> {
        if page < 1 {
            return Err(ExchangeError::invalid_field("Page must be at least 1", "page"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ExchangeError::invalid_field(
                format!("Page size must be between 1 and {MAX_PAGE_SIZE}"),
                "page_size",
            ));
        }

        let query = OrderQuery::page(page, page_size, status);
        let (items, total) = bounded(
            self.config.store_timeout,
            "query_orders",
            self.store.query_orders(&query),
        )
        .await?;

        Ok(OrderPage {
            items,
            total,
            page,
            page_size,
        })
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        bounded(self.config.store_timeout, "get_order", self.store.get_order(order_id))
            .await?
            .ok_or_else(|| ExchangeError::OrderNotFound(order_id.to_string()))
    }

    pub async fn get_order_by_number(&self, number: &OrderNumber) -> Result<Order> {
        bounded(
            self.config.store_timeout,
            "get_order_by_number",
            self.store.get_order_by_number(number),
        )
        .await?
        .ok_or_else(|| ExchangeError::OrderNotFound(number.to_string()))
    }

    /// Order counts as of now.
    pub async fn statistics(&self) -> Result<OrderStatistics> {
        self.statistics_at(Utc::now()).await
    }

    /// Order counts with windows measured from `now`.
    pub async fn statistics_at(&self, now: DateTime<Utc>) -> Result<OrderStatistics> {
        let timeout = self.config.store_timeout;
        let (today_start, week_start) = windows(now);

        let by_status = bounded(timeout, "count_by_status", self.store.count_by_status()).await?;
        let today = bounded(
            timeout,
            "count_created_since",
            self.store.count_created_since(today_start),
        )
        .await?;
        let last_7_days = bounded(
            timeout,
            "count_created_since",
            self.store.count_created_since(week_start),
        )
        .await?;

        Ok(OrderStatistics {
            total: by_status.values().sum(),
            by_status,
            today,
            last_7_days,
        })
    }

    /// Audit entries for an order, oldest first.
    pub async fn audit_trail(&self, order_id: OrderId) -> Result<Vec<swapdesk_common::AuditEntry>> {
        self.audit.trail(order_id).await
    }

    async fn resolve_currency(&self, code: &CurrencyCode) -> Result<Currency> {
        let currency = bounded(self.config.store_timeout, "get_currency", self.store.get_currency(code))
            .await?;
        match currency {
            Some(currency) if currency.is_active => Ok(currency),
            _ => Err(ExchangeError::UnknownCurrency(code.clone())),
        }
    }

    async fn ttl_minutes(&self) -> Result<i64> {
        let raw = bounded(
            self.config.store_timeout,
            "get_setting",
            self.store.get_setting(ORDER_EXPIRY_MINUTES),
        )
        .await?;

        Ok(match raw.as_deref() {
            Some(value) => parse_ttl_minutes(value).unwrap_or_else(|| {
                warn!(value, "Invalid order TTL setting, using default");
                self.config.default_ttl_minutes
            }),
            None => self.config.default_ttl_minutes,
        })
    }

    /// Compare-and-set `order` from its current status to `status`.
    async fn write_status(
        &self,
        order: &Order,
        status: OrderStatus,
        actor: ActorContext,
    ) -> std::result::Result<Order, StoreError> {
        let now = Utc::now();
        let completed_at = (status == OrderStatus::Completed).then_some(now);
        let entry = self
            .audit
            .status_updated(order.id, order.status, status, completed_at, actor, now);

        self.commit(OrderWrite::update_status(
            order.id,
            order.status,
            status,
            completed_at,
            entry,
        ))
        .await
    }

    async fn commit(&self, write: OrderWrite) -> std::result::Result<Order, StoreError> {
        bounded(self.config.store_timeout, "commit", self.store.commit(write)).await
    }
}
