//! The assembled exchange service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use swapdesk_common::{
    ActorContext, AuditEntry, CreateOrderRequest, Currency, CurrencyCode, CurrencyPair,
    ExchangeError, ExchangeRate, Order, OrderId, OrderNumber, OrderStatus, Result, Setting,
};
use swapdesk_fx::{
    Calculator, PriceSource, Quote, RateCache, RateUpdater, RefreshReport, SharedRateCache,
};
use swapdesk_orders::{OrderDetails, OrderLifecycleManager, OrderPage, OrderStatistics, SweepReport};
use swapdesk_store::{bounded, SharedStore};

use crate::config::NodeConfig;
use crate::scheduler::BackgroundTasks;
use crate::state::NodeState;

/// What first-boot seeding inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub currencies_seeded: usize,
    pub settings_seeded: usize,
    pub rates_loaded: usize,
}

/// Every component wired once and shared by handle.
pub struct Exchange {
    config: NodeConfig,
    store: SharedStore,
    cache: SharedRateCache,
    updater: Arc<RateUpdater>,
    calculator: Arc<Calculator>,
    orders: Arc<OrderLifecycleManager>,
    state: RwLock<NodeState>,
    tasks: tokio::sync::Mutex<Option<BackgroundTasks>>,
}

impl Exchange {
    /// Wire the exchange over `store` and `source`.
    pub fn new(config: NodeConfig, store: SharedStore, source: Arc<dyn PriceSource>) -> Self {
        let cache = Arc::new(RateCache::new());
        let updater = Arc::new(RateUpdater::new(
            source,
            store.clone(),
            cache.clone(),
            config.updater_config(),
        ));
        let calculator = Arc::new(Calculator::new(
            cache.clone(),
            store.clone(),
            config.calculator_config(),
        ));
        let orders = Arc::new(OrderLifecycleManager::new(
            store.clone(),
            calculator.clone(),
            config.lifecycle_config(),
        ));

        Self {
            config,
            store,
            cache,
            updater,
            calculator,
            orders,
            state: RwLock::new(NodeState::Starting),
            tasks: tokio::sync::Mutex::new(None),
        }
    }

    /// Seed default currencies and settings where absent, then warm the rate cache.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> Result<BootstrapReport> {
        let timeout = self.config.store_timeout;
        let mut report = BootstrapReport::default();

        for currency in Currency::defaults() {
            let code = currency.code.clone();
            if bounded(timeout, "insert_currency", self.store.insert_currency_if_absent(currency))
                .await?
            {
                info!(currency = %code, "Seeded currency");
                report.currencies_seeded += 1;
            }
        }

        for setting in Setting::defaults() {
            let key = setting.key.clone();
            if bounded(timeout, "seed_setting", self.store.seed_setting(setting)).await? {
                info!(setting = %key, "Seeded setting");
                report.settings_seeded += 1;
            }
        }

        report.rates_loaded = self.cache.warm(self.store.as_ref()).await?;

        info!(
            currencies_seeded = report.currencies_seeded,
            settings_seeded = report.settings_seeded,
            rates_loaded = report.rates_loaded,
            "Bootstrap complete"
        );
        Ok(report)
    }

    /// Bootstrap and start the background loops.
    ///
    /// Fails with `Conflict` while the loops from an earlier `start` are still running.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let mut tasks = self.tasks.lock().await;
        if tasks.is_some() {
            return Err(ExchangeError::Conflict("Exchange is already running".to_string()));
        }

        info!("Starting exchange");
        *self.state.write() = NodeState::Starting;

        if let Err(e) = self.bootstrap().await {
            warn!(error = %e, "Bootstrap failed");
            *self.state.write() = NodeState::Stopped;
            return Err(e);
        }

        *tasks = Some(BackgroundTasks::spawn(
            self.updater.clone(),
            self.orders.clone(),
            self.config.orders.sweep_interval,
        ));

        *self.state.write() = NodeState::Running;
        info!("Exchange started");
        Ok(())
    }

    /// Stop the background loops and wait for them to drain.
    #[instrument(skip(self))]
    pub async fn stop(&self) {
        info!("Stopping exchange");
        *self.state.write() = NodeState::ShuttingDown;

        if let Some(tasks) = self.tasks.lock().await.take() {
            tasks.stop().await;
        }

        *self.state.write() = NodeState::Stopped;
        info!("Exchange stopped");
    }

    /// Get the current node state.
    pub fn state(&self) -> NodeState {
        *self.state.read()
    }

    /// Check if the background loops are running.
    pub fn is_accepting_requests(&self) -> bool {
        self.state.read().accepts_requests()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    // --- Currencies and rates ---

    /// Active currencies ordered by code.
    pub async fn get_all_currencies(&self) -> Result<Vec<Currency>> {
        Ok(bounded(
            self.config.store_timeout,
            "list_currencies",
            self.store.list_currencies(true),
        )
        .await?)
    }

    /// An active currency by code.
    pub async fn get_currency_by_code(&self, code: &CurrencyCode) -> Result<Currency> {
        let currency = bounded(
            self.config.store_timeout,
            "get_currency",
            self.store.get_currency(code),
        )
        .await?;

        currency
            .filter(|c| c.is_active)
            .ok_or_else(|| ExchangeError::CurrencyNotFound(code.clone()))
    }

    /// Every served rate.
    pub fn get_all_rates(&self) -> Vec<ExchangeRate> {
        self.cache.get_all()
    }

    pub fn get_rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<ExchangeRate> {
        Ok(self.cache.get(&CurrencyPair::new(from.clone(), to.clone()))?)
    }

    /// Quote a conversion without creating an order.
    pub async fn calculate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        from_amount: Decimal,
    ) -> Result<Quote> {
        self.calculator.calculate(from, to, from_amount).await
    }

    /// Run one rate refresh now.
    pub async fn refresh_rates(&self) -> Result<RefreshReport> {
        Ok(self.updater.refresh().await?)
    }

    // --- Orders ---

    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
        actor: ActorContext,
    ) -> Result<OrderDetails> {
        self.orders.create_order(request, actor).await
    }

    pub async fn get_order_by_number(&self, number: &OrderNumber) -> Result<Order> {
        self.orders.get_order_by_number(number).await
    }

    pub async fn list_orders(
        &self,
        page: usize,
        page_size: usize,
        status: Option<OrderStatus>,
    ) -> Result<OrderPage> {
        self.orders.list_orders(page, page_size, status).await
    }

    pub async fn transition_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        actor: ActorContext,
    ) -> Result<Order> {
        self.orders.transition_status(order_id, new_status, actor).await
    }

    pub async fn statistics(&self) -> Result<OrderStatistics> {
        self.orders.statistics().await
    }

    /// Run one expiry sweep as of `now`.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        self.orders.sweep_expired(now).await
    }

    pub async fn audit_trail(&self, order_id: OrderId) -> Result<Vec<AuditEntry>> {
        self.orders.audit_trail(order_id).await
    }
}
