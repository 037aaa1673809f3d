//! End-to-end flows through the assembled exchange.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use rust_decimal_macros::dec;

use swapdesk_common::{
    ActorContext, AuditAction, ClientDetails, CreateOrderRequest, CurrencyCode, ErrorKind,
    OrderStatus, Setting, COMMISSION_PERCENT,
};
use swapdesk_fx::MockPriceSource;
use swapdesk_node::{Exchange, NodeConfig, NodeState};
use swapdesk_store::{MemoryStore, Store};

struct Harness {
    exchange: Exchange,
    store: Arc<MemoryStore>,
    source: Arc<MockPriceSource>,
}

fn harness_with(config: NodeConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(MockPriceSource::with_defaults());
    let exchange = Exchange::new(config, store.clone(), source.clone());
    Harness {
        exchange,
        store,
        source,
    }
}

async fn ready() -> Harness {
    let h = harness_with(NodeConfig::default());
    h.exchange.bootstrap().await.unwrap();
    h.exchange.refresh_rates().await.unwrap();
    h
}

fn usdt() -> CurrencyCode {
    CurrencyCode::usdt_trc20()
}

fn rub() -> CurrencyCode {
    CurrencyCode::rub_tbank()
}

fn order_request(amount: rust_decimal::Decimal) -> CreateOrderRequest {
    CreateOrderRequest::new(
        usdt(),
        rub(),
        amount,
        ClientDetails {
            name: "Anna Smirnova".into(),
            phone: "+79990001122".into(),
            email: "anna@example.org".into(),
            telegram: None,
            recipient_wallet: "2200700098765432".into(),
            recipient_details: Some("T-Bank card".into()),
        },
    )
}

fn web_client() -> ActorContext {
    ActorContext::new("203.0.113.7", "Mozilla/5.0")
}

#[tokio::test]
async fn test_bootstrap_seeds_once() {
    let h = harness_with(NodeConfig::default());

    let first = h.exchange.bootstrap().await.unwrap();
    assert_eq!(first.currencies_seeded, 4);
    assert_eq!(first.settings_seeded, 2);

    h.store
        .put_setting(Setting::new(COMMISSION_PERCENT, "3", ""))
        .await
        .unwrap();

    let second = h.exchange.bootstrap().await.unwrap();
    assert_eq!(second.currencies_seeded, 0);
    assert_eq!(second.settings_seeded, 0);
    assert_eq!(
        h.store.get_setting(COMMISSION_PERCENT).await.unwrap().as_deref(),
        Some("3")
    );

    let codes: Vec<String> = h
        .exchange
        .get_all_currencies()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.code.to_string())
        .collect();
    assert_eq!(codes, vec!["BTC", "ETH", "RUB_TBANK", "USDT_TRC20"]);
}

#[tokio::test]
async fn test_currency_lookup() {
    let h = ready().await;

    let btc = h.exchange.get_currency_by_code(&CurrencyCode::btc()).await.unwrap();
    assert_eq!(btc.decimals, 8);

    let err = h
        .exchange
        .get_currency_by_code(&CurrencyCode::new("XRP"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_rates_carry_margin() {
    let h = ready().await;

    let rates = h.exchange.get_all_rates();
    assert_eq!(rates.len(), 4);

    let usdt_rub = h.exchange.get_rate(&usdt(), &rub()).unwrap();
    assert_eq!(usdt_rub.rate, dec!(96.9));
    assert_eq!(usdt_rub.source, "mock");

    let rub_usdt = h.exchange.get_rate(&rub(), &usdt()).unwrap();
    assert_eq!(rub_usdt.rate.round_dp(12), (dec!(1) / dec!(96.9)).round_dp(12));

    let err = h.exchange.get_rate(&CurrencyCode::eth(), &usdt()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_calculate_quote() {
    let h = ready().await;

    let quote = h.exchange.calculate(&usdt(), &rub(), dec!(100)).await.unwrap();

    assert_eq!(quote.rate, dec!(96.9));
    assert_eq!(quote.commission_percent, dec!(1.5));
    assert_eq!(quote.commission, dec!(145.35));
    assert_eq!(quote.to_amount, dec!(9544.65));
}

#[tokio::test]
async fn test_failed_refresh_leaves_rates_unchanged() {
    let h = ready().await;
    let before = h.exchange.get_all_rates();

    h.source.set_price("tether", "rub", dec!(120));
    h.source.set_failing(true);
    let err = h.exchange.refresh_rates().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
    assert_eq!(h.exchange.get_all_rates(), before);
}

#[tokio::test]
async fn test_restart_serves_persisted_rates() {
    let h = ready().await;
    let before = h.exchange.get_all_rates();

    let source = Arc::new(MockPriceSource::new());
    source.set_failing(true);
    let restarted = Exchange::new(NodeConfig::default(), h.store.clone(), source);

    let report = restarted.bootstrap().await.unwrap();
    assert_eq!(report.rates_loaded, 4);
    assert_eq!(restarted.get_all_rates(), before);
}

#[tokio::test]
async fn test_order_lifecycle_end_to_end() {
    let h = ready().await;

    let details = h
        .exchange
        .create_order(order_request(dec!(250)), web_client())
        .await
        .unwrap();
    let order = details.order;
    assert_eq!(details.to_currency.code, rub());

    let fetched = h.exchange.get_order_by_number(&order.order_number).await.unwrap();
    assert_eq!(fetched.id, order.id);

    let operator = ActorContext::new("10.0.0.2", "back-office");
    for next in [OrderStatus::Confirmed, OrderStatus::Processing, OrderStatus::Completed] {
        h.exchange
            .transition_status(order.id, next, operator.clone())
            .await
            .unwrap();
    }

    let done = h.exchange.get_order_by_number(&order.order_number).await.unwrap();
    assert_eq!(done.status, OrderStatus::Completed);
    assert!(done.completed_at.is_some());
    assert_eq!(done.to_amount, order.to_amount);

    let trail = h.exchange.audit_trail(order.id).await.unwrap();
    assert_eq!(trail.len(), 4);
    assert_eq!(trail[0].action, AuditAction::OrderCreated);
    assert_eq!(trail[0].actor, web_client());
    assert!(trail[1..].iter().all(|e| e.action == AuditAction::StatusUpdated));

    let stats = h.exchange.statistics().await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.count(OrderStatus::Completed), 1);

    let page = h
        .exchange
        .list_orders(1, 20, Some(OrderStatus::Completed))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].order_number, order.order_number);
}

#[tokio::test]
async fn test_rate_change_does_not_touch_existing_order() {
    let h = ready().await;
    let order = h
        .exchange
        .create_order(order_request(dec!(100)), web_client())
        .await
        .unwrap()
        .order;

    h.source.set_price("tether", "rub", dec!(80));
    h.exchange.refresh_rates().await.unwrap();

    let stored = h.exchange.get_order_by_number(&order.order_number).await.unwrap();
    assert_eq!(stored.rate, dec!(96.9));
    assert_eq!(stored.to_amount, order.to_amount);
    assert_ne!(h.exchange.get_rate(&usdt(), &rub()).unwrap().rate, stored.rate);
}

#[tokio::test]
async fn test_expiry_sweep_through_exchange() {
    let h = ready().await;
    let order = h
        .exchange
        .create_order(order_request(dec!(100)), web_client())
        .await
        .unwrap()
        .order;

    let report = h
        .exchange
        .sweep_expired(order.created_at + ChronoDuration::minutes(31))
        .await
        .unwrap();
    assert_eq!(report.expired, 1);

    let err = h
        .exchange
        .transition_status(order.id, OrderStatus::Confirmed, web_client())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[tokio::test]
async fn test_background_loops_start_and_stop() {
    let mut config = NodeConfig::default();
    config.rates.refresh_interval = Duration::from_millis(20);
    config.orders.sweep_interval = Duration::from_millis(20);
    let h = harness_with(config);

    h.exchange.start().await.unwrap();
    assert_eq!(h.exchange.state(), NodeState::Running);
    assert!(h.exchange.is_accepting_requests());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.exchange.get_all_rates().len(), 4);
    assert!(h.source.fetch_count() >= 2);

    h.exchange.stop().await;
    assert_eq!(h.exchange.state(), NodeState::Stopped);
    assert!(!h.exchange.is_accepting_requests());

    let fetches = h.source.fetch_count();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(h.source.fetch_count(), fetches);
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let h = harness_with(NodeConfig::default());
    tokio_test::assert_ok!(h.exchange.start().await);

    let err = tokio_test::assert_err!(h.exchange.start().await);
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.exchange.state(), NodeState::Running);

    h.exchange.stop().await;
    tokio_test::assert_ok!(h.exchange.start().await);
    assert!(h.exchange.is_accepting_requests());
    h.exchange.stop().await;
}

#[tokio::test]
async fn test_failed_bootstrap_leaves_node_stopped() {
    let mut config = NodeConfig::default();
    config.store_timeout = Duration::from_millis(10);
    let h = harness_with(config);
    h.store.set_latency(Duration::from_millis(50));

    let err = tokio_test::assert_err!(h.exchange.start().await);
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(h.exchange.state(), NodeState::Stopped);
    assert!(!h.exchange.is_accepting_requests());

    h.store.set_latency(Duration::ZERO);
    tokio_test::assert_ok!(h.exchange.start().await);
    assert_eq!(h.exchange.state(), NodeState::Running);
    h.exchange.stop().await;
}
