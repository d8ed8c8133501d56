//! Client library against a running server and a mocked payment provider.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde_json::json;
use storefront::api::{self, AppState};
use storefront::client::{CartApi, CartSessionManager, CheckoutOrchestrator, CouponOutcome, HttpStorefrontClient};
use storefront::domain::aggregates::{CartItem, Coupon, Product};
use storefront::domain::subscription::SubscriptionPlans;
use storefront::messaging::EventPublisher;
use storefront::services::payments::HttpPaymentGateway;
use storefront::storage::{DocumentStore, MemoryStore, Repository};
use storefront::{Money, ProductId, UserId};
use testresult::TestResult;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    store: Arc<dyn DocumentStore>,
    client: Arc<HttpStorefrontClient>,
    provider: MockServer,
}

fn plans() -> SubscriptionPlans { SubscriptionPlans::new(["plan-mensual"]) }

async fn harness() -> TestResult<Harness> {
    let provider = MockServer::start().await;
    Mock::given(method("POST")).and(path("/orders"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "ord-1" })))
        .mount(&provider).await;
    Mock::given(method("POST")).and(path("/orders/ord-1/capture"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cap-1", "status": "completed" })))
        .mount(&provider).await;
    Mock::given(method("POST")).and(path("/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cs_1", "url": "https://pay.test/cs_1" })))
        .mount(&provider).await;
    Mock::given(method("GET")).and(path("/sessions/cs_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cs_1", "status": "paid" })))
        .mount(&provider).await;

    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::default());
    Repository::<Coupon>::new(store.clone()).insert(Coupon::new("DIEZ", dec!(10), NaiveDate::MAX)).await?;
    let mut widget = Product::create("Widget", Money::new(dec!(100)));
    widget.stock = 5;
    Repository::<Product>::new(store.clone()).put("P1", &widget).await?;

    let events = EventPublisher::disabled();
    let state = AppState::new(store.clone(), plans(), events.clone())
        .with_hosted_checkout(Arc::new(HttpPaymentGateway::new(provider.uri())), "http://shop.test", events);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move { axum::serve(listener, api::router(state)).await });

    let client = Arc::new(HttpStorefrontClient::new(format!("http://{addr}")));
    Ok(Harness { store, client, provider })
}

fn widget(quantity: u32) -> CartItem { CartItem::new("P1", "Widget", Money::new(dec!(100))).with_quantity(quantity) }

#[tokio::test]
async fn button_checkout_end_to_end() -> TestResult {
    let h = harness().await?;
    let user = UserId::new("u1");
    let mut session = CartSessionManager::new(h.client.clone(), plans(), user.clone());
    session.load().await;
    assert!(session.cart().is_empty());

    session.add_item(widget(2)).await?;
    session.add_item(CartItem::new("plan-mensual", "Plan mensual", Money::new(dec!(0)))).await?;
    assert_eq!(session.apply_coupon("NOPE").await?, CouponOutcome::Invalid);
    assert!(matches!(session.apply_coupon("DIEZ").await?, CouponOutcome::Applied(_)));
    assert_eq!(session.totals().total.amount(), dec!(180));

    let payments = Arc::new(HttpPaymentGateway::new(h.provider.uri()));
    let mut checkout = CheckoutOrchestrator::new(payments, h.client.clone());
    let receipt = checkout.pay_with_button(&mut session).await?;
    assert_eq!(receipt.data.total.amount(), dec!(180));
    assert_eq!(receipt.data.payment_reference.as_deref(), Some("cap-1"));

    assert!(session.cart().is_empty());
    assert!(h.client.fetch(&user).await?.is_empty());
    assert_eq!(session.subscriptions().active(), Some(&ProductId::new("plan-mensual")));
    Ok(())
}

#[tokio::test]
async fn hosted_checkout_end_to_end() -> TestResult {
    let h = harness().await?;
    let user = UserId::new("u2");
    let mut session = CartSessionManager::new(h.client.clone(), plans(), user.clone());
    session.add_item(widget(2)).await?;

    let payments = Arc::new(HttpPaymentGateway::new(h.provider.uri()));
    let checkout = CheckoutOrchestrator::new(payments, h.client.clone()).with_hosted(h.client.clone());
    let hosted = checkout.begin_hosted(&session).await?;
    assert_eq!(hosted.url, "https://pay.test/cs_1");

    let receipt = checkout.finish_hosted(&mut session, &hosted.id).await?;
    assert_eq!(receipt.data.total.amount(), dec!(200));
    assert_eq!(receipt.data.payment_reference.as_deref(), Some("cs_1"));
    assert!(session.cart().is_empty());

    let stock = Repository::<Product>::new(h.store.clone()).get("P1").await?.map(|p| p.stock);
    assert_eq!(stock, Some(3));

    let again = checkout.finish_hosted(&mut session, &hosted.id).await?;
    assert_eq!(again.id, receipt.id);
    let stock = Repository::<Product>::new(h.store.clone()).get("P1").await?.map(|p| p.stock);
    assert_eq!(stock, Some(3));
    Ok(())
}
