//! Hosted (redirect) checkout.
//!
//! `start` snapshots the cart into a payment session and asks the provider
//! for a hosted page. `confirm` runs when the user is redirected back: it only
//! applies effects once the provider reports the session as paid, and
//! re-confirming a completed session returns the receipt it already produced.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::domain::aggregates::{CartItem, Coupon, NewReceipt, Product, Receipt};
use crate::domain::events::{CheckoutEvent, DomainEvent};
use crate::domain::value_objects::{Money, UserId};
use crate::messaging::EventPublisher;
use crate::services::payments::{HostedCheckoutProvider, HostedSession, HostedSessionRequest, HostedSessionStatus};
use crate::services::{CartService, ReceiptService};
use crate::storage::{Document, DocumentStore, Record, Repository};
use crate::{Result, StorefrontError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Open,
    Completed,
}

/// Cart snapshot taken when a hosted session is opened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentSession {
    #[serde(rename = "id_usuario")]
    pub user_id: UserId,
    #[serde(rename = "productos")]
    pub items: Vec<CartItem>,
    #[serde(rename = "cupon_aplicado", default)]
    pub coupon: Option<Coupon>,
    pub total: Money,
    #[serde(rename = "estado")]
    pub state: SessionState,
    #[serde(rename = "id_recibo", default, skip_serializing_if = "Option::is_none")]
    pub receipt_id: Option<String>,
}

impl Document for PaymentSession {
    const COLLECTION: &'static str = "sesiones_pago";
}

#[derive(Clone)]
pub struct HostedCheckoutService {
    carts: CartService,
    receipts: ReceiptService,
    products: Repository<Product>,
    sessions: Repository<PaymentSession>,
    provider: Arc<dyn HostedCheckoutProvider>,
    public_base_url: String,
    events: EventPublisher,
    confirming: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl HostedCheckoutService {
    pub fn new(
        carts: CartService,
        receipts: ReceiptService,
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn HostedCheckoutProvider>,
        public_base_url: impl Into<String>,
        events: EventPublisher,
    ) -> Self {
        Self {
            carts,
            receipts,
            products: Repository::new(store.clone()),
            sessions: Repository::new(store),
            provider,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            events,
            confirming: Arc::default(),
        }
    }

    #[instrument(skip(self))]
    pub async fn start(&self, user: &UserId) -> Result<HostedSession> {
        let cart = self.carts.get_or_create(user).await?;
        if cart.is_empty() {
            return Err(StorefrontError::Validation("cannot check out an empty cart".into()));
        }
        let total = cart.totals().total;
        let request = HostedSessionRequest {
            reference: user.to_string(),
            amount: total,
            success_url: format!("{}/pago-exitoso?session_id={{CHECKOUT_SESSION_ID}}", self.public_base_url),
            cancel_url: format!("{}/carrito", self.public_base_url),
        };
        let session = self.provider.create_session(&request).await?;
        let snapshot = PaymentSession {
            user_id: user.clone(),
            items: cart.items().to_vec(),
            coupon: cart.applied_coupon().cloned(),
            total,
            state: SessionState::Open,
            receipt_id: None,
        };
        self.sessions.put(&session.id, &snapshot).await?;
        info!(session_id = %session.id, %total, "hosted checkout session opened");
        Ok(session)
    }

    /// Confirms a returning session: records the receipt, decrements stock
    /// and empties the cart. Confirmations of the same session run one at a
    /// time within this process.
    #[instrument(skip(self))]
    pub async fn confirm(&self, session_id: &str) -> Result<Record<Receipt>> {
        let lock = self.confirmation_lock(session_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.confirm_exclusive(session_id).await
        };
        self.release_confirmation_lock(session_id, lock).await;
        result
    }

    async fn confirmation_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.confirming.lock().await.entry(session_id.to_string()).or_default().clone()
    }

    async fn release_confirmation_lock(&self, session_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.confirming.lock().await;
        // map entry plus ours: nobody else is waiting
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(session_id);
        }
    }

    async fn confirm_exclusive(&self, session_id: &str) -> Result<Record<Receipt>> {
        let mut session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or_else(|| StorefrontError::NotFound(format!("payment session {session_id}")))?;

        if let Some(receipt_id) = &session.receipt_id {
            info!(%receipt_id, "session already confirmed");
            return self.receipts.get(receipt_id).await;
        }

        let status = self.provider.session_status(session_id).await?;
        if status != HostedSessionStatus::Paid {
            warn!(?status, "session confirmed before payment completed");
            return Err(StorefrontError::PaymentNotCompleted(session_id.to_string()));
        }

        let receipt = NewReceipt {
            user_id: session.user_id.clone(),
            items: session.items.clone(),
            coupon: session.coupon.clone(),
            total: session.total,
            payment_reference: None,
        }
        .paid_with(session_id);
        let record = self.receipts.record(receipt).await?;

        session.state = SessionState::Completed;
        session.receipt_id = Some(record.id.clone());
        self.sessions.put(session_id, &session).await?;

        self.decrement_stock(&session.items).await;
        if let Err(e) = self.carts.clear(&session.user_id).await {
            warn!(error = %e, user = %session.user_id, "paid cart could not be cleared");
        }

        self.events
            .publish(DomainEvent::Checkout(CheckoutEvent::HostedSessionConfirmed {
                session_id: session_id.to_string(),
                receipt_id: record.id.clone(),
            }))
            .await;
        info!(receipt_id = %record.id, "hosted checkout confirmed");
        Ok(record)
    }

    async fn decrement_stock(&self, items: &[CartItem]) {
        for item in items {
            let id = item.product_id.as_str();
            let mut product = match self.products.get(id).await {
                Ok(Some(product)) => product,
                Ok(None) => continue,
                Err(e) => {
                    warn!(error = %e, product_id = id, "stock not updated");
                    continue;
                }
            };
            if let Err(e) = product.remove_inventory(item.quantity) {
                warn!(error = %e, product_id = id, "sold more than stocked");
                product.stock = 0;
            }
            if let Err(e) = self.products.put(id, &product).await {
                warn!(error = %e, product_id = id, "stock not updated");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::SubscriptionPlans;
    use crate::services::payments::PaymentError;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeProvider {
        status: Mutex<HostedSessionStatus>,
        requests: Mutex<Vec<HostedSessionRequest>>,
    }

    #[async_trait]
    impl HostedCheckoutProvider for FakeProvider {
        async fn create_session(&self, request: &HostedSessionRequest) -> std::result::Result<HostedSession, PaymentError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(HostedSession { id: "cs_1".into(), url: "https://pay.example/cs_1".into() })
        }

        async fn session_status(&self, _session_id: &str) -> std::result::Result<HostedSessionStatus, PaymentError> {
            let status = *self.status.lock().unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(status)
        }
    }

    struct Fixture {
        checkout: HostedCheckoutService,
        carts: CartService,
        receipts: ReceiptService,
        products: Repository<Product>,
        provider: Arc<FakeProvider>,
    }

    async fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::default());
        let events = EventPublisher::disabled();
        let carts = CartService::new(store.clone(), SubscriptionPlans::default(), events.clone());
        let receipts = ReceiptService::new(store.clone(), events.clone());
        let products = Repository::<Product>::new(store.clone());
        let mut product = Product::create("Widget", Money::new(dec!(100)));
        product.stock = 5;
        products.put("P1", &product).await.unwrap();
        let provider = Arc::new(FakeProvider {
            status: Mutex::new(HostedSessionStatus::Open),
            requests: Mutex::new(vec![]),
        });
        let checkout = HostedCheckoutService::new(carts.clone(), receipts.clone(), store, provider.clone(), "https://shop.example/", events);
        Fixture { checkout, carts, receipts, products, provider }
    }

    #[tokio::test]
    async fn test_empty_cart_cannot_start() {
        let f = fixture().await;
        assert!(matches!(f.checkout.start(&UserId::new("u1")).await, Err(StorefrontError::Validation(_))));
    }

    #[tokio::test]
    async fn test_confirm_applies_effects_once_paid() {
        let f = fixture().await;
        let user = UserId::new("u1");
        f.carts.add_item(&user, CartItem::new("P1", "Widget", Money::new(dec!(100))).with_quantity(2)).await.unwrap();

        let session = f.checkout.start(&user).await.unwrap();
        let request = f.provider.requests.lock().unwrap()[0].clone();
        assert_eq!(request.amount.amount(), dec!(200));
        assert_eq!(request.success_url, "https://shop.example/pago-exitoso?session_id={CHECKOUT_SESSION_ID}");

        assert!(matches!(f.checkout.confirm(&session.id).await, Err(StorefrontError::PaymentNotCompleted(_))));
        assert_eq!(f.carts.get_or_create(&user).await.unwrap().item_count(), 1);

        *f.provider.status.lock().unwrap() = HostedSessionStatus::Paid;
        let receipt = f.checkout.confirm(&session.id).await.unwrap();
        assert_eq!(receipt.data.total.amount(), dec!(200));
        assert_eq!(receipt.data.payment_reference.as_deref(), Some("cs_1"));
        assert!(f.carts.get_or_create(&user).await.unwrap().is_empty());
        assert_eq!(f.products.get("P1").await.unwrap().map(|p| p.stock), Some(3));

        let again = f.checkout.confirm(&session.id).await.unwrap();
        assert_eq!(again, receipt);
        assert_eq!(f.products.get("P1").await.unwrap().map(|p| p.stock), Some(3));
    }

    #[tokio::test]
    async fn test_overlapping_confirms_record_one_receipt() {
        let f = fixture().await;
        let user = UserId::new("u1");
        f.carts.add_item(&user, CartItem::new("P1", "Widget", Money::new(dec!(100))).with_quantity(2)).await.unwrap();
        let session = f.checkout.start(&user).await.unwrap();
        *f.provider.status.lock().unwrap() = HostedSessionStatus::Paid;

        let (first, second) = tokio::join!(f.checkout.confirm(&session.id), f.checkout.confirm(&session.id));
        assert_eq!(first.unwrap().id, second.unwrap().id);
        assert_eq!(f.receipts.list().await.unwrap().len(), 1);
        assert_eq!(f.products.get("P1").await.unwrap().map(|p| p.stock), Some(3));
        assert!(f.checkout.confirming.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let f = fixture().await;
        assert!(matches!(f.checkout.confirm("nope").await, Err(StorefrontError::NotFound(_))));
    }
}
