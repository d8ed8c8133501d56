//! Checkout Orchestrator
//!
//! Button flow: create a provider order for the cart total, capture it,
//! record the receipt, then empty the cart. Hosted flow: open a hosted
//! session on the server, redirect, and confirm on return; the server applies
//! the effects and the session only resyncs.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::client::{CartSessionManager, ClientError, HostedCheckoutApi, ReceiptApi};
use crate::domain::aggregates::{NewReceipt, Receipt};
use crate::domain::pricing::Totals;
use crate::services::payments::{ButtonPaymentProvider, CaptureStatus, HostedSession, PaymentError};
use crate::storage::Record;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("the cart is empty")]
    EmptyCart,

    /// Nothing was charged, or the charge was declined. The cart is intact.
    #[error("payment failed: {0}")]
    Payment(#[from] PaymentError),

    /// The payment went through but the receipt could not be stored. The
    /// cart is kept and [`CheckoutOrchestrator::retry_receipt`] can resend it.
    #[error("payment {payment_reference} captured but the receipt was not recorded: {source}")]
    ReceiptNotRecorded {
        payment_reference: String,
        #[source]
        source: ClientError,
    },

    /// An earlier captured payment still has no receipt. Charging again is
    /// refused until [`CheckoutOrchestrator::retry_receipt`] succeeds.
    #[error("payment {payment_reference} is still waiting for its receipt")]
    ReceiptPending { payment_reference: String },

    #[error("no receipt is waiting to be recorded")]
    NothingToRetry,

    #[error("hosted checkout is not available")]
    HostedUnavailable,

    #[error(transparent)]
    Remote(#[from] ClientError),
}

pub struct CheckoutOrchestrator {
    payments: Arc<dyn ButtonPaymentProvider>,
    receipts: Arc<dyn ReceiptApi>,
    hosted: Option<Arc<dyn HostedCheckoutApi>>,
    pending: Option<NewReceipt>,
}

impl CheckoutOrchestrator {
    pub fn new(payments: Arc<dyn ButtonPaymentProvider>, receipts: Arc<dyn ReceiptApi>) -> Self {
        Self { payments, receipts, hosted: None, pending: None }
    }

    pub fn with_hosted(mut self, hosted: Arc<dyn HostedCheckoutApi>) -> Self {
        self.hosted = Some(hosted);
        self
    }

    pub fn totals(&self, session: &CartSessionManager) -> Totals { session.totals() }

    /// Receipt of a captured payment that still has to be recorded.
    pub fn pending_receipt(&self) -> Option<&NewReceipt> { self.pending.as_ref() }

    #[instrument(skip_all, fields(user = %session.user()))]
    pub async fn pay_with_button(&mut self, session: &mut CartSessionManager) -> Result<Record<Receipt>, CheckoutError> {
        if let Some(pending) = &self.pending {
            let payment_reference = pending.payment_reference.clone().unwrap_or_default();
            warn!(%payment_reference, "refusing to charge again before the pending receipt is recorded");
            return Err(CheckoutError::ReceiptPending { payment_reference });
        }
        if session.cart().is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let receipt = NewReceipt::from_cart(session.cart());
        let order_id = self.payments.create_order(receipt.total, session.user().as_str()).await?;
        let capture = self.payments.capture_order(&order_id).await?;
        if capture.status != CaptureStatus::Completed {
            warn!(%order_id, status = ?capture.status, "capture not completed");
            return Err(PaymentError::Declined.into());
        }
        info!(%order_id, capture_id = %capture.id, total = %receipt.total, "payment captured");
        self.record(session, receipt.paid_with(capture.id)).await
    }

    /// Resends the receipt of a payment whose receipt write failed.
    pub async fn retry_receipt(&mut self, session: &mut CartSessionManager) -> Result<Record<Receipt>, CheckoutError> {
        let receipt = self.pending.take().ok_or(CheckoutError::NothingToRetry)?;
        self.record(session, receipt).await
    }

    pub async fn begin_hosted(&self, session: &CartSessionManager) -> Result<HostedSession, CheckoutError> {
        if session.cart().is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let hosted = self.hosted.as_ref().ok_or(CheckoutError::HostedUnavailable)?;
        Ok(hosted.start(session.user()).await?)
    }

    /// Confirms a hosted session the user returned from. The server records
    /// the receipt and empties the stored cart; the session reloads it.
    #[instrument(skip(self, session))]
    pub async fn finish_hosted(&self, session: &mut CartSessionManager, session_id: &str) -> Result<Record<Receipt>, CheckoutError> {
        let hosted = self.hosted.as_ref().ok_or(CheckoutError::HostedUnavailable)?;
        let record = hosted.confirm(session_id).await?;
        activate_plans(session, &record.data);
        session.load().await;
        Ok(record)
    }

    async fn record(&mut self, session: &mut CartSessionManager, receipt: NewReceipt) -> Result<Record<Receipt>, CheckoutError> {
        match self.receipts.record_receipt(&receipt).await {
            Ok(record) => {
                info!(receipt_id = %record.id, "receipt recorded");
                activate_plans(session, &record.data);
                if let Err(e) = session.clear().await {
                    warn!(error = %e, "cart emptied locally only");
                }
                Ok(record)
            }
            Err(source) => {
                let payment_reference = receipt.payment_reference.clone().unwrap_or_default();
                error!(error = %source, %payment_reference, "paid but receipt not recorded");
                self.pending = Some(receipt);
                Err(CheckoutError::ReceiptNotRecorded { payment_reference, source })
            }
        }
    }
}

fn activate_plans(session: &mut CartSessionManager, receipt: &Receipt) {
    let plan = receipt.items.iter().map(|i| &i.product_id).find(|id| session.plans().contains(id)).cloned();
    if let Some(plan) = plan {
        session.mark_subscription_active(plan);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::CartItem;
    use crate::domain::subscription::SubscriptionPlans;
    use crate::domain::value_objects::{Money, UserId};
    use crate::messaging::EventPublisher;
    use crate::services::payments::Capture;
    use crate::services::{CartService, ReceiptService};
    use crate::storage::{DocumentStore, MemoryStore};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeProvider {
        status: CaptureStatus,
        captures: AtomicUsize,
    }

    #[async_trait]
    impl ButtonPaymentProvider for FakeProvider {
        async fn create_order(&self, _: Money, _: &str) -> Result<String, PaymentError> { Ok("ord-1".into()) }

        async fn capture_order(&self, order_id: &str) -> Result<Capture, PaymentError> {
            self.captures.fetch_add(1, Ordering::SeqCst);
            Ok(Capture { id: format!("cap-{order_id}"), status: self.status })
        }
    }

    /// Receipt endpoint that can be made to fail.
    struct FlakyReceipts {
        inner: ReceiptService,
        down: AtomicBool,
    }

    #[async_trait]
    impl ReceiptApi for FlakyReceipts {
        async fn record_receipt(&self, receipt: &NewReceipt) -> Result<Record<Receipt>, ClientError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(ClientError::Status { status: 500, message: "down".into() });
            }
            self.inner.record_receipt(receipt).await
        }
    }

    struct Fixture {
        session: CartSessionManager,
        receipts: Arc<FlakyReceipts>,
    }

    async fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::default());
        let plans = SubscriptionPlans::new(["plan-a"]);
        let carts = CartService::new(store.clone(), plans.clone(), EventPublisher::disabled());
        let receipts = Arc::new(FlakyReceipts {
            inner: ReceiptService::new(store, EventPublisher::disabled()),
            down: AtomicBool::new(false),
        });
        let mut session = CartSessionManager::new(Arc::new(carts), plans, UserId::new("u1"));
        session.add_item(CartItem::new("P1", "Widget", Money::new(dec!(100))).with_quantity(2)).await.unwrap();
        session.add_item(CartItem::new("plan-a", "Plan", Money::new(dec!(10)))).await.unwrap();
        Fixture { session, receipts }
    }

    fn orchestrator(status: CaptureStatus, receipts: Arc<FlakyReceipts>) -> CheckoutOrchestrator {
        orchestrator_with(Arc::new(FakeProvider { status, captures: AtomicUsize::new(0) }), receipts)
    }

    fn orchestrator_with(provider: Arc<FakeProvider>, receipts: Arc<FlakyReceipts>) -> CheckoutOrchestrator {
        CheckoutOrchestrator::new(provider, receipts)
    }

    #[tokio::test]
    async fn test_button_flow_records_and_clears() {
        let mut f = fixture().await;
        let mut checkout = orchestrator(CaptureStatus::Completed, f.receipts.clone());
        assert_eq!(checkout.totals(&f.session).total.amount(), dec!(210));

        let receipt = checkout.pay_with_button(&mut f.session).await.unwrap();
        assert_eq!(receipt.data.total.amount(), dec!(210));
        assert_eq!(receipt.data.payment_reference.as_deref(), Some("cap-ord-1"));
        assert!(f.session.cart().is_empty());
        assert_eq!(f.session.subscriptions().active().map(|p| p.as_str()), Some("plan-a"));
    }

    #[tokio::test]
    async fn test_declined_payment_keeps_cart() {
        let mut f = fixture().await;
        let mut checkout = orchestrator(CaptureStatus::Declined, f.receipts.clone());
        let err = checkout.pay_with_button(&mut f.session).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Payment(PaymentError::Declined)));
        assert_eq!(f.session.cart().item_count(), 2);
    }

    #[tokio::test]
    async fn test_receipt_failure_is_surfaced_and_retryable() {
        let mut f = fixture().await;
        let mut checkout = orchestrator(CaptureStatus::Completed, f.receipts.clone());
        f.receipts.down.store(true, Ordering::SeqCst);

        let err = checkout.pay_with_button(&mut f.session).await.unwrap_err();
        assert!(matches!(err, CheckoutError::ReceiptNotRecorded { ref payment_reference, .. } if payment_reference == "cap-ord-1"));
        assert_eq!(f.session.cart().item_count(), 2);
        assert!(checkout.pending_receipt().is_some());

        f.receipts.down.store(false, Ordering::SeqCst);
        let receipt = checkout.retry_receipt(&mut f.session).await.unwrap();
        assert_eq!(receipt.data.payment_reference.as_deref(), Some("cap-ord-1"));
        assert!(f.session.cart().is_empty());
        assert!(matches!(checkout.retry_receipt(&mut f.session).await, Err(CheckoutError::NothingToRetry)));
    }

    #[tokio::test]
    async fn test_pending_receipt_blocks_second_charge() {
        let mut f = fixture().await;
        let provider = Arc::new(FakeProvider { status: CaptureStatus::Completed, captures: AtomicUsize::new(0) });
        let mut checkout = orchestrator_with(provider.clone(), f.receipts.clone());
        f.receipts.down.store(true, Ordering::SeqCst);

        let err = checkout.pay_with_button(&mut f.session).await.unwrap_err();
        assert!(matches!(err, CheckoutError::ReceiptNotRecorded { .. }));
        let err = checkout.pay_with_button(&mut f.session).await.unwrap_err();
        assert!(matches!(err, CheckoutError::ReceiptPending { ref payment_reference } if payment_reference == "cap-ord-1"));
        assert_eq!(provider.captures.load(Ordering::SeqCst), 1);
        assert_eq!(checkout.pending_receipt().and_then(|r| r.payment_reference.as_deref()), Some("cap-ord-1"));

        f.receipts.down.store(false, Ordering::SeqCst);
        let receipt = checkout.retry_receipt(&mut f.session).await.unwrap();
        assert_eq!(receipt.data.payment_reference.as_deref(), Some("cap-ord-1"));
        assert!(checkout.pending_receipt().is_none());
        assert!(matches!(checkout.pay_with_button(&mut f.session).await, Err(CheckoutError::EmptyCart)));
        assert_eq!(provider.captures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_cart_and_missing_hosted() {
        let mut f = fixture().await;
        let checkout = orchestrator(CaptureStatus::Completed, f.receipts.clone());
        assert!(matches!(checkout.begin_hosted(&f.session).await, Err(CheckoutError::HostedUnavailable)));
        f.session.clear().await.unwrap();
        assert!(matches!(checkout.begin_hosted(&f.session).await, Err(CheckoutError::EmptyCart)));
    }
}
