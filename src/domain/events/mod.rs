//! Domain events
use crate::domain::value_objects::{Money, ProductId, UserId};
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Cart { user_id: UserId, event: CartEvent },
    Receipt(ReceiptEvent),
    Checkout(CheckoutEvent),
}

impl DomainEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Cart { event: CartEvent::Cleared, .. } => "storefront.cart.cleared",
            Self::Cart { event: CartEvent::CouponApplied { .. }, .. } => "storefront.cart.coupon_applied",
            Self::Cart { .. } => "storefront.cart.updated",
            Self::Receipt(_) => "storefront.receipts.recorded",
            Self::Checkout(_) => "storefront.checkout.confirmed",
        }
    }
}

/// Emitted by the cart reducer for every state change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CartEvent {
    ItemAdded { product_id: ProductId, quantity: u32, subscription: bool },
    SubscriptionEvicted { product_id: ProductId },
    ItemRemoved { product_id: ProductId },
    QuantityChanged { product_id: ProductId, quantity: u32 },
    ItemsReplaced { count: usize },
    CouponApplied { code: String },
    Cleared,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReceiptEvent {
    Recorded { receipt_id: String, user_id: UserId, total: Money },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutEvent {
    HostedSessionConfirmed { session_id: String, receipt_id: String },
}
