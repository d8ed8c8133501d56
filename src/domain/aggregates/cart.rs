//! Cart Aggregate
//!
//! A cart is an immutable snapshot. Every mutation goes through [`Cart::apply`],
//! which returns the next snapshot plus the events describing the change, so
//! the server, the client session and the tests all share one set of rules:
//!
//! - no line is ever stored with quantity 0;
//! - at most one subscription plan occupies the cart, with quantity 1;
//! - emptying the cart drops the applied coupon.

use serde::{Deserialize, Serialize};

use crate::domain::aggregates::coupon::Coupon;
use crate::domain::events::CartEvent;
use crate::domain::pricing::{self, Totals};
use crate::domain::subscription::SubscriptionPlans;
use crate::domain::value_objects::{Money, ProductId, UserId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(rename = "id_usuario")]
    owner: UserId,
    #[serde(rename = "productos", default)]
    items: Vec<CartItem>,
    #[serde(rename = "cupon_aplicado", default)]
    applied_coupon: Option<Coupon>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(rename = "id_producto")]
    pub product_id: ProductId,
    #[serde(rename = "cantidad", default = "default_quantity")]
    pub quantity: u32,
    #[serde(rename = "precio")]
    pub unit_price: Money,
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(rename = "foto", default)]
    pub photo_ref: String,
    #[serde(rename = "promocion", default)]
    pub is_promotional: bool,
}

fn default_quantity() -> u32 { 1 }

impl CartItem {
    pub fn new(product_id: impl Into<ProductId>, name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(), quantity: 1, unit_price, name: name.into(),
            photo_ref: String::new(), is_promotional: false,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self { self.quantity = quantity; self }
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

/// A requested change to a cart.
#[derive(Clone, Debug, PartialEq)]
pub enum CartCommand {
    /// Upsert by product id, adding `item.quantity` (0 is treated as 1).
    AddItem(CartItem),
    RemoveItem(ProductId),
    SetQuantity(ProductId, u32),
    /// Full replacement, as sent by `PUT /carrito/{user}`.
    Replace { items: Vec<CartItem>, coupon: Option<Coupon> },
    ApplyCoupon(Coupon),
    Clear,
}

/// Context the reducer needs beyond the cart itself.
#[derive(Clone, Copy, Debug)]
pub struct CartRules<'a> {
    pub plans: &'a SubscriptionPlans,
    pub active_subscription: Option<&'a ProductId>,
}

impl<'a> CartRules<'a> {
    pub fn new(plans: &'a SubscriptionPlans) -> Self { Self { plans, active_subscription: None } }
    pub fn with_active_subscription(mut self, active: Option<&'a ProductId>) -> Self { self.active_subscription = active; self }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub cart: Cart,
    pub events: Vec<CartEvent>,
}

impl Transition {
    fn unchanged(cart: &Cart) -> Self { Self { cart: cart.clone(), events: vec![] } }
}

impl Cart {
    pub fn new(owner: UserId) -> Self { Self { owner, items: vec![], applied_coupon: None } }

    pub fn owner(&self) -> &UserId { &self.owner }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn applied_coupon(&self) -> Option<&Coupon> { self.applied_coupon.as_ref() }
    pub fn item(&self, product_id: &ProductId) -> Option<&CartItem> { self.items.iter().find(|i| &i.product_id == product_id) }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn totals(&self) -> Totals { pricing::totals(&self.items, self.applied_coupon.as_ref()) }

    pub fn subscription_item<'c>(&'c self, plans: &SubscriptionPlans) -> Option<&'c CartItem> {
        self.items.iter().find(|i| plans.contains(&i.product_id))
    }

    /// Adopt the item list the server answered with, keeping the coupon
    /// unless the list is empty.
    pub fn reconciled(&self, items: Vec<CartItem>) -> Cart {
        let applied_coupon = if items.is_empty() { None } else { self.applied_coupon.clone() };
        Cart { owner: self.owner.clone(), items, applied_coupon }
    }

    pub fn apply(&self, command: CartCommand, rules: &CartRules<'_>) -> Result<Transition, CartError> {
        match command {
            CartCommand::AddItem(item) => self.add_item(item, rules),
            CartCommand::RemoveItem(product_id) => self.remove_item(&product_id),
            CartCommand::SetQuantity(product_id, 0) => self.remove_item(&product_id),
            CartCommand::SetQuantity(product_id, quantity) => self.set_quantity(&product_id, quantity, rules),
            CartCommand::Replace { items, coupon } => self.replace(items, coupon, rules),
            CartCommand::ApplyCoupon(coupon) => {
                let code = coupon.code.clone();
                let mut next = self.clone();
                next.applied_coupon = Some(coupon);
                Ok(Transition { cart: next, events: vec![CartEvent::CouponApplied { code }] })
            }
            CartCommand::Clear => Ok(Transition { cart: Cart::new(self.owner.clone()), events: vec![CartEvent::Cleared] }),
        }
    }

    fn add_item(&self, mut item: CartItem, rules: &CartRules<'_>) -> Result<Transition, CartError> {
        let mut next = self.clone();
        let mut events = vec![];

        if rules.plans.contains(&item.product_id) {
            if let Some(active) = rules.active_subscription {
                return Err(CartError::SubscriptionAlreadyActive(active.clone()));
            }
            if self.item(&item.product_id).is_some() {
                return Ok(Transition::unchanged(self));
            }
            if let Some(current) = self.subscription_item(rules.plans) {
                let evicted = current.product_id.clone();
                next.items.retain(|i| i.product_id != evicted);
                events.push(CartEvent::SubscriptionEvicted { product_id: evicted });
            }
            item.quantity = 1;
            events.push(CartEvent::ItemAdded { product_id: item.product_id.clone(), quantity: 1, subscription: true });
            next.items.push(item);
            return Ok(Transition { cart: next, events });
        }

        let added = item.quantity.max(1);
        let quantity = match next.items.iter_mut().find(|i| i.product_id == item.product_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(added).ok_or(CartError::InvalidQuantity)?;
                existing.quantity
            }
            None => {
                item.quantity = added;
                next.items.push(item.clone());
                added
            }
        };
        events.push(CartEvent::ItemAdded { product_id: item.product_id, quantity, subscription: false });
        Ok(Transition { cart: next, events })
    }

    fn remove_item(&self, product_id: &ProductId) -> Result<Transition, CartError> {
        if self.item(product_id).is_none() {
            return Err(CartError::ItemNotFound(product_id.clone()));
        }
        let mut next = self.clone();
        next.items.retain(|i| &i.product_id != product_id);
        if next.items.is_empty() {
            next.applied_coupon = None;
        }
        Ok(Transition { cart: next, events: vec![CartEvent::ItemRemoved { product_id: product_id.clone() }] })
    }

    fn set_quantity(&self, product_id: &ProductId, quantity: u32, rules: &CartRules<'_>) -> Result<Transition, CartError> {
        if self.item(product_id).is_none() {
            return Err(CartError::ItemNotFound(product_id.clone()));
        }
        if rules.plans.contains(product_id) && quantity != 1 {
            return Err(CartError::SubscriptionQuantityFixed(product_id.clone()));
        }
        let mut next = self.clone();
        if let Some(item) = next.items.iter_mut().find(|i| &i.product_id == product_id) {
            item.quantity = quantity;
        }
        Ok(Transition { cart: next, events: vec![CartEvent::QuantityChanged { product_id: product_id.clone(), quantity }] })
    }

    fn replace(&self, items: Vec<CartItem>, coupon: Option<Coupon>, rules: &CartRules<'_>) -> Result<Transition, CartError> {
        let mut kept: Vec<CartItem> = Vec::with_capacity(items.len());
        for item in items.into_iter().filter(|i| i.quantity > 0) {
            if kept.iter().any(|k| k.product_id == item.product_id) {
                return Err(CartError::DuplicateItem(item.product_id));
            }
            if rules.plans.contains(&item.product_id) && item.quantity != 1 {
                return Err(CartError::SubscriptionQuantityFixed(item.product_id));
            }
            kept.push(item);
        }
        if kept.iter().filter(|i| rules.plans.contains(&i.product_id)).count() > 1 {
            return Err(CartError::MultipleSubscriptions);
        }
        if let (Some(active), Some(plan)) = (rules.active_subscription, kept.iter().find(|i| rules.plans.contains(&i.product_id))) {
            if &plan.product_id != active {
                return Err(CartError::SubscriptionAlreadyActive(active.clone()));
            }
        }

        let applied_coupon = if kept.is_empty() { None } else { coupon };
        let events = if kept.is_empty() {
            vec![CartEvent::Cleared]
        } else {
            vec![CartEvent::ItemsReplaced { count: kept.len() }]
        };
        Ok(Transition { cart: Cart { owner: self.owner.clone(), items: kept, applied_coupon }, events })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("item {0} is not in the cart")]
    ItemNotFound(ProductId),
    #[error("you already have an active subscription ({0}); a new plan cannot be added")]
    SubscriptionAlreadyActive(ProductId),
    #[error("subscription plan {0} can only be bought with quantity 1")]
    SubscriptionQuantityFixed(ProductId),
    #[error("only one subscription plan can be in the cart")]
    MultipleSubscriptions,
    #[error("item {0} appears more than once")]
    DuplicateItem(ProductId),
    #[error("invalid quantity")]
    InvalidQuantity,
}
