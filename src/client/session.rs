//! Client-side cart session.
//!
//! The session keeps an in-memory copy of the user's cart. Each mutation is
//! applied locally through the cart reducer first, then persisted; the
//! server's answer replaces the local items. When persisting fails the local
//! change is kept and the error is returned, so the UI stays responsive and
//! the caller decides whether to retry.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::client::{CartApi, ClientError};
use crate::domain::aggregates::{Cart, CartCommand, CartError, CartItem, CartRules, Coupon};
use crate::domain::events::CartEvent;
use crate::domain::pricing::Totals;
use crate::domain::subscription::{SubscriptionPlans, SubscriptionTracker};
use crate::domain::value_objects::{ProductId, UserId};

#[derive(Debug, Error)]
pub enum SessionError {
    /// The change breaks a cart rule and was not applied.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The server could not be reached or refused the change. Local state
    /// keeps the attempted change.
    #[error("cart could not be saved: {0}")]
    Remote(#[from] ClientError),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CouponOutcome {
    Applied(Coupon),
    /// Unknown or expired code; the cart is unchanged.
    Invalid,
}

pub struct CartSessionManager {
    api: Arc<dyn CartApi>,
    plans: SubscriptionPlans,
    cart: Cart,
    subscriptions: SubscriptionTracker,
}

impl CartSessionManager {
    pub fn new(api: Arc<dyn CartApi>, plans: SubscriptionPlans, user: UserId) -> Self {
        Self { api, plans, cart: Cart::new(user), subscriptions: SubscriptionTracker::default() }
    }

    pub fn user(&self) -> &UserId { self.cart.owner() }
    pub fn cart(&self) -> &Cart { &self.cart }
    pub fn totals(&self) -> Totals { self.cart.totals() }
    pub fn subscriptions(&self) -> &SubscriptionTracker { &self.subscriptions }
    pub fn plans(&self) -> &SubscriptionPlans { &self.plans }

    /// Records that the user now holds `plan`; further plans cannot be added.
    pub fn mark_subscription_active(&mut self, plan: ProductId) {
        info!(user = %self.user(), %plan, "subscription active");
        self.subscriptions.activate(plan);
    }

    /// Loads the persisted cart. Failures are logged and leave an empty cart.
    #[instrument(skip(self), fields(user = %self.user()))]
    pub async fn load(&mut self) {
        let user = self.user().clone();
        self.cart = match self.api.fetch(&user).await {
            Ok(cart) => cart,
            Err(e) => {
                warn!(error = %e, "could not load cart");
                Cart::new(user)
            }
        };
        self.subscriptions.sync_pending(&self.plans, self.cart.items().iter().map(|i| &i.product_id));
    }

    #[instrument(skip(self), fields(user = %self.user()))]
    pub async fn add_item(&mut self, item: CartItem) -> Result<(), SessionError> {
        if self.stage(CartCommand::AddItem(item))?.is_empty() {
            return Ok(());
        }
        let saved = self.api.replace(self.cart.owner(), self.cart.items(), self.cart.applied_coupon()).await?;
        self.cart = saved;
        Ok(())
    }

    #[instrument(skip(self), fields(user = %self.user()))]
    pub async fn remove_item(&mut self, product_id: &ProductId) -> Result<(), SessionError> {
        self.stage(CartCommand::RemoveItem(product_id.clone()))?;
        let items = self.api.remove_item(self.cart.owner(), product_id).await?;
        self.cart = self.cart.reconciled(items);
        Ok(())
    }

    /// Zero removes the line. Subscription plans only accept 1.
    #[instrument(skip(self), fields(user = %self.user()))]
    pub async fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Result<(), SessionError> {
        if quantity == 0 {
            return self.remove_item(product_id).await;
        }
        self.stage(CartCommand::SetQuantity(product_id.clone(), quantity))?;
        let items = self.api.set_quantity(self.cart.owner(), product_id, quantity).await?;
        self.cart = self.cart.reconciled(items);
        Ok(())
    }

    #[instrument(skip(self), fields(user = %self.user()))]
    pub async fn clear(&mut self) -> Result<(), SessionError> {
        self.stage(CartCommand::Clear)?;
        self.cart = self.api.replace(self.cart.owner(), &[], None).await?;
        Ok(())
    }

    /// Validates `code` with the server and applies it when valid.
    #[instrument(skip(self), fields(user = %self.user()))]
    pub async fn apply_coupon(&mut self, code: &str) -> Result<CouponOutcome, SessionError> {
        match self.api.apply_coupon(self.cart.owner(), code).await? {
            Some(coupon) => {
                self.stage(CartCommand::ApplyCoupon(coupon.clone()))?;
                Ok(CouponOutcome::Applied(coupon))
            }
            None => Ok(CouponOutcome::Invalid),
        }
    }

    fn stage(&mut self, command: CartCommand) -> Result<Vec<CartEvent>, CartError> {
        let rules = CartRules::new(&self.plans).with_active_subscription(self.subscriptions.active());
        let transition = self.cart.apply(command, &rules)?;
        for event in &transition.events {
            self.subscriptions.observe(event);
        }
        self.cart = transition.cart;
        Ok(transition.events)
    }
}
