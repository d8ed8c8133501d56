//! Server-side cart operations over the persistent cart store.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::domain::aggregates::{Cart, CartCommand, CartItem, CartRules, Coupon, CouponValidation};
use crate::domain::events::DomainEvent;
use crate::domain::subscription::SubscriptionPlans;
use crate::domain::value_objects::{ProductId, UserId};
use crate::messaging::EventPublisher;
use crate::services::coupons::CouponValidator;
use crate::storage::{DocumentStore, Repository};
use crate::{Result, StorefrontError};

/// One cart document per user, keyed by user id and created on first access.
///
/// Writes are last-write-wins: concurrent sessions for the same user are not
/// serialized against each other.
#[derive(Clone)]
pub struct CartService {
    carts: Repository<Cart>,
    coupons: CouponValidator,
    plans: Arc<SubscriptionPlans>,
    events: EventPublisher,
}

impl CartService {
    pub fn new(store: Arc<dyn DocumentStore>, plans: SubscriptionPlans, events: EventPublisher) -> Self {
        Self {
            carts: Repository::new(store.clone()),
            coupons: CouponValidator::new(store),
            plans: Arc::new(plans),
            events,
        }
    }

    pub fn plans(&self) -> &SubscriptionPlans { &self.plans }
    pub fn coupons(&self) -> &CouponValidator { &self.coupons }

    #[instrument(skip(self))]
    pub async fn get_or_create(&self, user: &UserId) -> Result<Cart> {
        if let Some(cart) = self.carts.get(user.as_str()).await? {
            return Ok(cart);
        }
        let cart = Cart::new(user.clone());
        self.carts.put(user.as_str(), &cart).await?;
        info!(user = %user, "created cart");
        Ok(cart)
    }

    #[instrument(skip(self))]
    pub async fn add_item(&self, user: &UserId, item: CartItem) -> Result<Vec<CartItem>> {
        let cart = self.execute(user, CartCommand::AddItem(item)).await?;
        Ok(cart.items().to_vec())
    }

    /// Full replacement. A coupon in the payload is re-checked against the
    /// coupon store and the stored terms win.
    #[instrument(skip(self))]
    pub async fn replace(&self, user: &UserId, items: Vec<CartItem>, coupon: Option<Coupon>) -> Result<Cart> {
        let coupon = match coupon {
            Some(submitted) => match self.coupons.validate(&submitted.code).await? {
                CouponValidation::Valid(stored) => Some(stored),
                invalid => return Err(StorefrontError::Validation(invalid.user_message())),
            },
            None => None,
        };
        self.execute(user, CartCommand::Replace { items, coupon }).await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, user: &UserId, product_id: &ProductId) -> Result<Vec<CartItem>> {
        let cart = self.execute(user, CartCommand::RemoveItem(product_id.clone())).await?;
        Ok(cart.items().to_vec())
    }

    #[instrument(skip(self))]
    pub async fn set_quantity(&self, user: &UserId, product_id: &ProductId, quantity: u32) -> Result<Vec<CartItem>> {
        let cart = self.execute(user, CartCommand::SetQuantity(product_id.clone(), quantity)).await?;
        Ok(cart.items().to_vec())
    }

    #[instrument(skip(self))]
    pub async fn clear(&self, user: &UserId) -> Result<Cart> { self.execute(user, CartCommand::Clear).await }

    /// Applies a coupon when the code is valid. An invalid code is not an
    /// error: the cart is left as it was and the validation is returned.
    #[instrument(skip(self))]
    pub async fn apply_coupon(&self, user: &UserId, code: &str) -> Result<CouponValidation> {
        let validation = self.coupons.validate(code).await?;
        match &validation {
            CouponValidation::Valid(coupon) => {
                self.execute(user, CartCommand::ApplyCoupon(coupon.clone())).await?;
            }
            invalid => info!(user = %user, code, reason = %invalid.user_message(), "coupon rejected"),
        }
        Ok(validation)
    }

    async fn execute(&self, user: &UserId, command: CartCommand) -> Result<Cart> {
        let cart = self.get_or_create(user).await?;
        let transition = cart.apply(command, &CartRules::new(&self.plans))?;
        if transition.events.is_empty() {
            return Ok(transition.cart);
        }
        self.carts.put(user.as_str(), &transition.cart).await?;
        for event in transition.events {
            info!(user = %user, ?event, "cart updated");
            self.events.publish(DomainEvent::Cart { user_id: user.clone(), event }).await;
        }
        Ok(transition.cart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::CartError;
    use crate::domain::value_objects::Money;
    use crate::storage::MemoryStore;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    async fn service() -> CartService {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::default());
        Repository::<Coupon>::new(store.clone()).insert(Coupon::new("DIEZ", dec!(10), NaiveDate::MAX)).await.unwrap();
        CartService::new(store, SubscriptionPlans::new(["plan-a", "plan-b"]), EventPublisher::disabled())
    }

    fn widget() -> CartItem { CartItem::new("P1", "Widget", Money::new(dec!(100))) }

    #[tokio::test]
    async fn test_cart_is_created_lazily() {
        let carts = service().await;
        let cart = carts.get_or_create(&UserId::new("u1")).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.owner(), &UserId::new("u1"));
    }

    #[tokio::test]
    async fn test_mutations_persist() {
        let carts = service().await;
        let user = UserId::new("u1");
        carts.add_item(&user, widget()).await.unwrap();
        let items = carts.add_item(&user, widget()).await.unwrap();
        assert_eq!(items[0].quantity, 2);
        carts.apply_coupon(&user, "DIEZ").await.unwrap();

        let cart = carts.get_or_create(&user).await.unwrap();
        assert_eq!(cart.totals().total.amount(), dec!(180));

        let items = carts.set_quantity(&user, &ProductId::new("P1"), 0).await.unwrap();
        assert!(items.is_empty());
        assert!(carts.get_or_create(&user).await.unwrap().applied_coupon().is_none());
    }

    #[tokio::test]
    async fn test_invalid_coupon_leaves_cart_untouched() {
        let carts = service().await;
        let user = UserId::new("u1");
        carts.add_item(&user, widget()).await.unwrap();
        let before = carts.get_or_create(&user).await.unwrap();
        assert_eq!(carts.apply_coupon(&user, "NOPE").await.unwrap(), CouponValidation::NotFound);
        assert_eq!(carts.get_or_create(&user).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_replace_revalidates_coupon() {
        let carts = service().await;
        let user = UserId::new("u1");
        let forged = Coupon::new("DIEZ", dec!(90), NaiveDate::MAX);
        let cart = carts.replace(&user, vec![widget()], Some(forged)).await.unwrap();
        assert_eq!(cart.applied_coupon().map(|c| c.discount_percent), Some(dec!(10)));

        let unknown = Coupon::new("FALSO", dec!(50), NaiveDate::MAX);
        assert!(matches!(carts.replace(&user, vec![widget()], Some(unknown)).await, Err(StorefrontError::Validation(_))));
    }

    #[tokio::test]
    async fn test_business_rule_errors_surface() {
        let carts = service().await;
        let user = UserId::new("u1");
        let result = carts.remove_item(&user, &ProductId::new("P9")).await;
        assert!(matches!(result, Err(StorefrontError::Cart(CartError::ItemNotFound(_)))));
    }
}
