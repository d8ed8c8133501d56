//! Subscription plan rules.
//!
//! A handful of catalog products are recurring plans rather than goods. They
//! are identified by a fixed allow-list configured at startup, and a cart may
//! hold at most one of them, always with quantity 1.

use std::collections::BTreeSet;

use crate::domain::events::CartEvent;
use crate::domain::value_objects::ProductId;

pub const DEFAULT_PLAN_IDS: [&str; 3] = ["plan-mensual", "plan-trimestral", "plan-anual"];

/// Allow-list of product ids that are subscription plans.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionPlans(BTreeSet<ProductId>);

impl SubscriptionPlans {
    pub fn new<I, P>(ids: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ProductId>,
    {
        Self(ids.into_iter().map(Into::into).filter(|id: &ProductId| !id.as_str().is_empty()).collect())
    }

    pub fn contains(&self, product_id: &ProductId) -> bool { self.0.contains(product_id) }
    pub fn iter(&self) -> impl Iterator<Item = &ProductId> { self.0.iter() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl Default for SubscriptionPlans {
    fn default() -> Self { Self::new(DEFAULT_PLAN_IDS) }
}

/// Client-side subscription markers.
///
/// `pending` is the plan currently sitting in the cart, `active` is a plan the
/// user has already paid for during this process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionTracker {
    pending: Option<ProductId>,
    active: Option<ProductId>,
}

impl SubscriptionTracker {
    pub fn pending(&self) -> Option<&ProductId> { self.pending.as_ref() }
    pub fn active(&self) -> Option<&ProductId> { self.active.as_ref() }

    pub fn activate(&mut self, plan: ProductId) {
        if self.pending.as_ref() == Some(&plan) {
            self.pending = None;
        }
        self.active = Some(plan);
    }

    /// Rebuild the pending marker from a freshly loaded item list.
    pub fn sync_pending<'a>(&mut self, plans: &SubscriptionPlans, mut ids: impl Iterator<Item = &'a ProductId>) {
        self.pending = ids.find(|id| plans.contains(id)).cloned();
    }

    pub fn observe(&mut self, event: &CartEvent) {
        match event {
            CartEvent::ItemAdded { product_id, subscription: true, .. } => self.pending = Some(product_id.clone()),
            CartEvent::SubscriptionEvicted { product_id } => {
                if self.pending.as_ref() == Some(product_id) {
                    self.pending = None;
                }
            }
            CartEvent::ItemRemoved { product_id } => {
                if self.pending.as_ref() == Some(product_id) {
                    self.pending = None;
                }
                if self.active.as_ref() == Some(product_id) {
                    self.active = None;
                }
            }
            CartEvent::Cleared => self.pending = None,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plans() {
        let plans = SubscriptionPlans::default();
        assert!(plans.contains(&ProductId::new("plan-anual")));
        assert!(!plans.contains(&ProductId::new("camiseta")));
    }

    #[test]
    fn test_blank_ids_are_ignored() {
        let plans = SubscriptionPlans::new(["", " ", "plan-x"]);
        assert_eq!(plans.iter().count(), 1);
    }

    #[test]
    fn test_tracker_follows_events() {
        let mut tracker = SubscriptionTracker::default();
        let a = ProductId::new("plan-mensual");
        let b = ProductId::new("plan-anual");
        tracker.observe(&CartEvent::ItemAdded { product_id: a.clone(), quantity: 1, subscription: true });
        assert_eq!(tracker.pending(), Some(&a));
        tracker.observe(&CartEvent::SubscriptionEvicted { product_id: a.clone() });
        tracker.observe(&CartEvent::ItemAdded { product_id: b.clone(), quantity: 1, subscription: true });
        assert_eq!(tracker.pending(), Some(&b));
        tracker.observe(&CartEvent::Cleared);
        assert_eq!(tracker.pending(), None);
    }

    #[test]
    fn test_removing_active_plan_clears_marker() {
        let mut tracker = SubscriptionTracker::default();
        let plan = ProductId::new("plan-anual");
        tracker.activate(plan.clone());
        tracker.observe(&CartEvent::ItemRemoved { product_id: plan });
        assert_eq!(tracker.active(), None);
    }
}
