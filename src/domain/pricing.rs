//! Cart totals.
//!
//! Totals are derived data: they are recomputed from the items and the coupon
//! every time and never stored as the source of truth.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::cart::CartItem;
use crate::domain::aggregates::coupon::Coupon;
use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

pub fn totals(items: &[CartItem], coupon: Option<&Coupon>) -> Totals {
    let subtotal = items.iter().map(CartItem::line_total).sum::<Money>().rounded();
    let percent = coupon.map_or(Decimal::ZERO, |c| c.discount_percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED));
    let discount = subtotal.percentage(percent);
    Totals { subtotal, discount, total: subtotal.subtract(discount) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn item(id: &str, price: Decimal, qty: u32) -> CartItem { CartItem::new(id, id, Money::new(price)).with_quantity(qty) }

    #[test]
    fn test_totals_without_coupon() {
        let t = totals(&[item("a", dec!(9.99), 3), item("b", dec!(0.02), 1)], None);
        assert_eq!(t.subtotal.amount(), dec!(29.99));
        assert_eq!(t.discount, Money::zero());
        assert_eq!(t.total.amount(), dec!(29.99));
    }

    #[test]
    fn test_totals_with_coupon() {
        let coupon = Coupon::new("DIEZ", dec!(10), NaiveDate::from_ymd_opt(2099, 1, 1).unwrap());
        let t = totals(&[item("a", dec!(100), 2)], Some(&coupon));
        assert_eq!(t.discount.amount(), dec!(20));
        assert_eq!(t.total.amount(), dec!(180.00));
    }

    #[test]
    fn test_empty_cart_totals_zero() { assert_eq!(totals(&[], None), Totals::default()); }
}
