//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog product identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(value: impl Into<String>) -> Self { Self(value.into().trim().to_string()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self { Self::new(value) }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self { Self::new(value) }
}

/// Storefront customer identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self { Self(value.into().trim().to_string()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self { Self::new(value) }
}

/// Money value object. Amounts are in the store currency, two decimal places.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn zero() -> Self { Self(Decimal::ZERO) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn add(&self, other: Money) -> Money { Money(self.0 + other.0) }
    pub fn subtract(&self, other: Money) -> Money { Money(self.0 - other.0) }
    pub fn multiply(&self, qty: u32) -> Money { Money(self.0 * Decimal::from(qty)) }

    /// `percent` of this amount, rounded to cents.
    pub fn percentage(&self, percent: Decimal) -> Money {
        Money((self.0 * percent / Decimal::ONE_HUNDRED).round_dp(2))
    }

    pub fn rounded(&self) -> Money { Money(self.0.round_dp(2)) }
    pub fn is_negative(&self) -> bool { self.0.is_sign_negative() && !self.0.is_zero() }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.2}", self.0) }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self { iter.fold(Money::zero(), |acc, m| acc.add(m)) }
}
