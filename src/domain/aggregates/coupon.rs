//! Coupon Aggregate

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Percentage discount redeemable by code until its expiration date (inclusive).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Coupon {
    #[serde(rename = "codigo")]
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    #[serde(rename = "descuento")]
    #[validate(custom = "validate_percent")]
    pub discount_percent: Decimal,
    #[serde(rename = "fecha_expiracion")]
    pub expiration_date: NaiveDate,
}

impl Coupon {
    pub fn new(code: impl Into<String>, discount_percent: Decimal, expiration_date: NaiveDate) -> Self {
        Self { code: code.into(), discount_percent, expiration_date }
    }

    pub fn is_expired_on(&self, today: NaiveDate) -> bool { today > self.expiration_date }
}

/// Outcome of looking a code up in the coupon store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CouponValidation {
    Valid(Coupon),
    NotFound,
    Expired { on: NaiveDate },
}

impl CouponValidation {
    pub fn check(found: Option<Coupon>, today: NaiveDate) -> Self {
        match found {
            None => Self::NotFound,
            Some(c) if c.is_expired_on(today) => Self::Expired { on: c.expiration_date },
            Some(c) => Self::Valid(c),
        }
    }

    pub fn into_coupon(self) -> Option<Coupon> {
        match self { Self::Valid(c) => Some(c), _ => None }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Valid(c) => format!("Coupon {} applied", c.code),
            Self::NotFound => "This coupon code does not exist".to_string(),
            Self::Expired { on } => format!("This coupon expired on {on}"),
        }
    }
}

pub(crate) fn validate_percent(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("percent_out_of_range"));
    }
    Ok(())
}
