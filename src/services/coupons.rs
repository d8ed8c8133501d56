//! Coupon lookup.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::debug;

use crate::domain::aggregates::{Coupon, CouponValidation};
use crate::storage::{DocumentStore, Repository};
use crate::Result;

/// Resolves coupon codes against the coupon collection. Codes can be
/// redeemed any number of times.
#[derive(Clone)]
pub struct CouponValidator {
    coupons: Repository<Coupon>,
}

impl CouponValidator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self { Self { coupons: Repository::new(store) } }

    pub async fn validate(&self, code: &str) -> Result<CouponValidation> { self.validate_on(code, Utc::now().date_naive()).await }

    pub async fn validate_on(&self, code: &str, today: NaiveDate) -> Result<CouponValidation> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(CouponValidation::NotFound);
        }
        let found = self.coupons.find_by("codigo", code).await?.map(|r| r.data);
        let validation = CouponValidation::check(found, today);
        debug!(code, ?validation, "coupon checked");
        Ok(validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_validate_on() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::default());
        let expires = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        Repository::<Coupon>::new(store.clone()).insert(Coupon::new("NAVIDAD", dec!(15), expires)).await.unwrap();
        let validator = CouponValidator::new(store);

        let before = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        assert!(matches!(validator.validate_on(" NAVIDAD ", before).await.unwrap(), CouponValidation::Valid(_)));
        let after = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(validator.validate_on("NAVIDAD", after).await.unwrap(), CouponValidation::Expired { on: expires });
        assert_eq!(validator.validate_on("OTRO", before).await.unwrap(), CouponValidation::NotFound);
        assert_eq!(validator.validate_on("", before).await.unwrap(), CouponValidation::NotFound);
    }
}
