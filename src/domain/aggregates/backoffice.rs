//! Back-office entities: offers, companies with their branches, and users.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::value_objects::{Money, ProductId};

/// Time-limited promotional price for a catalog product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_offer_dates"))]
pub struct Offer {
    #[serde(rename = "titulo")]
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    #[serde(rename = "id_producto")]
    pub product_id: ProductId,
    #[serde(rename = "precio_oferta")]
    pub offer_price: Money,
    #[serde(rename = "fecha_inicio")]
    pub starts_on: NaiveDate,
    #[serde(rename = "fecha_fin")]
    pub ends_on: NaiveDate,
}

impl Offer {
    pub fn is_running_on(&self, day: NaiveDate) -> bool { self.starts_on <= day && day <= self.ends_on }
}

fn validate_offer_dates(offer: &Offer) -> Result<(), ValidationError> {
    if offer.ends_on < offer.starts_on {
        return Err(ValidationError::new("offer_ends_before_start"));
    }
    if offer.offer_price.is_negative() {
        return Err(ValidationError::new("negative_offer_price"));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Company {
    #[serde(rename = "nombre")]
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(rename = "logo", default)]
    pub logo_url: String,
    #[serde(rename = "sucursales", default)]
    #[validate]
    pub branches: Vec<Branch>,
}

impl Company {
    /// Units of `product` held across all branches.
    pub fn stock_of(&self, product: &ProductId) -> u64 {
        self.branches.iter().map(|b| u64::from(b.stock_of(product))).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Branch {
    #[serde(rename = "nombre")]
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(rename = "direccion", default)]
    pub address: String,
    #[serde(rename = "inventario", default)]
    pub inventory: Vec<StockLine>,
}

impl Branch {
    pub fn stock_of(&self, product: &ProductId) -> u32 {
        self.inventory.iter().filter(|l| &l.product_id == product).map(|l| l.quantity).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    #[serde(rename = "id_producto")]
    pub product_id: ProductId,
    #[serde(rename = "cantidad")]
    pub quantity: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Cliente,
    Admin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct User {
    #[serde(rename = "nombre")]
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[serde(rename = "rol", default)]
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 3, d).unwrap() }

    #[test]
    fn test_offer_dates_validated() {
        let mut offer = Offer {
            title: "2x1".into(), product_id: ProductId::new("P1"), offer_price: Money::new(dec!(5)),
            starts_on: date(1), ends_on: date(10),
        };
        assert!(offer.validate().is_ok());
        assert!(offer.is_running_on(date(10)));
        offer.starts_on = date(2);
        offer.ends_on = date(1);
        assert!(offer.validate().is_err());
    }

    #[test]
    fn test_company_stock_across_branches() {
        let p = ProductId::new("P1");
        let branch = |q| Branch { name: "Centro".into(), address: String::new(), inventory: vec![StockLine { product_id: p.clone(), quantity: q }] };
        let company = Company { name: "Acme".into(), logo_url: String::new(), branches: vec![branch(3), branch(4)] };
        assert_eq!(company.stock_of(&p), 7);
        assert!(company.validate().is_ok());
    }

    #[test]
    fn test_nested_branch_validation() {
        let company = Company {
            name: "Acme".into(), logo_url: String::new(),
            branches: vec![Branch { name: String::new(), address: String::new(), inventory: vec![] }],
        };
        assert!(company.validate().is_err());
    }

    #[test]
    fn test_user_email_validated() {
        let user = User { name: "Ana".into(), email: "ana@example.com".into(), role: Role::Admin };
        assert!(user.validate().is_ok());
        assert!(User { email: "nope".into(), ..user }.validate().is_err());
    }
}
