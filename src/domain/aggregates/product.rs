//! Product Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::aggregates::cart::CartItem;
use crate::domain::value_objects::{Money, ProductId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Product {
    #[serde(rename = "nombre")]
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(rename = "descripcion", default)]
    pub description: String,
    #[serde(rename = "precio")]
    #[validate(custom = "validate_price")]
    pub price: Money,
    #[serde(rename = "foto", default)]
    pub photo_url: String,
    #[serde(default)]
    pub stock: u32,
    #[serde(rename = "promocion", default)]
    pub is_promotional: bool,
    #[serde(rename = "activo", default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool { true }

impl Product {
    pub fn create(name: impl Into<String>, price: Money) -> Self {
        Self {
            name: name.into(), description: String::new(), price, photo_url: String::new(),
            stock: 0, is_promotional: false, active: true,
        }
    }

    pub fn is_in_stock(&self) -> bool { self.stock > 0 }

    pub fn add_inventory(&mut self, qty: u32) { self.stock = self.stock.saturating_add(qty); }

    pub fn remove_inventory(&mut self, qty: u32) -> Result<(), ProductError> {
        self.stock = self.stock.checked_sub(qty).ok_or(ProductError::InsufficientInventory { available: self.stock, requested: qty })?;
        Ok(())
    }

    /// Line to put in a cart for this product.
    pub fn to_cart_item(&self, id: impl Into<ProductId>) -> CartItem {
        CartItem {
            product_id: id.into(), quantity: 1, unit_price: self.price, name: self.name.clone(),
            photo_ref: self.photo_url.clone(), is_promotional: self.is_promotional,
        }
    }
}

fn validate_price(price: &Money) -> Result<(), ValidationError> {
    if price.amount() < Decimal::ZERO {
        return Err(ValidationError::new("negative_price"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("insufficient inventory: {available} available, {requested} requested")]
    InsufficientInventory { available: u32, requested: u32 },
}
