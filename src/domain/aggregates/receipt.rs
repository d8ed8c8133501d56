//! Receipt Aggregate

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::cart::{Cart, CartItem};
use crate::domain::aggregates::coupon::Coupon;
use crate::domain::pricing;
use crate::domain::value_objects::{Money, ProductId, UserId};

/// Body of `POST /recibos`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewReceipt {
    #[serde(rename = "id_usuario")]
    pub user_id: UserId,
    #[serde(rename = "productos")]
    pub items: Vec<CartItem>,
    #[serde(rename = "cupon_aplicado", default)]
    pub coupon: Option<Coupon>,
    pub total: Money,
    #[serde(rename = "referencia_pago", default, skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
}

impl NewReceipt {
    pub fn from_cart(cart: &Cart) -> Self {
        Self {
            user_id: cart.owner().clone(),
            items: cart.items().to_vec(),
            coupon: cart.applied_coupon().cloned(),
            total: cart.totals().total,
            payment_reference: None,
        }
    }

    pub fn paid_with(mut self, reference: impl Into<String>) -> Self {
        self.payment_reference = Some(reference.into());
        self
    }

    /// Checks the receipt describes a payable purchase whose total matches
    /// the recomputed one.
    pub fn verify(&self) -> Result<(), ReceiptError> {
        if self.items.is_empty() {
            return Err(ReceiptError::NoItems);
        }
        if self.items.iter().any(|i| i.quantity == 0) {
            return Err(ReceiptError::ZeroQuantity);
        }
        let expected = pricing::totals(&self.items, self.coupon.as_ref()).total;
        if expected != self.total.rounded() {
            return Err(ReceiptError::TotalMismatch { expected, submitted: self.total });
        }
        Ok(())
    }

    pub fn into_receipt(self, issued_at: DateTime<Utc>) -> Receipt {
        Receipt {
            user_id: self.user_id, items: self.items, coupon: self.coupon, total: self.total,
            issued_at, payment_reference: self.payment_reference,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(rename = "id_usuario")]
    pub user_id: UserId,
    #[serde(rename = "productos")]
    pub items: Vec<CartItem>,
    #[serde(rename = "cupon_aplicado", default)]
    pub coupon: Option<Coupon>,
    pub total: Money,
    #[serde(rename = "fecha")]
    pub issued_at: DateTime<Utc>,
    #[serde(rename = "referencia_pago", default, skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
}

impl Receipt {
    pub fn contains(&self, product_id: &ProductId) -> bool { self.items.iter().any(|i| &i.product_id == product_id) }
}

/// Inclusive date range filter for reports.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct DateRange {
    #[serde(rename = "desde")]
    pub from: Option<NaiveDate>,
    #[serde(rename = "hasta")]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.from.map_or(true, |f| day >= f) && self.to.map_or(true, |t| day <= t)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SalesReport {
    #[serde(rename = "recibos")]
    pub receipt_count: usize,
    #[serde(rename = "ingresos")]
    pub gross: Money,
    #[serde(rename = "descuentos")]
    pub discounts: Money,
    #[serde(rename = "productos")]
    pub by_product: Vec<ProductSales>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductSales {
    #[serde(rename = "id_producto")]
    pub product_id: ProductId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "unidades")]
    pub units: u64,
    #[serde(rename = "importe")]
    pub revenue: Money,
}

impl SalesReport {
    pub fn build<'a>(receipts: impl IntoIterator<Item = &'a Receipt>, range: DateRange) -> Self {
        let mut report = SalesReport::default();
        let mut lines: HashMap<ProductId, ProductSales> = HashMap::new();
        for receipt in receipts.into_iter().filter(|r| range.contains(r.issued_at)) {
            report.receipt_count += 1;
            report.gross = report.gross.add(receipt.total);
            report.discounts = report.discounts.add(pricing::totals(&receipt.items, receipt.coupon.as_ref()).discount);
            for item in &receipt.items {
                let line = lines.entry(item.product_id.clone()).or_insert_with(|| ProductSales {
                    product_id: item.product_id.clone(), name: item.name.clone(), units: 0, revenue: Money::zero(),
                });
                line.units += u64::from(item.quantity);
                line.revenue = line.revenue.add(item.line_total());
            }
        }
        report.by_product = lines.into_values().collect();
        report.by_product.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.product_id.cmp(&b.product_id)));
        report
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReceiptError {
    #[error("a receipt needs at least one item")]
    NoItems,
    #[error("receipt items must have a positive quantity")]
    ZeroQuantity,
    #[error("total {submitted} does not match the computed total {expected}")]
    TotalMismatch { expected: Money, submitted: Money },
}
