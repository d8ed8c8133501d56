//! Application services: the operations behind the HTTP API.

pub mod cart;
pub mod checkout;
pub mod coupons;
pub mod payments;
pub mod receipts;

pub use cart::CartService;
pub use checkout::{HostedCheckoutService, PaymentSession};
pub use coupons::CouponValidator;
pub use receipts::ReceiptService;

use crate::domain::aggregates::{Cart, Company, Coupon, Offer, Product, Receipt, User};
use crate::storage::Document;

impl Document for Cart {
    const COLLECTION: &'static str = "carritos";
}

impl Document for Coupon {
    const COLLECTION: &'static str = "cupones";
}

impl Document for Receipt {
    const COLLECTION: &'static str = "recibos";
}

impl Document for Product {
    const COLLECTION: &'static str = "productos";
}

impl Document for Offer {
    const COLLECTION: &'static str = "ofertas";
}

impl Document for Company {
    const COLLECTION: &'static str = "empresas";
}

impl Document for User {
    const COLLECTION: &'static str = "usuarios";
}
