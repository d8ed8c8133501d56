//! Aggregates module
pub mod backoffice;
pub mod cart;
pub mod coupon;
pub mod product;
pub mod receipt;

pub use backoffice::{Branch, Company, Offer, Role, StockLine, User};
pub use cart::{Cart, CartCommand, CartError, CartItem, CartRules, Transition};
pub use coupon::{Coupon, CouponValidation};
pub use product::{Product, ProductError};
pub use receipt::{DateRange, NewReceipt, ProductSales, Receipt, ReceiptError, SalesReport};
