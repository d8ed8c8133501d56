//! Storefront
//!
//! Retail storefront service and client library.
//!
//! ## Features
//! - Per-user persistent carts with coupons and subscription-plan rules
//! - Coupon validation
//! - Checkout: button capture and hosted redirect payment flows
//! - Receipts and sales reports
//! - Back-office CRUD for products, coupons, offers, companies and users

use thiserror::Error;

pub mod api;
pub mod client;
pub mod config;
pub mod domain;
pub mod messaging;
pub mod services;
pub mod storage;

pub use domain::aggregates::{Cart, CartItem, Coupon, Receipt};
pub use domain::value_objects::{Money, ProductId, UserId};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Cart(#[from] domain::aggregates::CartError),

    #[error(transparent)]
    Receipt(#[from] domain::aggregates::ReceiptError),

    #[error("invalid data: {0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("payment failed: {0}")]
    Payment(#[from] services::payments::PaymentError),

    #[error("payment for session {0} has not been completed")]
    PaymentNotCompleted(String),

    #[error("online payments are not configured")]
    PaymentsUnavailable,

    #[error("storage error: {0}")]
    Storage(#[from] storage::StoreError),
}

impl From<validator::ValidationErrors> for StorefrontError {
    fn from(errors: validator::ValidationErrors) -> Self { Self::Validation(errors.to_string()) }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
