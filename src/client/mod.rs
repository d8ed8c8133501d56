//! Client library
//!
//! - [`CartSessionManager`]: in-memory mirror of a user's persistent cart
//! - [`CheckoutOrchestrator`]: drives the button and hosted payment flows
//! - [`HttpStorefrontClient`]: the storefront HTTP API behind both

use thiserror::Error;

use crate::StorefrontError;

pub mod api;
pub mod checkout;
pub mod session;

pub use api::{CartApi, HostedCheckoutApi, HttpStorefrontClient, ReceiptApi};
pub use checkout::{CheckoutError, CheckoutOrchestrator};
pub use session::{CartSessionManager, CouponOutcome, SessionError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("storefront unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storefront answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error(transparent)]
    Service(#[from] StorefrontError),
}
