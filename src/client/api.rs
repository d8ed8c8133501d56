//! Storefront API seams used by the client library.
//!
//! The traits are implemented over HTTP by [`HttpStorefrontClient`] and
//! in-process by the services themselves.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::client::ClientError;
use crate::domain::aggregates::{Cart, CartItem, Coupon, NewReceipt, Receipt};
use crate::domain::value_objects::{ProductId, UserId};
use crate::services::payments::HostedSession;
use crate::services::{CartService, HostedCheckoutService, ReceiptService};
use crate::storage::Record;

#[async_trait]
pub trait CartApi: Send + Sync {
    async fn fetch(&self, user: &UserId) -> Result<Cart, ClientError>;
    /// Full replacement of the stored cart.
    async fn replace(&self, user: &UserId, items: &[CartItem], coupon: Option<&Coupon>) -> Result<Cart, ClientError>;
    async fn remove_item(&self, user: &UserId, product_id: &ProductId) -> Result<Vec<CartItem>, ClientError>;
    async fn set_quantity(&self, user: &UserId, product_id: &ProductId, quantity: u32) -> Result<Vec<CartItem>, ClientError>;
    /// `None` when the code is unknown or expired.
    async fn apply_coupon(&self, user: &UserId, code: &str) -> Result<Option<Coupon>, ClientError>;
}

#[async_trait]
pub trait ReceiptApi: Send + Sync {
    async fn record_receipt(&self, receipt: &NewReceipt) -> Result<Record<Receipt>, ClientError>;
}

#[async_trait]
pub trait HostedCheckoutApi: Send + Sync {
    async fn start(&self, user: &UserId) -> Result<HostedSession, ClientError>;
    async fn confirm(&self, session_id: &str) -> Result<Record<Receipt>, ClientError>;
}

#[derive(Clone, Debug)]
pub struct HttpStorefrontClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct CouponResponse {
    cupon: Coupon,
}

impl HttpStorefrontClient {
    pub fn new(base_url: impl Into<String>) -> Self { Self::with_client(reqwest::Client::new(), base_url) }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn status_error(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);
        debug!(status, %message, "storefront request failed");
        ClientError::Status { status, message }
    }
}

#[async_trait]
impl CartApi for HttpStorefrontClient {
    async fn fetch(&self, user: &UserId) -> Result<Cart, ClientError> {
        self.send(self.client.get(self.url(&format!("/carrito/{user}")))).await
    }

    async fn replace(&self, user: &UserId, items: &[CartItem], coupon: Option<&Coupon>) -> Result<Cart, ClientError> {
        let body = json!({ "productos": items, "cupon_aplicado": coupon });
        self.send(self.client.put(self.url(&format!("/carrito/{user}"))).json(&body)).await
    }

    async fn remove_item(&self, user: &UserId, product_id: &ProductId) -> Result<Vec<CartItem>, ClientError> {
        self.send(self.client.delete(self.url(&format!("/carrito/{user}/{product_id}")))).await
    }

    async fn set_quantity(&self, user: &UserId, product_id: &ProductId, quantity: u32) -> Result<Vec<CartItem>, ClientError> {
        let request = self.client.put(self.url(&format!("/carrito/{user}/{product_id}"))).json(&json!({ "cantidad": quantity }));
        self.send(request).await
    }

    async fn apply_coupon(&self, user: &UserId, code: &str) -> Result<Option<Coupon>, ClientError> {
        let response = self
            .client
            .post(self.url(&format!("/carrito/{user}/aplicar-cupon")))
            .json(&json!({ "codigo": code }))
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(response.json::<CouponResponse>().await?.cupon)),
            _ => Err(Self::status_error(response).await),
        }
    }
}

#[async_trait]
impl ReceiptApi for HttpStorefrontClient {
    async fn record_receipt(&self, receipt: &NewReceipt) -> Result<Record<Receipt>, ClientError> {
        self.send(self.client.post(self.url("/recibos")).json(receipt)).await
    }
}

#[async_trait]
impl HostedCheckoutApi for HttpStorefrontClient {
    async fn start(&self, user: &UserId) -> Result<HostedSession, ClientError> {
        self.send(self.client.post(self.url("/pagos/sesion")).json(&json!({ "id_usuario": user }))).await
    }

    async fn confirm(&self, session_id: &str) -> Result<Record<Receipt>, ClientError> {
        self.send(self.client.get(self.url("/pagos/confirmar")).query(&[("session_id", session_id)])).await
    }
}

#[async_trait]
impl CartApi for CartService {
    async fn fetch(&self, user: &UserId) -> Result<Cart, ClientError> { Ok(self.get_or_create(user).await?) }

    async fn replace(&self, user: &UserId, items: &[CartItem], coupon: Option<&Coupon>) -> Result<Cart, ClientError> {
        Ok(CartService::replace(self, user, items.to_vec(), coupon.cloned()).await?)
    }

    async fn remove_item(&self, user: &UserId, product_id: &ProductId) -> Result<Vec<CartItem>, ClientError> {
        Ok(CartService::remove_item(self, user, product_id).await?)
    }

    async fn set_quantity(&self, user: &UserId, product_id: &ProductId, quantity: u32) -> Result<Vec<CartItem>, ClientError> {
        Ok(CartService::set_quantity(self, user, product_id, quantity).await?)
    }

    async fn apply_coupon(&self, user: &UserId, code: &str) -> Result<Option<Coupon>, ClientError> {
        Ok(CartService::apply_coupon(self, user, code).await?.into_coupon())
    }
}

#[async_trait]
impl ReceiptApi for ReceiptService {
    async fn record_receipt(&self, receipt: &NewReceipt) -> Result<Record<Receipt>, ClientError> {
        Ok(self.record(receipt.clone()).await?)
    }
}

#[async_trait]
impl HostedCheckoutApi for HostedCheckoutService {
    async fn start(&self, user: &UserId) -> Result<HostedSession, ClientError> { Ok(HostedCheckoutService::start(self, user).await?) }

    async fn confirm(&self, session_id: &str) -> Result<Record<Receipt>, ClientError> {
        Ok(HostedCheckoutService::confirm(self, session_id).await?)
    }
}
