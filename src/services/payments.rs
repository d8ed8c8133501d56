//! Payment provider contracts.
//!
//! Two flows are supported: a button flow where the client creates and
//! captures a provider order itself, and a hosted flow where the server
//! creates a checkout session and confirms it when the user is redirected
//! back. [`HttpPaymentGateway`] speaks the provider's JSON contract for both.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::domain::value_objects::Money;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payment provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("payment was declined")]
    Declined,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStatus {
    Completed,
    Pending,
    Declined,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    pub id: String,
    pub status: CaptureStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HostedSessionRequest {
    pub reference: String,
    pub amount: Money,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedSession {
    pub id: String,
    pub url: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostedSessionStatus {
    Open,
    Paid,
    Expired,
}

/// Button flow: order creation and capture driven from the client.
#[async_trait]
pub trait ButtonPaymentProvider: Send + Sync {
    async fn create_order(&self, amount: Money, reference: &str) -> Result<String, PaymentError>;
    async fn capture_order(&self, order_id: &str) -> Result<Capture, PaymentError>;
}

/// Hosted flow: redirect to a provider page, confirm on return.
#[async_trait]
pub trait HostedCheckoutProvider: Send + Sync {
    async fn create_session(&self, request: &HostedSessionRequest) -> Result<HostedSession, PaymentError>;
    async fn session_status(&self, session_id: &str) -> Result<HostedSessionStatus, PaymentError>;
}

#[derive(Clone, Debug)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct OrderRequest<'a> {
    amount: Money,
    reference: &'a str,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
}

#[derive(Deserialize)]
struct SessionStatusResponse {
    status: HostedSessionStatus,
}

impl HttpPaymentGateway {
    pub fn new(base_url: impl Into<String>) -> Self { Self::with_client(reqwest::Client::new(), base_url) }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, PaymentError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Rejected { status: status.as_u16(), message });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ButtonPaymentProvider for HttpPaymentGateway {
    #[instrument(skip(self))]
    async fn create_order(&self, amount: Money, reference: &str) -> Result<String, PaymentError> {
        let request = self.client.post(format!("{}/orders", self.base_url)).json(&OrderRequest { amount, reference });
        let order: OrderResponse = self.send(request).await?;
        debug!(order_id = %order.id, "provider order created");
        Ok(order.id)
    }

    #[instrument(skip(self))]
    async fn capture_order(&self, order_id: &str) -> Result<Capture, PaymentError> {
        self.send(self.client.post(format!("{}/orders/{}/capture", self.base_url, order_id))).await
    }
}

#[async_trait]
impl HostedCheckoutProvider for HttpPaymentGateway {
    #[instrument(skip(self))]
    async fn create_session(&self, request: &HostedSessionRequest) -> Result<HostedSession, PaymentError> {
        self.send(self.client.post(format!("{}/sessions", self.base_url)).json(request)).await
    }

    #[instrument(skip(self))]
    async fn session_status(&self, session_id: &str) -> Result<HostedSessionStatus, PaymentError> {
        let response: SessionStatusResponse = self.send(self.client.get(format!("{}/sessions/{}", self.base_url, session_id))).await?;
        Ok(response.status)
    }
}
