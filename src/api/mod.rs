//! HTTP API
//!
//! Routes:
//! - `/carrito/:user_id[/:product_id]`, `/carrito/:user_id/aplicar-cupon`
//! - `/recibos[/:id]`, `/reportes/ventas`
//! - `/pagos/sesion`, `/pagos/confirmar`
//! - `/productos`, `/cupones`, `/ofertas`, `/empresas`, `/usuarios` (each with `/:id`)
//! - `/health`

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::domain::subscription::SubscriptionPlans;
use crate::messaging::EventPublisher;
use crate::services::payments::HostedCheckoutProvider;
use crate::services::{CartService, HostedCheckoutService, ReceiptService};
use crate::storage::DocumentStore;

pub mod admin;
pub mod carts;
pub mod error;
pub mod extract;
pub mod payments;
pub mod receipts;

pub use error::{ApiError, ApiResult};
pub use extract::{AppJson, AppPath, AppQuery};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub carts: CartService,
    pub receipts: ReceiptService,
    pub checkout: Option<HostedCheckoutService>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, plans: SubscriptionPlans, events: EventPublisher) -> Self {
        Self {
            carts: CartService::new(store.clone(), plans, events.clone()),
            receipts: ReceiptService::new(store.clone(), events),
            checkout: None,
            store,
        }
    }

    /// Enables the hosted payment routes.
    pub fn with_hosted_checkout(mut self, provider: Arc<dyn HostedCheckoutProvider>, public_base_url: &str, events: EventPublisher) -> Self {
        self.checkout = Some(HostedCheckoutService::new(
            self.carts.clone(),
            self.receipts.clone(),
            self.store.clone(),
            provider,
            public_base_url,
            events,
        ));
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }))
        .merge(carts::routes())
        .merge(receipts::routes())
        .merge(payments::routes())
        .merge(admin::routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: u32,
}

impl ListParams {
    /// Slices `items` to the requested page: page defaults to 1, page size
    /// to 20 and is capped at 100.
    pub fn paginate<T>(&self, items: Vec<T>) -> PaginatedResponse<T> {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100) as usize;
        let total = items.len();
        let skip = (page as usize - 1).saturating_mul(per_page);
        PaginatedResponse { data: items.into_iter().skip(skip).take(per_page).collect(), total, page }
    }
}
