//! Storefront server

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use storefront::api::{self, AppState};
use storefront::config::Config;
use storefront::messaging::EventPublisher;
use storefront::services::payments::HttpPaymentGateway;
use storefront::storage::{DocumentStore, MemoryStore, PgStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    if config.subscription_plans.is_empty() {
        tracing::warn!("SUBSCRIPTION_PLAN_IDS not set, no product is treated as a subscription");
    }

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            let store = PgStore::new(pool);
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            Arc::new(MemoryStore::default())
        }
    };

    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let mut state = AppState::new(store, config.subscription_plans.clone(), events.clone());
    match &config.payment_provider_url {
        Some(url) => {
            state = state.with_hosted_checkout(Arc::new(HttpPaymentGateway::new(url.as_str())), &config.public_base_url, events);
        }
        None => tracing::warn!("PAYMENT_PROVIDER_URL not set, hosted checkout disabled"),
    }

    let app = api::router(state);
    tracing::info!("Storefront listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?, app).await?;
    Ok(())
}
