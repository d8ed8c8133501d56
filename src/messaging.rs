//! Domain event publishing over NATS.

use tracing::{debug, warn};

use crate::domain::events::DomainEvent;

/// Publishes domain events when a NATS connection is configured; otherwise
/// events are only traced.
#[derive(Clone, Debug, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn disabled() -> Self { Self::default() }

    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::disabled() };
        match async_nats::connect(url).await {
            Ok(client) => Self::new(Some(client)),
            Err(e) => {
                warn!(error = %e, url, "NATS unavailable, domain events will not be published");
                Self::disabled()
            }
        }
    }

    pub async fn publish(&self, event: DomainEvent) {
        let subject = event.subject();
        let Some(client) = &self.nats else {
            debug!(subject, ?event, "domain event");
            return;
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, subject, "could not encode domain event");
                return;
            }
        };
        if let Err(e) = client.publish(subject, payload.into()).await {
            warn!(error = %e, subject, "failed to publish domain event");
        }
    }
}
