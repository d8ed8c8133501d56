//! Receipts and sales reporting.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use crate::domain::aggregates::{DateRange, NewReceipt, Receipt, SalesReport};
use crate::domain::events::{DomainEvent, ReceiptEvent};
use crate::messaging::EventPublisher;
use crate::storage::{DocumentStore, Record, Repository};
use crate::{Result, StorefrontError};

#[derive(Clone)]
pub struct ReceiptService {
    receipts: Repository<Receipt>,
    events: EventPublisher,
}

impl ReceiptService {
    pub fn new(store: Arc<dyn DocumentStore>, events: EventPublisher) -> Self {
        Self { receipts: Repository::new(store), events }
    }

    /// Verifies and stores a receipt. The submitted total must equal the
    /// total recomputed from the items and coupon.
    #[instrument(skip(self, receipt), fields(user = %receipt.user_id))]
    pub async fn record(&self, receipt: NewReceipt) -> Result<Record<Receipt>> {
        receipt.verify()?;
        let record = self.receipts.insert(receipt.into_receipt(Utc::now())).await?;
        info!(receipt_id = %record.id, total = %record.data.total, "receipt recorded");
        self.events
            .publish(DomainEvent::Receipt(ReceiptEvent::Recorded {
                receipt_id: record.id.clone(),
                user_id: record.data.user_id.clone(),
                total: record.data.total,
            }))
            .await;
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Result<Record<Receipt>> {
        let receipt = self.receipts.get(id).await?.ok_or_else(|| StorefrontError::NotFound(format!("receipt {id}")))?;
        Ok(Record { id: id.to_string(), data: receipt })
    }

    pub async fn list(&self) -> Result<Vec<Record<Receipt>>> { Ok(self.receipts.list().await?) }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        if !self.receipts.delete(id).await? {
            return Err(StorefrontError::NotFound(format!("receipt {id}")));
        }
        info!("receipt deleted");
        Ok(())
    }

    pub async fn sales_report(&self, range: DateRange) -> Result<SalesReport> {
        let receipts = self.receipts.list().await?;
        Ok(SalesReport::build(receipts.iter().map(|r| &r.data), range))
    }
}
