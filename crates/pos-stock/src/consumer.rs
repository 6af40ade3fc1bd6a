//! Stock consumer: applies each committed tranlog to `Stock`, one signed
//! delta per active line item, in the single transactional window spec §5
//! requires (spec §4.8).
//!
//! Implements [`Projection`] so it can be driven by
//! `pos_projections::TranlogPoller`. Idempotency is the transaction's job
//! (`StockRepository::apply_transaction`), not this module's: `apply_event`
//! is safe to call more than once for the same event.

use crate::alerts::evaluate_alerts;
use crate::model::StockUpdateReason;
use crate::store::{StockRepository, StockStoreError};
use pos_cart::tranlog::TransactionLog;
use pos_core::projection::{Projection, ProjectionError};
use pos_delivery::DeliveryTracker;
use std::sync::Arc;

impl From<StockStoreError> for ProjectionError {
    fn from(err: StockStoreError) -> Self {
        ProjectionError::Storage(err.to_string())
    }
}

/// Folds the tranlog stream into `Stock` rows: one instance per process,
/// shared by every terminal and store of the tenant it's polling for.
pub struct StockProjection {
    stock: StockRepository,
    delivery: Arc<DeliveryTracker>,
}

impl StockProjection {
    #[must_use]
    pub fn new(stock: StockRepository, delivery: Arc<DeliveryTracker>) -> Self {
        Self { stock, delivery }
    }
}

impl Projection for StockProjection {
    type Event = TransactionLog;

    fn name(&self) -> &str {
        "stock"
    }

    async fn apply_event(&self, event: &TransactionLog) -> Result<(), ProjectionError> {
        let sign = event.transaction_type.report_sign();
        let reason = StockUpdateReason::from_transaction_type(event.transaction_type);
        let operator_id = event.staff.as_ref().map(|s| s.id.clone());

        // A sale decrements stock, a return/void-return gives it back: the
        // report's additive sign and the stock movement's direction are
        // opposite, so the delta negates `report_sign`.
        let deltas: Vec<(pos_domain::ids::ItemCode, i64)> = event
            .line_items
            .iter()
            .filter(|line| !line.is_cancelled)
            .map(|line| (line.item_code.clone(), -sign * i64::from(line.quantity)))
            .collect();

        if deltas.is_empty() {
            return Ok(());
        }

        let updates = self
            .stock
            .apply_transaction(
                &event.event_id,
                &event.tenant_id,
                &event.store_code,
                &deltas,
                reason,
                Some(&event.transaction_no.to_string()),
                operator_id.as_ref(),
                event.created_at,
            )
            .await?;

        let Some(updates) = updates else {
            // Already processed; nothing new to acknowledge or alert on.
            return Ok(());
        };

        for update in &updates {
            if let Ok(Some(stock)) = self.stock.get(&event.tenant_id, &event.store_code, &update.item_code).await {
                evaluate_alerts(&stock);
            }
        }

        if let Err(err) = self.delivery.acknowledge(&event.event_id, "stock", true).await {
            tracing::warn!(error = %err, event_id = %event.event_id, "failed to acknowledge tranlog delivery to stock");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pos_domain::enums::TransactionType;

    #[test]
    fn sale_deltas_are_negative_and_return_deltas_are_positive() {
        assert_eq!(-TransactionType::NormalSales.report_sign() * 3, -3);
        assert_eq!(-TransactionType::ReturnSales.report_sign() * 3, 3);
        assert_eq!(-TransactionType::VoidSales.report_sign() * 3, 3);
        assert_eq!(-TransactionType::VoidReturn.report_sign() * 3, -3);
    }
}
