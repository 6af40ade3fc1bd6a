//! Stock service orchestration: manual adjustments, threshold configuration,
//! history, snapshots, and the tranlog ingest path (spec §4.8).

use crate::consumer::StockProjection;
use crate::model::{SnapshotSchedule, Stock, StockUpdate, StockUpdateReason};
use crate::store::{StockRepository, StockStoreError};
use pos_cart::tranlog::TransactionLog;
use pos_core::environment::Clock;
use pos_core::projection::{Projection, ProjectionError};
use pos_domain::ids::{ItemCode, StaffId, StoreCode, TenantId};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StockServiceError {
    #[error("store error: {0}")]
    Store(#[from] StockStoreError),
    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),
    #[error("stock not found for item {item_code}")]
    NotFound { item_code: String },
}

/// Identifies one `(tenant, store, item)` stock row.
#[derive(Clone, Debug)]
pub struct StockKey {
    pub tenant_id: TenantId,
    pub store_code: StoreCode,
    pub item_code: ItemCode,
}

/// Orchestrates the stock repository and the tranlog-driven projection
/// behind one service surface for the HTTP handlers.
pub struct StockService<C: Clock> {
    store: StockRepository,
    projection: Arc<StockProjection>,
    clock: Arc<C>,
}

impl<C: Clock> StockService<C> {
    #[must_use]
    pub fn new(store: StockRepository, projection: Arc<StockProjection>, clock: Arc<C>) -> Self {
        Self { store, projection, clock }
    }

    /// # Errors
    ///
    /// Returns [`StockServiceError::NotFound`] if no row exists yet,
    /// [`StockServiceError::Store`] on a database failure.
    pub async fn get(&self, key: &StockKey) -> Result<Stock, StockServiceError> {
        self.store
            .get(&key.tenant_id, &key.store_code, &key.item_code)
            .await?
            .ok_or_else(|| StockServiceError::NotFound { item_code: key.item_code.to_string() })
    }

    /// # Errors
    ///
    /// Returns [`StockServiceError::Store`] on a database failure.
    pub async fn list_low_stock(&self, tenant_id: &TenantId, store_code: &StoreCode) -> Result<Vec<Stock>, StockServiceError> {
        Ok(self.store.list_below_threshold(tenant_id, store_code).await?)
    }

    /// # Errors
    ///
    /// Returns [`StockServiceError::Store`] on a database failure.
    pub async fn set_thresholds(
        &self,
        key: &StockKey,
        minimum_quantity: Option<i64>,
        reorder_point: Option<i64>,
        reorder_quantity: Option<i64>,
    ) -> Result<(), StockServiceError> {
        self.store
            .set_thresholds(&key.tenant_id, &key.store_code, &key.item_code, minimum_quantity, reorder_point, reorder_quantity, self.clock.now())
            .await?;
        Ok(())
    }

    /// Applies a manual stock movement: `manual_in`/`manual_out`/
    /// `adjustment`/`purchase` (spec §3.1's `StockUpdate.update_type`
    /// values that never come from a tranlog). `quantity_change` carries its
    /// own sign; callers choosing `ManualOut` should pass a negative value.
    ///
    /// # Errors
    ///
    /// Returns [`StockServiceError::Store`] on a database failure.
    pub async fn manual_adjust(
        &self,
        key: &StockKey,
        quantity_change: i64,
        reason: StockUpdateReason,
        operator_id: Option<&StaffId>,
        note: Option<&str>,
    ) -> Result<StockUpdate, StockServiceError> {
        let event_id = uuid::Uuid::new_v4().to_string();
        let deltas = [(key.item_code.clone(), quantity_change)];
        let updates = self
            .store
            .apply_transaction(&event_id, &key.tenant_id, &key.store_code, &deltas, reason, note, operator_id, self.clock.now())
            .await?;

        // A freshly generated event_id can never already be processed.
        Ok(updates.and_then(|mut u| u.pop()).expect("manual adjustment always applies its single delta"))
    }

    /// # Errors
    ///
    /// Returns [`StockServiceError::Store`] on a database failure.
    pub async fn history(&self, key: &StockKey, limit: i64) -> Result<Vec<StockUpdate>, StockServiceError> {
        Ok(self.store.history(&key.tenant_id, &key.store_code, &key.item_code, limit).await?)
    }

    /// # Errors
    ///
    /// Returns [`StockServiceError::Store`] on a database failure.
    pub async fn take_snapshot(
        &self,
        tenant_id: &TenantId,
        store_code: &StoreCode,
        created_by: Option<&StaffId>,
    ) -> Result<crate::model::StockSnapshot, StockServiceError> {
        Ok(self.store.take_snapshot(tenant_id, store_code, created_by, self.clock.now()).await?)
    }

    /// # Errors
    ///
    /// Returns [`StockServiceError::Store`] on a database failure.
    pub async fn save_schedule(&self, schedule: &SnapshotSchedule) -> Result<(), StockServiceError> {
        Ok(self.store.save_schedule(schedule).await?)
    }

    /// # Errors
    ///
    /// Returns [`StockServiceError::Store`] on a database failure.
    pub async fn list_schedules(&self) -> Result<Vec<SnapshotSchedule>, StockServiceError> {
        Ok(self.store.list_schedules().await?)
    }

    /// Ingests one tranlog event (the `POST /tranlog` pub/sub handler, spec
    /// §6.1), applying it to stock through the same [`Projection`] a
    /// background poller would use. Idempotent: redelivering the same
    /// event is a no-op past the first application.
    ///
    /// # Errors
    ///
    /// Returns [`StockServiceError::Projection`] if the apply fails.
    pub async fn ingest(&self, log: &TransactionLog) -> Result<(), StockServiceError> {
        Ok(self.projection.apply_event(log).await?)
    }
}
