//! Stock, stock-update and snapshot storage (spec §3.1, §4.8). Idempotency
//! is enforced inside the same transaction as the quantity update: the
//! `processed_tranlog_events` row and the `stock` row either both commit or
//! neither does (spec §5: "Stock apply and state-store write must be in one
//! transactional window").

use crate::model::{SnapshotFrequency, SnapshotSchedule, Stock, StockSnapshot, StockSnapshotItem, StockUpdate, StockUpdateReason};
use chrono::{DateTime, Utc};
use pos_domain::ids::{ItemCode, StaffId, StoreCode, TenantId};
use sqlx::{PgPool, Row};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StockStoreError {
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StockStoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

fn update_type_str(reason: StockUpdateReason) -> &'static str {
    match reason {
        StockUpdateReason::Sale => "sale",
        StockUpdateReason::Return => "return",
        StockUpdateReason::VoidReturn => "void_return",
        StockUpdateReason::VoidSale => "void_sale",
        StockUpdateReason::ManualIn => "manual_in",
        StockUpdateReason::ManualOut => "manual_out",
        StockUpdateReason::Adjustment => "adjustment",
        StockUpdateReason::Purchase => "purchase",
    }
}

fn parse_update_type(value: &str) -> StockUpdateReason {
    match value {
        "return" => StockUpdateReason::Return,
        "void_return" => StockUpdateReason::VoidReturn,
        "void_sale" => StockUpdateReason::VoidSale,
        "manual_in" => StockUpdateReason::ManualIn,
        "manual_out" => StockUpdateReason::ManualOut,
        "adjustment" => StockUpdateReason::Adjustment,
        "purchase" => StockUpdateReason::Purchase,
        _ => StockUpdateReason::Sale,
    }
}

fn frequency_str(frequency: SnapshotFrequency) -> &'static str {
    match frequency {
        SnapshotFrequency::Daily => "daily",
        SnapshotFrequency::Weekly => "weekly",
        SnapshotFrequency::Monthly => "monthly",
    }
}

fn parse_frequency(value: &str) -> SnapshotFrequency {
    match value {
        "weekly" => SnapshotFrequency::Weekly,
        "monthly" => SnapshotFrequency::Monthly,
        _ => SnapshotFrequency::Daily,
    }
}

/// Repository over `stock`, `stock_update`, `processed_tranlog_events`,
/// `stock_snapshot`(`_item`) and `stock_snapshot_schedule`.
pub struct StockRepository {
    pool: PgPool,
}

impl StockRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns [`StockStoreError::Database`] if any statement fails.
    pub async fn migrate(&self) -> Result<(), StockStoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS stock (
                tenant_id TEXT NOT NULL,
                store_code TEXT NOT NULL,
                item_code TEXT NOT NULL,
                current_quantity BIGINT NOT NULL DEFAULT 0,
                minimum_quantity BIGINT,
                reorder_point BIGINT,
                reorder_quantity BIGINT,
                last_update_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (tenant_id, store_code, item_code)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS stock_update (
                event_id TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                store_code TEXT NOT NULL,
                item_code TEXT NOT NULL,
                previous_quantity BIGINT NOT NULL,
                quantity_change BIGINT NOT NULL,
                new_quantity BIGINT NOT NULL,
                update_type TEXT NOT NULL,
                reference_id TEXT,
                operator_id TEXT,
                note TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_stock_update_key ON stock_update (tenant_id, store_code, item_code)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS processed_tranlog_events (
                event_id TEXT PRIMARY KEY,
                processed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS stock_snapshot (
                snapshot_id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                store_code TEXT NOT NULL,
                generate_date_time TIMESTAMPTZ NOT NULL,
                created_by TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS stock_snapshot_item (
                snapshot_id TEXT NOT NULL REFERENCES stock_snapshot(snapshot_id),
                item_code TEXT NOT NULL,
                quantity BIGINT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS stock_snapshot_schedule (
                tenant_id TEXT PRIMARY KEY,
                frequency TEXT NOT NULL,
                retention_days BIGINT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Whether `event_id` has already been applied (spec §4.8 step 1).
    /// Exposed separately from [`Self::apply_delta`] so a caller can
    /// short-circuit before building a delta; the authoritative check still
    /// happens again inside the transaction that applies it.
    ///
    /// # Errors
    ///
    /// Returns [`StockStoreError::Database`] on failure.
    pub async fn is_processed(&self, event_id: &str) -> Result<bool, StockStoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT event_id FROM processed_tranlog_events WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Applies every line item's signed quantity delta for one tranlog
    /// event and records the idempotency marker in a single transaction
    /// (spec §5: "Stock apply and state-store write must be in one
    /// transactional window"). The whole event is the unit of idempotency:
    /// `event_id` is checked and marked processed exactly once, covering
    /// every delta in `deltas`. Returns `Ok(None)` without touching any
    /// quantity if `event_id` was already applied.
    ///
    /// # Errors
    ///
    /// Returns [`StockStoreError::Database`] if any statement fails; the
    /// whole transaction rolls back.
    #[allow(clippy::too_many_arguments)]
    pub async fn apply_transaction(
        &self,
        event_id: &str,
        tenant_id: &TenantId,
        store_code: &StoreCode,
        deltas: &[(ItemCode, i64)],
        update_type: StockUpdateReason,
        reference_id: Option<&str>,
        operator_id: Option<&StaffId>,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<StockUpdate>>, StockStoreError> {
        let mut tx = self.pool.begin().await?;

        let already: Option<(String,)> = sqlx::query_as("SELECT event_id FROM processed_tranlog_events WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?;
        if already.is_some() {
            tx.rollback().await?;
            return Ok(None);
        }

        let mut updates = Vec::with_capacity(deltas.len());
        for (item_code, quantity_change) in deltas {
            sqlx::query(
                r"
                INSERT INTO stock (tenant_id, store_code, item_code, current_quantity, last_update_time)
                VALUES ($1, $2, $3, 0, $4)
                ON CONFLICT (tenant_id, store_code, item_code) DO NOTHING
                ",
            )
            .bind(tenant_id.as_str())
            .bind(store_code.as_str())
            .bind(item_code.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;

            let row = sqlx::query(
                r"
                UPDATE stock
                SET current_quantity = current_quantity + $4, last_update_time = $5
                WHERE tenant_id = $1 AND store_code = $2 AND item_code = $3
                RETURNING current_quantity - $4 AS previous_quantity, current_quantity AS new_quantity
                ",
            )
            .bind(tenant_id.as_str())
            .bind(store_code.as_str())
            .bind(item_code.as_str())
            .bind(*quantity_change)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

            let previous_quantity: i64 = row.try_get("previous_quantity")?;
            let new_quantity: i64 = row.try_get("new_quantity")?;

            sqlx::query(
                r"
                INSERT INTO stock_update (
                    event_id, tenant_id, store_code, item_code, previous_quantity,
                    quantity_change, new_quantity, update_type, reference_id, operator_id, note, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NULL, $11)
                ",
            )
            .bind(event_id)
            .bind(tenant_id.as_str())
            .bind(store_code.as_str())
            .bind(item_code.as_str())
            .bind(previous_quantity)
            .bind(*quantity_change)
            .bind(new_quantity)
            .bind(update_type_str(update_type))
            .bind(reference_id)
            .bind(operator_id.map(StaffId::as_str))
            .bind(now)
            .execute(&mut *tx)
            .await?;

            updates.push(StockUpdate {
                event_id: event_id.to_string(),
                tenant_id: tenant_id.clone(),
                store_code: store_code.clone(),
                item_code: item_code.clone(),
                previous_quantity,
                quantity_change: *quantity_change,
                new_quantity,
                update_type,
                reference_id: reference_id.map(str::to_string),
                operator_id: operator_id.cloned(),
                note: None,
                timestamp: now,
            });
        }

        sqlx::query("INSERT INTO processed_tranlog_events (event_id, processed_at) VALUES ($1, $2)")
            .bind(event_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(updates))
    }

    /// # Errors
    ///
    /// Returns [`StockStoreError::Database`] on failure.
    pub async fn get(&self, tenant_id: &TenantId, store_code: &StoreCode, item_code: &ItemCode) -> Result<Option<Stock>, StockStoreError> {
        let row = sqlx::query(
            r"
            SELECT current_quantity, minimum_quantity, reorder_point, reorder_quantity, last_update_time
            FROM stock WHERE tenant_id = $1 AND store_code = $2 AND item_code = $3
            ",
        )
        .bind(tenant_id.as_str())
        .bind(store_code.as_str())
        .bind(item_code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Stock {
            tenant_id: tenant_id.clone(),
            store_code: store_code.clone(),
            item_code: item_code.clone(),
            current_quantity: r.get("current_quantity"),
            minimum_quantity: r.get("minimum_quantity"),
            reorder_point: r.get("reorder_point"),
            reorder_quantity: r.get("reorder_quantity"),
            last_update_time: r.get("last_update_time"),
        }))
    }

    /// Lists every stock row at or below its configured minimum or reorder
    /// point, for the low-stock/reorder-alert endpoints (spec §4.8).
    ///
    /// # Errors
    ///
    /// Returns [`StockStoreError::Database`] on failure.
    pub async fn list_below_threshold(&self, tenant_id: &TenantId, store_code: &StoreCode) -> Result<Vec<Stock>, StockStoreError> {
        let rows = sqlx::query(
            r"
            SELECT item_code, current_quantity, minimum_quantity, reorder_point, reorder_quantity, last_update_time
            FROM stock
            WHERE tenant_id = $1 AND store_code = $2
              AND ((minimum_quantity IS NOT NULL AND current_quantity <= minimum_quantity)
                OR (reorder_point IS NOT NULL AND current_quantity <= reorder_point))
            ",
        )
        .bind(tenant_id.as_str())
        .bind(store_code.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Stock {
                tenant_id: tenant_id.clone(),
                store_code: store_code.clone(),
                item_code: ItemCode::new(r.get::<String, _>("item_code")),
                current_quantity: r.get("current_quantity"),
                minimum_quantity: r.get("minimum_quantity"),
                reorder_point: r.get("reorder_point"),
                reorder_quantity: r.get("reorder_quantity"),
                last_update_time: r.get("last_update_time"),
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns [`StockStoreError::Database`] on failure.
    #[allow(clippy::too_many_arguments)]
    pub async fn set_thresholds(
        &self,
        tenant_id: &TenantId,
        store_code: &StoreCode,
        item_code: &ItemCode,
        minimum_quantity: Option<i64>,
        reorder_point: Option<i64>,
        reorder_quantity: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<(), StockStoreError> {
        sqlx::query(
            r"
            INSERT INTO stock (tenant_id, store_code, item_code, current_quantity, minimum_quantity, reorder_point, reorder_quantity, last_update_time)
            VALUES ($1, $2, $3, 0, $4, $5, $6, $7)
            ON CONFLICT (tenant_id, store_code, item_code)
            DO UPDATE SET minimum_quantity = $4, reorder_point = $5, reorder_quantity = $6, last_update_time = $7
            ",
        )
        .bind(tenant_id.as_str())
        .bind(store_code.as_str())
        .bind(item_code.as_str())
        .bind(minimum_quantity)
        .bind(reorder_point)
        .bind(reorder_quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// History of stock updates for one item, most recent first (spec
    /// §4.8's history endpoint).
    ///
    /// # Errors
    ///
    /// Returns [`StockStoreError::Database`] on failure.
    pub async fn history(
        &self,
        tenant_id: &TenantId,
        store_code: &StoreCode,
        item_code: &ItemCode,
        limit: i64,
    ) -> Result<Vec<StockUpdate>, StockStoreError> {
        let rows = sqlx::query(
            r"
            SELECT event_id, previous_quantity, quantity_change, new_quantity, update_type,
                   reference_id, operator_id, note, created_at
            FROM stock_update
            WHERE tenant_id = $1 AND store_code = $2 AND item_code = $3
            ORDER BY created_at DESC
            LIMIT $4
            ",
        )
        .bind(tenant_id.as_str())
        .bind(store_code.as_str())
        .bind(item_code.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let operator_id: Option<String> = r.get("operator_id");
                StockUpdate {
                    event_id: r.get("event_id"),
                    tenant_id: tenant_id.clone(),
                    store_code: store_code.clone(),
                    item_code: item_code.clone(),
                    previous_quantity: r.get("previous_quantity"),
                    quantity_change: r.get("quantity_change"),
                    new_quantity: r.get("new_quantity"),
                    update_type: parse_update_type(&r.get::<String, _>("update_type")),
                    reference_id: r.get("reference_id"),
                    operator_id: operator_id.map(StaffId::new),
                    note: r.get("note"),
                    timestamp: r.get("created_at"),
                }
            })
            .collect())
    }

    /// Takes a full snapshot of every item's current quantity for a store
    /// (spec §4.8's scheduled snapshot task).
    ///
    /// # Errors
    ///
    /// Returns [`StockStoreError::Database`] on failure.
    pub async fn take_snapshot(
        &self,
        tenant_id: &TenantId,
        store_code: &StoreCode,
        created_by: Option<&StaffId>,
        now: DateTime<Utc>,
    ) -> Result<StockSnapshot, StockStoreError> {
        let rows = sqlx::query("SELECT item_code, current_quantity FROM stock WHERE tenant_id = $1 AND store_code = $2")
            .bind(tenant_id.as_str())
            .bind(store_code.as_str())
            .fetch_all(&self.pool)
            .await?;

        let items: Vec<StockSnapshotItem> = rows
            .into_iter()
            .map(|r| StockSnapshotItem { item_code: ItemCode::new(r.get::<String, _>("item_code")), quantity: r.get("current_quantity") })
            .collect();

        let snapshot_id = uuid::Uuid::new_v4().to_string();

        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO stock_snapshot (snapshot_id, tenant_id, store_code, generate_date_time, created_by) VALUES ($1, $2, $3, $4, $5)")
            .bind(&snapshot_id)
            .bind(tenant_id.as_str())
            .bind(store_code.as_str())
            .bind(now)
            .bind(created_by.map(StaffId::as_str))
            .execute(&mut *tx)
            .await?;
        for item in &items {
            sqlx::query("INSERT INTO stock_snapshot_item (snapshot_id, item_code, quantity) VALUES ($1, $2, $3)")
                .bind(&snapshot_id)
                .bind(item.item_code.as_str())
                .bind(item.quantity)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(StockSnapshot {
            snapshot_id,
            tenant_id: tenant_id.clone(),
            store_code: store_code.clone(),
            generate_date_time: now,
            created_by: created_by.cloned(),
            items,
        })
    }

    /// Deletes snapshots older than `older_than`, the other half of the
    /// scheduled snapshot task (spec §6.5's retention-days config).
    ///
    /// # Errors
    ///
    /// Returns [`StockStoreError::Database`] on failure.
    pub async fn prune_snapshots(&self, tenant_id: &TenantId, older_than: DateTime<Utc>) -> Result<u64, StockStoreError> {
        let snapshot_ids: Vec<(String,)> =
            sqlx::query_as("SELECT snapshot_id FROM stock_snapshot WHERE tenant_id = $1 AND generate_date_time < $2")
                .bind(tenant_id.as_str())
                .bind(older_than)
                .fetch_all(&self.pool)
                .await?;

        let mut tx = self.pool.begin().await?;
        for (snapshot_id,) in &snapshot_ids {
            sqlx::query("DELETE FROM stock_snapshot_item WHERE snapshot_id = $1").bind(snapshot_id).execute(&mut *tx).await?;
        }
        let result = sqlx::query("DELETE FROM stock_snapshot WHERE tenant_id = $1 AND generate_date_time < $2")
            .bind(tenant_id.as_str())
            .bind(older_than)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// # Errors
    ///
    /// Returns [`StockStoreError::Database`] on failure.
    pub async fn save_schedule(&self, schedule: &SnapshotSchedule) -> Result<(), StockStoreError> {
        sqlx::query(
            r"
            INSERT INTO stock_snapshot_schedule (tenant_id, frequency, retention_days)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id) DO UPDATE SET frequency = $2, retention_days = $3
            ",
        )
        .bind(schedule.tenant_id.as_str())
        .bind(frequency_str(schedule.frequency))
        .bind(schedule.retention_days)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Every store code with at least one tracked stock row for a tenant,
    /// the snapshot scheduler's substitute for a store registry it doesn't
    /// otherwise have a dependency on.
    ///
    /// # Errors
    ///
    /// Returns [`StockStoreError::Database`] on failure.
    pub async fn list_tracked_stores(&self, tenant_id: &TenantId) -> Result<Vec<StoreCode>, StockStoreError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT store_code FROM stock WHERE tenant_id = $1").bind(tenant_id.as_str()).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(store_code,)| StoreCode::new(store_code)).collect())
    }

    /// # Errors
    ///
    /// Returns [`StockStoreError::Database`] on failure.
    pub async fn list_schedules(&self) -> Result<Vec<SnapshotSchedule>, StockStoreError> {
        let rows = sqlx::query("SELECT tenant_id, frequency, retention_days FROM stock_snapshot_schedule").fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|r| SnapshotSchedule {
                tenant_id: TenantId::new(r.get::<String, _>("tenant_id")),
                frequency: parse_frequency(&r.get::<String, _>("frequency")),
                retention_days: r.get("retention_days"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_type_roundtrips_through_its_string_form() {
        for reason in [
            StockUpdateReason::Sale,
            StockUpdateReason::Return,
            StockUpdateReason::VoidReturn,
            StockUpdateReason::VoidSale,
            StockUpdateReason::ManualIn,
            StockUpdateReason::ManualOut,
            StockUpdateReason::Adjustment,
            StockUpdateReason::Purchase,
        ] {
            assert_eq!(parse_update_type(update_type_str(reason)), reason);
        }
    }

    #[test]
    fn frequency_roundtrips_through_its_string_form() {
        for frequency in [SnapshotFrequency::Daily, SnapshotFrequency::Weekly, SnapshotFrequency::Monthly] {
            assert_eq!(parse_frequency(frequency_str(frequency)), frequency);
        }
    }
}
