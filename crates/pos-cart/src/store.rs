//! The tranlog repository: writes the immutable tranlog row and its
//! delivery-status fan-out rows in a single database transaction (spec
//! §4.4, §5), so a publish failure after commit can never leave a tranlog
//! without a tracked delivery status.
//!
//! Publishing the event to the bus happens separately, after commit,
//! through [`pos_delivery::DeliveryTracker`] — that call re-registers the
//! same destinations, which is a no-op against the rows this repository
//! already wrote (`ON CONFLICT DO NOTHING`).

use crate::tranlog::{TransactionLog, TransactionStatusRecord};
use chrono::{DateTime, Utc};
use pos_domain::enums::TransactionStatus as TransactionLifecycle;
use sqlx::PgPool;
use thiserror::Error;

/// Destinations every tranlog event fans out to.
pub const TRANLOG_DESTINATIONS: &[&str] = &["report", "journal", "stock"];

#[derive(Debug, Error)]
pub enum TranlogStoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("tranlog not found for transaction_no={0}")]
    NotFound(i64),
}

impl From<sqlx::Error> for TranlogStoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Repository over the `tranlog` and `tranlog_status` tables.
pub struct TranlogRepository {
    pool: PgPool,
}

impl TranlogRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns [`TranlogStoreError::Database`] if any statement fails.
    pub async fn migrate(&self) -> Result<(), TranlogStoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS tranlog (
                event_id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                store_code TEXT NOT NULL,
                terminal_no INTEGER NOT NULL,
                transaction_no BIGINT NOT NULL,
                receipt_no BIGINT NOT NULL,
                business_date TEXT NOT NULL,
                original_transaction_no BIGINT,
                body JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS tranlog_status (
                transaction_no BIGINT PRIMARY KEY,
                status TEXT NOT NULL,
                voided_at TIMESTAMPTZ,
                refunded_at TIMESTAMPTZ
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS status_tranlog_delivery (
                event_id TEXT NOT NULL,
                destination TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                attempts INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                last_attempted_at TIMESTAMPTZ,
                delivered_at TIMESTAMPTZ,
                PRIMARY KEY (event_id, destination)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Writes `tranlog`, its fresh `tranlog_status` row, and its
    /// `status_tranlog_delivery` fan-out rows in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TranlogStoreError::Database`] if any statement fails; the
    /// whole transaction is rolled back.
    pub async fn insert_with_delivery_status(&self, log: &TransactionLog) -> Result<(), TranlogStoreError> {
        let mut tx = self.pool.begin().await?;

        let body = serde_json::to_value(log).map_err(|e| TranlogStoreError::Database(e.to_string()))?;
        sqlx::query(
            r"
            INSERT INTO tranlog (
                event_id, tenant_id, store_code, terminal_no, transaction_no,
                receipt_no, business_date, original_transaction_no, body
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(&log.event_id)
        .bind(log.tenant_id.as_str())
        .bind(log.store_code.as_str())
        .bind(log.terminal_no.0)
        .bind(log.transaction_no)
        .bind(log.receipt_no)
        .bind(log.business_date.to_compact())
        .bind(log.original_transaction_no)
        .bind(body)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO tranlog_status (transaction_no, status)
            VALUES ($1, 'completed')
            ON CONFLICT (transaction_no) DO NOTHING
            ",
        )
        .bind(log.transaction_no)
        .execute(&mut *tx)
        .await?;

        for destination in TRANLOG_DESTINATIONS {
            sqlx::query(
                r"
                INSERT INTO status_tranlog_delivery (event_id, destination, status)
                VALUES ($1, $2, 'pending')
                ON CONFLICT (event_id, destination) DO NOTHING
                ",
            )
            .bind(&log.event_id)
            .bind(*destination)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Fetches the lifecycle status row for a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TranlogStoreError::NotFound`] if no row exists.
    pub async fn status_for(&self, transaction_no: i64) -> Result<TransactionStatusRecord, TranlogStoreError> {
        let row: Option<(i64, String, Option<DateTime<Utc>>, Option<DateTime<Utc>>)> = sqlx::query_as(
            r"SELECT transaction_no, status, voided_at, refunded_at FROM tranlog_status WHERE transaction_no = $1",
        )
        .bind(transaction_no)
        .fetch_optional(&self.pool)
        .await?;

        let Some((transaction_no, status, voided_at, refunded_at)) = row else {
            return Err(TranlogStoreError::NotFound(transaction_no));
        };

        let status = match status.as_str() {
            "voided" => TransactionLifecycle::Voided,
            "returned" => TransactionLifecycle::Returned,
            _ => TransactionLifecycle::Completed,
        };

        Ok(TransactionStatusRecord {
            transaction_no,
            status,
            voided_at,
            refunded_at,
        })
    }

    /// Persists a status transition produced by [`TransactionStatusRecord`].
    ///
    /// # Errors
    ///
    /// Returns [`TranlogStoreError::Database`] on failure.
    pub async fn save_status(&self, record: &TransactionStatusRecord) -> Result<(), TranlogStoreError> {
        let status = match record.status {
            TransactionLifecycle::Completed => "completed",
            TransactionLifecycle::Voided => "voided",
            TransactionLifecycle::Returned => "returned",
        };

        sqlx::query(
            r"
            INSERT INTO tranlog_status (transaction_no, status, voided_at, refunded_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (transaction_no)
            DO UPDATE SET status = EXCLUDED.status, voided_at = EXCLUDED.voided_at, refunded_at = EXCLUDED.refunded_at
            ",
        )
        .bind(record.transaction_no)
        .bind(status)
        .bind(record.voided_at)
        .bind(record.refunded_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
