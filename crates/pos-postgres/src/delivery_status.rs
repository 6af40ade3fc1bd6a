//! Per-destination delivery status tracking.
//!
//! Every tranlog / terminal-log event fans out to a fixed set of
//! downstream destinations (report, stock, journal, ...). This repository
//! tracks each destination's delivery status independently so the
//! delivery tracker's republish sweep can retry only the destinations
//! that are still pending or failed, not the ones already delivered.

use chrono::{DateTime, Utc};
use pos_domain::enums::ServiceStatus;
use sqlx::PgPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryStatusError {
    #[error("database error: {0}")]
    Database(String),
}

/// One row: the delivery status of a single event against a single
/// destination service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryStatusRow {
    pub event_id: String,
    pub destination: String,
    pub status: ServiceStatus,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub last_attempted_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

fn status_to_str(status: ServiceStatus) -> &'static str {
    match status {
        ServiceStatus::Pending => "pending",
        ServiceStatus::Delivered => "delivered",
        ServiceStatus::Failed => "failed",
    }
}

fn status_from_str(raw: &str) -> ServiceStatus {
    match raw {
        "delivered" => ServiceStatus::Delivered,
        "failed" => ServiceStatus::Failed,
        _ => ServiceStatus::Pending,
    }
}

type RowTuple = (
    String,
    String,
    String,
    i32,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
);

fn row_tuple_to_row(row: RowTuple) -> DeliveryStatusRow {
    let (event_id, destination, status, attempts, created_at, last_attempted_at, delivered_at) = row;
    DeliveryStatusRow {
        event_id,
        destination,
        status: status_from_str(&status),
        attempts,
        created_at,
        last_attempted_at,
        delivered_at,
    }
}

/// Repository over the `status_tranlog_delivery` / `status_terminallog_delivery`
/// tables. Both share the same shape, so one repository serves both by
/// table name.
pub struct DeliveryStatusRepository {
    pool: PgPool,
    table: &'static str,
}

impl DeliveryStatusRepository {
    /// Tracks delivery of tranlog events to their downstream destinations.
    #[must_use]
    pub const fn for_tranlog(pool: PgPool) -> Self {
        Self {
            pool,
            table: "status_tranlog_delivery",
        }
    }

    /// Tracks delivery of terminal-log events to their downstream destinations.
    #[must_use]
    pub const fn for_terminal_log(pool: PgPool) -> Self {
        Self {
            pool,
            table: "status_terminallog_delivery",
        }
    }

    /// # Errors
    ///
    /// Returns `DeliveryStatusError::Database` if any statement fails.
    pub async fn migrate(&self) -> Result<(), DeliveryStatusError> {
        let table = self.table;
        let query = format!(
            r"
            CREATE TABLE IF NOT EXISTS {table} (
                event_id TEXT NOT NULL,
                destination TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                attempts INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                last_attempted_at TIMESTAMPTZ,
                delivered_at TIMESTAMPTZ,
                PRIMARY KEY (event_id, destination)
            )
            "
        );

        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| DeliveryStatusError::Database(e.to_string()))?;

        Ok(())
    }

    /// Registers a fresh pending row for each destination an event fans
    /// out to. Idempotent: re-registering an already-tracked destination
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryStatusError::Database` on failure.
    pub async fn register(&self, event_id: &str, destinations: &[&str]) -> Result<(), DeliveryStatusError> {
        let table = self.table;
        for destination in destinations {
            let query = format!(
                r"
                INSERT INTO {table} (event_id, destination, status)
                VALUES ($1, $2, 'pending')
                ON CONFLICT (event_id, destination) DO NOTHING
                "
            );

            sqlx::query(&query)
                .bind(event_id)
                .bind(destination)
                .execute(&self.pool)
                .await
                .map_err(|e| DeliveryStatusError::Database(e.to_string()))?;
        }

        Ok(())
    }

    /// Marks an event delivered to a destination.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryStatusError::Database` on failure.
    pub async fn mark_delivered(&self, event_id: &str, destination: &str) -> Result<(), DeliveryStatusError> {
        let table = self.table;
        let query = format!(
            r"
            UPDATE {table}
            SET status = 'delivered', delivered_at = NOW()
            WHERE event_id = $1 AND destination = $2
            "
        );

        sqlx::query(&query)
            .bind(event_id)
            .bind(destination)
            .execute(&self.pool)
            .await
            .map_err(|e| DeliveryStatusError::Database(e.to_string()))?;

        Ok(())
    }

    /// Marks a delivery attempt failed, incrementing `attempts`. The row
    /// stays eligible for the republish sweep: a failed destination is
    /// still retried, it is not quarantined by this call alone.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryStatusError::Database` on failure.
    pub async fn mark_failed(&self, event_id: &str, destination: &str) -> Result<(), DeliveryStatusError> {
        let table = self.table;
        let query = format!(
            r"
            UPDATE {table}
            SET status = 'failed', attempts = attempts + 1, last_attempted_at = NOW()
            WHERE event_id = $1 AND destination = $2
            "
        );

        sqlx::query(&query)
            .bind(event_id)
            .bind(destination)
            .execute(&self.pool)
            .await
            .map_err(|e| DeliveryStatusError::Database(e.to_string()))?;

        Ok(())
    }

    /// Lists rows that are still pending or failed, for the republish
    /// sweep. Ordered oldest-attempted-first so a stuck destination
    /// doesn't starve newer ones.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryStatusError::Database` on failure.
    pub async fn list_outstanding(&self, limit: i64) -> Result<Vec<DeliveryStatusRow>, DeliveryStatusError> {
        let table = self.table;
        let query = format!(
            r"
            SELECT event_id, destination, status, attempts, created_at, last_attempted_at, delivered_at
            FROM {table}
            WHERE status IN ('pending', 'failed')
            ORDER BY last_attempted_at ASC NULLS FIRST
            LIMIT $1
            "
        );

        let rows: Vec<RowTuple> = sqlx::query_as(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DeliveryStatusError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(row_tuple_to_row).collect())
    }

    /// Overall status for an event: `Delivered` if every destination has
    /// delivered, `Failed` if any destination is failed and none pending,
    /// `Pending` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryStatusError::Database` on failure.
    pub async fn overall_status(&self, event_id: &str) -> Result<Option<ServiceStatus>, DeliveryStatusError> {
        let table = self.table;
        let query = format!(r"SELECT status FROM {table} WHERE event_id = $1");

        let rows: Vec<(String,)> = sqlx::query_as(&query)
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DeliveryStatusError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Ok(None);
        }

        let statuses: Vec<ServiceStatus> = rows.into_iter().map(|(s,)| status_from_str(&s)).collect();

        if statuses.iter().all(|s| *s == ServiceStatus::Delivered) {
            return Ok(Some(ServiceStatus::Delivered));
        }

        if statuses.iter().any(|s| *s == ServiceStatus::Pending) {
            return Ok(Some(ServiceStatus::Pending));
        }

        Ok(Some(ServiceStatus::Failed))
    }

    /// All per-destination rows for an event, including already-delivered
    /// ones. Used by callers that need the finer-grained
    /// published/partially-delivered/delivered/failed distinction the
    /// 3-state `overall_status` collapses.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryStatusError::Database` on failure.
    pub async fn rows_for_event(&self, event_id: &str) -> Result<Vec<DeliveryStatusRow>, DeliveryStatusError> {
        let table = self.table;
        let query = format!(
            r"
            SELECT event_id, destination, status, attempts, created_at, last_attempted_at, delivered_at
            FROM {table}
            WHERE event_id = $1
            "
        );

        let rows: Vec<RowTuple> = sqlx::query_as(&query)
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DeliveryStatusError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(row_tuple_to_row).collect())
    }

    /// Rows not yet fully delivered whose `created_at` is older than
    /// `created_before` — the republish sweep's candidate set (spec's
    /// "created_at within the check interval, skip; too fresh otherwise").
    ///
    /// # Errors
    ///
    /// Returns `DeliveryStatusError::Database` on failure.
    pub async fn list_stale_outstanding(
        &self,
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DeliveryStatusRow>, DeliveryStatusError> {
        let table = self.table;
        let query = format!(
            r"
            SELECT event_id, destination, status, attempts, created_at, last_attempted_at, delivered_at
            FROM {table}
            WHERE status IN ('pending', 'failed')
              AND created_at < $1
            ORDER BY created_at ASC
            LIMIT $2
            "
        );

        let rows: Vec<RowTuple> = sqlx::query_as(&query)
            .bind(created_before)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DeliveryStatusError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(row_tuple_to_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [ServiceStatus::Pending, ServiceStatus::Delivered, ServiceStatus::Failed] {
            assert_eq!(status_from_str(status_to_str(status)), status);
        }
    }
}
