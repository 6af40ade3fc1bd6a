//! Failed-publish queue for events the circuit breaker in `pos-delivery`
//! could not get onto the bus.
//!
//! Mirrors a dead-letter-queue pattern: when the circuit breaker trips open
//! and a publish attempt is abandoned rather than retried indefinitely, the
//! event lands here instead of being lost. Operators (or an automated
//! sweep) reprocess or discard entries from this queue.

use chrono::{DateTime, Utc};
use pos_core::event::SerializedEvent;
use pos_core::event_store::EventStoreError;
use sqlx::Row;
use sqlx::PgPool;

/// Status of an entry in the failed-publish queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedPublishStatus {
    /// Entry is pending investigation/reprocessing.
    Pending,
    /// Entry is currently being reprocessed.
    Processing,
    /// Entry was successfully republished.
    Resolved,
    /// Entry was permanently discarded (cannot be fixed).
    Discarded,
}

impl FailedPublishStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Resolved => "resolved",
            Self::Discarded => "discarded",
        }
    }

    /// # Errors
    ///
    /// Returns `EventStoreError::DatabaseError` if the string doesn't match
    /// a known status.
    pub fn parse(s: &str) -> Result<Self, EventStoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "resolved" => Ok(Self::Resolved),
            "discarded" => Ok(Self::Discarded),
            _ => Err(EventStoreError::DatabaseError(format!("invalid failed-publish status: {s}"))),
        }
    }
}

/// An entry in the failed-publish queue.
#[derive(Debug, Clone)]
pub struct FailedPublishEntry {
    pub id: i64,
    pub topic: String,
    pub event: SerializedEvent,
    pub original_timestamp: DateTime<Utc>,
    pub error_message: String,
    pub retry_count: i32,
    pub first_failed_at: DateTime<Utc>,
    pub last_failed_at: DateTime<Utc>,
    pub status: FailedPublishStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub resolution_notes: Option<String>,
}

/// `PostgreSQL`-backed failed-publish queue.
pub struct FailedPublishQueue {
    pool: PgPool,
}

impl FailedPublishQueue {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `EventStoreError::DatabaseError` if any statement fails.
    pub async fn migrate(&self) -> Result<(), EventStoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS failed_publish_queue (
                id BIGSERIAL PRIMARY KEY,
                topic TEXT NOT NULL,
                event_type TEXT NOT NULL,
                event_data BYTEA NOT NULL,
                metadata JSONB,
                original_timestamp TIMESTAMPTZ NOT NULL,
                error_message TEXT NOT NULL,
                retry_count INTEGER NOT NULL DEFAULT 0,
                first_failed_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                last_failed_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                status TEXT NOT NULL DEFAULT 'pending',
                resolved_at TIMESTAMPTZ,
                resolved_by TEXT,
                resolution_notes TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Adds a failed publish attempt to the queue.
    ///
    /// # Errors
    ///
    /// Returns `EventStoreError::DatabaseError` if the insert fails.
    pub async fn add_entry(
        &self,
        topic: &str,
        event: &SerializedEvent,
        original_timestamp: DateTime<Utc>,
        error_message: &str,
        retry_count: i32,
    ) -> Result<i64, EventStoreError> {
        let id: (i64,) = sqlx::query_as(
            r"
            INSERT INTO failed_publish_queue (
                topic, event_type, event_data, metadata,
                original_timestamp, error_message, retry_count
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            ",
        )
        .bind(topic)
        .bind(&event.event_type)
        .bind(&event.data)
        .bind(&event.metadata)
        .bind(original_timestamp)
        .bind(error_message)
        .bind(retry_count)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

        tracing::warn!(
            queue_id = id.0,
            topic = topic,
            event_type = %event.event_type,
            error = error_message,
            retry_count = retry_count,
            "event added to failed-publish queue"
        );

        metrics::counter!("delivery.failed_publish.added", "event_type" => event.event_type.clone()).increment(1);

        Ok(id.0)
    }

    /// Lists pending entries, oldest failure first.
    ///
    /// # Errors
    ///
    /// Returns `EventStoreError::DatabaseError` if the query fails.
    pub async fn list_pending(&self, limit: i64) -> Result<Vec<FailedPublishEntry>, EventStoreError> {
        self.list_by_status(FailedPublishStatus::Pending, limit).await
    }

    /// # Errors
    ///
    /// Returns `EventStoreError::DatabaseError` if the query fails.
    pub async fn list_by_status(
        &self,
        status: FailedPublishStatus,
        limit: i64,
    ) -> Result<Vec<FailedPublishEntry>, EventStoreError> {
        let rows = sqlx::query(
            r"
            SELECT
                id, topic, event_type, event_data, metadata,
                original_timestamp, error_message, retry_count,
                first_failed_at, last_failed_at, status,
                resolved_at, resolved_by, resolution_notes
            FROM failed_publish_queue
            WHERE status = $1
            ORDER BY first_failed_at ASC
            LIMIT $2
            ",
        )
        .bind(status.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    /// # Errors
    ///
    /// Returns `EventStoreError::DatabaseError` if the query fails.
    pub async fn get_by_id(&self, id: i64) -> Result<FailedPublishEntry, EventStoreError> {
        let row = sqlx::query(
            r"
            SELECT
                id, topic, event_type, event_data, metadata,
                original_timestamp, error_message, retry_count,
                first_failed_at, last_failed_at, status,
                resolved_at, resolved_by, resolution_notes
            FROM failed_publish_queue
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

        Self::row_to_entry(&row)
    }

    /// # Errors
    ///
    /// Returns `EventStoreError::DatabaseError` if the update fails.
    pub async fn update_status(&self, id: i64, status: FailedPublishStatus) -> Result<(), EventStoreError> {
        sqlx::query(
            r"
            UPDATE failed_publish_queue
            SET status = $1, last_failed_at = NOW()
            WHERE id = $2
            ",
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

        tracing::info!(queue_id = id, status = status.as_str(), "failed-publish entry status updated");

        Ok(())
    }

    /// Marks an entry resolved (the republish succeeded).
    ///
    /// # Errors
    ///
    /// Returns `EventStoreError::DatabaseError` if the update fails.
    pub async fn mark_resolved(&self, id: i64, resolved_by: &str, notes: Option<&str>) -> Result<(), EventStoreError> {
        sqlx::query(
            r"
            UPDATE failed_publish_queue
            SET status = 'resolved', resolved_at = NOW(), resolved_by = $1, resolution_notes = $2
            WHERE id = $3
            ",
        )
        .bind(resolved_by)
        .bind(notes)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

        tracing::info!(queue_id = id, resolved_by = resolved_by, "failed-publish entry resolved");

        metrics::counter!("delivery.failed_publish.resolved").increment(1);

        Ok(())
    }

    /// Marks an entry permanently discarded.
    ///
    /// # Errors
    ///
    /// Returns `EventStoreError::DatabaseError` if the update fails.
    pub async fn mark_discarded(&self, id: i64, reason: &str) -> Result<(), EventStoreError> {
        sqlx::query(
            r"
            UPDATE failed_publish_queue
            SET status = 'discarded', resolved_at = NOW(), resolution_notes = $1
            WHERE id = $2
            ",
        )
        .bind(reason)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

        tracing::warn!(queue_id = id, reason = reason, "failed-publish entry discarded");

        metrics::counter!("delivery.failed_publish.discarded").increment(1);

        Ok(())
    }

    /// # Errors
    ///
    /// Returns `EventStoreError::DatabaseError` if the query fails.
    pub async fn count_pending(&self) -> Result<i64, EventStoreError> {
        let (count,): (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*) FROM failed_publish_queue WHERE status = 'pending'
            ",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

        Ok(count)
    }

    fn row_to_entry(row: &sqlx::postgres::PgRow) -> Result<FailedPublishEntry, EventStoreError> {
        let status_str: String = row.get("status");
        let status = FailedPublishStatus::parse(&status_str)?;

        Ok(FailedPublishEntry {
            id: row.get("id"),
            topic: row.get("topic"),
            event: SerializedEvent {
                event_type: row.get("event_type"),
                data: row.get("event_data"),
                metadata: row.get("metadata"),
            },
            original_timestamp: row.get("original_timestamp"),
            error_message: row.get("error_message"),
            retry_count: row.get("retry_count"),
            first_failed_at: row.get("first_failed_at"),
            last_failed_at: row.get("last_failed_at"),
            status,
            resolved_at: row.get("resolved_at"),
            resolved_by: row.get("resolved_by"),
            resolution_notes: row.get("resolution_notes"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for status in [
            FailedPublishStatus::Pending,
            FailedPublishStatus::Processing,
            FailedPublishStatus::Resolved,
            FailedPublishStatus::Discarded,
        ] {
            let parsed = FailedPublishStatus::parse(status.as_str()).expect("valid status should parse");
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn invalid_status_rejected() {
        assert!(FailedPublishStatus::parse("invalid").is_err());
    }
}
