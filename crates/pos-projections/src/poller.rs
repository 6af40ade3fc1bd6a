//! Generic poller that advances a [`Projection`] by reading new rows
//! appended to the shared `tranlog` table (spec §4.8's tranlog consumer).
//!
//! This workspace's projections catch up by polling a monotonic `seq`
//! column rather than subscribing through `pos-redpanda`, mirroring how
//! `pos-delivery`'s republish sweep advances on an interval instead of a
//! push.

use pos_core::projection::{EventPosition, Projection, ProjectionCheckpoint, ProjectionError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::checkpoint::PgProjectionCheckpoint;

#[derive(Debug, Error)]
pub enum PollerError {
    #[error("database error: {0}")]
    Database(String),
    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),
}

/// Polls the shared `tranlog` table for rows newer than the projection's
/// saved checkpoint and feeds them to a [`Projection`] one at a time.
pub struct TranlogPoller<P: Projection> {
    pool: sqlx::PgPool,
    projection: Arc<P>,
    checkpoint: Arc<PgProjectionCheckpoint>,
    batch_size: i64,
}

impl<P> TranlogPoller<P>
where
    P: Projection + 'static,
{
    #[must_use]
    pub fn new(pool: sqlx::PgPool, projection: Arc<P>, checkpoint: Arc<PgProjectionCheckpoint>, batch_size: i64) -> Self {
        Self { pool, projection, checkpoint, batch_size }
    }

    /// Adds the `seq` column and its index to the shared `tranlog` table if
    /// absent. Idempotent; safe to call from every consumer's startup path,
    /// whichever one happens to run first.
    ///
    /// # Errors
    ///
    /// Returns `PollerError::Database` if either statement fails.
    pub async fn migrate(&self) -> Result<(), PollerError> {
        sqlx::query("ALTER TABLE tranlog ADD COLUMN IF NOT EXISTS seq BIGSERIAL")
            .execute(&self.pool)
            .await
            .map_err(|e| PollerError::Database(e.to_string()))?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tranlog_seq ON tranlog (seq)")
            .execute(&self.pool)
            .await
            .map_err(|e| PollerError::Database(e.to_string()))?;
        Ok(())
    }

    /// Polls once: reads up to `batch_size` rows past the saved checkpoint,
    /// applies each to the projection in order, and advances the checkpoint
    /// after every row so a crash mid-batch only reprocesses the row it was
    /// on, not the whole batch.
    ///
    /// # Errors
    ///
    /// Returns `PollerError` if the query, a row's deserialization, the
    /// projection apply, or the checkpoint save fails.
    pub async fn run_once(&self) -> Result<usize, PollerError> {
        let position = self.checkpoint.load_position(self.projection.name()).await?.unwrap_or_else(EventPosition::beginning);

        let rows: Vec<(i64, Value)> = sqlx::query_as(
            r"
            SELECT seq, body FROM tranlog
            WHERE seq > $1
            ORDER BY seq
            LIMIT $2
            ",
        )
        .bind(i64::try_from(position.offset).unwrap_or(i64::MAX))
        .bind(self.batch_size)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PollerError::Database(e.to_string()))?;

        let mut applied = 0usize;
        for (seq, body) in rows {
            let event = deserialize_event::<P::Event>(&body)?;
            self.projection.apply_event(&event).await?;
            let next = EventPosition::new(seq.max(0) as u64, chrono::Utc::now());
            self.checkpoint.save_position(self.projection.name(), next).await?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Spawns a background task that calls [`Self::run_once`] on `interval`,
    /// mirroring `DeliveryTracker::spawn_sweep`'s periodic-poll pattern.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(err) = self.run_once().await {
                    tracing::error!(error = %err, projection = self.projection.name(), "projection poll failed");
                }
            }
        })
    }
}

/// Deserializes one `tranlog.body` JSONB payload into a projection's event
/// type. Kept standalone so it's unit-testable without a database.
///
/// # Errors
///
/// Returns `PollerError::Projection` if `body` doesn't match `E`.
pub fn deserialize_event<E: for<'de> serde::Deserialize<'de>>(body: &Value) -> Result<E, PollerError> {
    serde_json::from_value(body.clone()).map_err(|e| PollerError::Projection(ProjectionError::Serialization(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        id: String,
        amount: i64,
    }

    #[test]
    fn deserialize_event_parses_matching_shape() {
        let body = serde_json::json!({"id": "t-1", "amount": 500});
        let sample: Sample = deserialize_event(&body).expect("matching shape parses");
        assert_eq!(sample, Sample { id: "t-1".to_string(), amount: 500 });
    }

    #[test]
    fn deserialize_event_rejects_mismatched_shape() {
        let body = serde_json::json!({"id": "t-1"});
        let result: Result<Sample, PollerError> = deserialize_event(&body);
        assert!(result.is_err());
    }
}
