//! Postgres-backed projection checkpoint, tracking how far each consumer has
//! advanced through the shared `tranlog` table so a restart resumes instead
//! of reprocessing everything (spec §4.8, §9 "no cyclic graphs": progress is
//! owned by the consumer, not by the log).

use chrono::{DateTime, Utc};
use pos_core::projection::{EventPosition, ProjectionCheckpoint, ProjectionError};
use sqlx::PgPool;
use std::future::Future;
use std::pin::Pin;

/// One row per projection name in `projection_checkpoint`.
pub struct PgProjectionCheckpoint {
    pool: PgPool,
}

impl PgProjectionCheckpoint {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if table creation fails.
    pub async fn migrate(&self) -> Result<(), ProjectionError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS projection_checkpoint (
                projection_name TEXT PRIMARY KEY,
                offset_value BIGINT NOT NULL,
                ts TIMESTAMPTZ NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ProjectionError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl ProjectionCheckpoint for PgProjectionCheckpoint {
    fn save_position(
        &self,
        projection_name: &str,
        position: EventPosition,
    ) -> Pin<Box<dyn Future<Output = Result<(), ProjectionError>> + Send + '_>> {
        let projection_name = projection_name.to_owned();
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO projection_checkpoint (projection_name, offset_value, ts)
                VALUES ($1, $2, $3)
                ON CONFLICT (projection_name) DO UPDATE SET offset_value = EXCLUDED.offset_value, ts = EXCLUDED.ts
                ",
            )
            .bind(&projection_name)
            .bind(i64::try_from(position.offset).unwrap_or(i64::MAX))
            .bind(position.timestamp)
            .execute(&self.pool)
            .await
            .map_err(|e| ProjectionError::Checkpoint(e.to_string()))?;
            Ok(())
        })
    }

    fn load_position(
        &self,
        projection_name: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<EventPosition>, ProjectionError>> + Send + '_>> {
        let projection_name = projection_name.to_owned();
        Box::pin(async move {
            let row: Option<(i64, DateTime<Utc>)> =
                sqlx::query_as(r"SELECT offset_value, ts FROM projection_checkpoint WHERE projection_name = $1")
                    .bind(&projection_name)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| ProjectionError::Checkpoint(e.to_string()))?;
            Ok(row.map(|(offset, ts)| EventPosition::new(offset.max(0) as u64, ts)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_position_beginning_starts_at_zero() {
        assert_eq!(EventPosition::beginning().offset, 0);
    }
}
