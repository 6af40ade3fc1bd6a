//! `PostgreSQL` event store implementation.
//!
//! Backs every event-sourced aggregate (cart, terminal session) with two
//! tables: an append-only `events` table keyed by `(stream_id, version)`,
//! and an `snapshots` table holding the latest serialized aggregate state
//! per stream.

use pos_core::event::SerializedEvent;
use pos_core::event_store::{EventStore, EventStoreError};
use pos_core::stream::{StreamId, Version};
use sqlx::{PgPool, Row};
use std::future::Future;
use std::pin::Pin;

/// Production `EventStore` backed by a Postgres connection pool.
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the schema migrations this store depends on. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `EventStoreError::DatabaseError` if any statement fails.
    pub async fn migrate(&self) -> Result<(), EventStoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS events (
                stream_id TEXT NOT NULL,
                version BIGINT NOT NULL,
                event_type TEXT NOT NULL,
                data BYTEA NOT NULL,
                metadata JSONB,
                recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (stream_id, version)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS snapshots (
                stream_id TEXT PRIMARY KEY,
                version BIGINT NOT NULL,
                state BYTEA NOT NULL,
                recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

impl EventStore for PostgresEventStore {
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<Version, EventStoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

            let current_version: Option<i64> =
                sqlx::query_scalar("SELECT MAX(version) FROM events WHERE stream_id = $1")
                    .bind(stream_id.as_str())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

            let current_version = current_version.map_or(Version::INITIAL, |v| {
                #[allow(clippy::cast_sign_loss)]
                Version::new(v as u64)
            });

            if let Some(expected) = expected_version {
                if expected != current_version {
                    return Err(EventStoreError::ConcurrencyConflict {
                        stream_id,
                        expected,
                        actual: current_version,
                    });
                }
            }

            let mut version = current_version;
            for event in events {
                version = version.next();
                #[allow(clippy::cast_possible_wrap)]
                let version_i64 = version.value() as i64;

                sqlx::query(
                    r"
                    INSERT INTO events (stream_id, version, event_type, data, metadata)
                    VALUES ($1, $2, $3, $4, $5)
                    ",
                )
                .bind(stream_id.as_str())
                .bind(version_i64)
                .bind(&event.event_type)
                .bind(&event.data)
                .bind(&event.metadata)
                .execute(&mut *tx)
                .await
                .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;
            }

            tx.commit()
                .await
                .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

            Ok(version)
        })
    }

    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SerializedEvent>, EventStoreError>> + Send + '_>> {
        Box::pin(async move {
            #[allow(clippy::cast_possible_wrap)]
            let from: i64 = from_version.map_or(0, |v| v.value() as i64);

            let rows = sqlx::query(
                r"
                SELECT event_type, data, metadata
                FROM events
                WHERE stream_id = $1 AND version >= $2
                ORDER BY version ASC
                ",
            )
            .bind(stream_id.as_str())
            .bind(from)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

            Ok(rows
                .into_iter()
                .map(|row| SerializedEvent {
                    event_type: row.get("event_type"),
                    data: row.get("data"),
                    metadata: row.get("metadata"),
                })
                .collect())
        })
    }

    fn save_snapshot(
        &self,
        stream_id: StreamId,
        version: Version,
        state: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventStoreError>> + Send + '_>> {
        Box::pin(async move {
            #[allow(clippy::cast_possible_wrap)]
            let version_i64 = version.value() as i64;

            sqlx::query(
                r"
                INSERT INTO snapshots (stream_id, version, state)
                VALUES ($1, $2, $3)
                ON CONFLICT (stream_id)
                DO UPDATE SET version = EXCLUDED.version, state = EXCLUDED.state, recorded_at = NOW()
                ",
            )
            .bind(stream_id.as_str())
            .bind(version_i64)
            .bind(&state)
            .execute(&self.pool)
            .await
            .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

            Ok(())
        })
    }

    fn load_snapshot(
        &self,
        stream_id: StreamId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<(Version, Vec<u8>)>, EventStoreError>> + Send + '_>> {
        Box::pin(async move {
            let row = sqlx::query("SELECT version, state FROM snapshots WHERE stream_id = $1")
                .bind(stream_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

            Ok(row.map(|row| {
                let version_i64: i64 = row.get("version");
                #[allow(clippy::cast_sign_loss)]
                let version = Version::new(version_i64 as u64);
                let state: Vec<u8> = row.get("state");
                (version, state)
            }))
        })
    }
}
