//! Postgres-backed projection storage: a generic key/value table any
//! projection can use to persist its materialized state (spec §4.8's stock
//! "state store", reusable by any future consumer without a schema of its
//! own).

use pos_core::projection::{ProjectionError, ProjectionStore};
use sqlx::PgPool;

/// Backs [`ProjectionStore`] with a single shared `projection_store` table,
/// keyed by an opaque string the caller namespaces itself (e.g.
/// `"stock:{event_id}"`).
pub struct PgProjectionStore {
    pool: PgPool,
}

impl PgProjectionStore {
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
            CREATE TABLE IF NOT EXISTS projection_store (
                key TEXT PRIMARY KEY,
                data BYTEA NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ProjectionError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl ProjectionStore for PgProjectionStore {
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), ProjectionError> {
        sqlx::query(
            r"
            INSERT INTO projection_store (key, data, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            ",
        )
        .bind(key)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(|e| ProjectionError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ProjectionError> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as("SELECT data FROM projection_store WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ProjectionError::Storage(e.to_string()))?;
        Ok(row.map(|(data,)| data))
    }

    async fn delete(&self, key: &str) -> Result<(), ProjectionError> {
        sqlx::query("DELETE FROM projection_store WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| ProjectionError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_constructs_without_a_connection() {
        // Real behavior (insert/upsert/delete) needs a live database and is
        // exercised by the services that embed this crate.
        assert_eq!(std::mem::size_of::<PgProjectionStore>() > 0, true);
    }
}
