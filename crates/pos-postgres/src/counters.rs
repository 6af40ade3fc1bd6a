//! Per-terminal counters: transaction numbers and receipt numbers.
//!
//! Both counters are allocated with a single atomic
//! `UPDATE ... RETURNING`, the only serialization point the tranlog
//! ingestion path needs (spec: "atomic increment... only lock needed").
//! Receipt numbers wrap at a configured bound and resume from the
//! configured start value rather than growing unbounded.

use chrono::{DateTime, Utc};
use pos_domain::ids::{StoreCode, TenantId, TerminalNo};
use sqlx::PgPool;
use thiserror::Error;

/// Which counter sequence to allocate from. A terminal keeps one row per
/// `CounterType` in `counter_terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterType {
    TransactionNo,
    ReceiptNo,
}

impl CounterType {
    const fn column(self) -> &'static str {
        match self {
            Self::TransactionNo => "transaction_no",
            Self::ReceiptNo => "receipt_no",
        }
    }
}

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("database error: {0}")]
    Database(String),
    #[error("counter row missing for tenant={tenant_id} store={store_code} terminal={terminal_no:?}")]
    RowMissing {
        tenant_id: String,
        store_code: String,
        terminal_no: TerminalNo,
    },
}

/// Repository over the `counter_terminal` table.
pub struct CounterRepository {
    pool: PgPool,
    /// Receipt numbers wrap back to this value once `receipt_no_end` is passed.
    receipt_no_start: i64,
    /// Last receipt number issued before wrapping back to `receipt_no_start`.
    receipt_no_end: i64,
}

impl CounterRepository {
    #[must_use]
    pub const fn new(pool: PgPool, receipt_no_start: i64, receipt_no_end: i64) -> Self {
        Self {
            pool,
            receipt_no_start,
            receipt_no_end,
        }
    }

    /// # Errors
    ///
    /// Returns `CounterError::Database` if any statement fails.
    pub async fn migrate(&self) -> Result<(), CounterError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS counter_terminal (
                tenant_id TEXT NOT NULL,
                store_code TEXT NOT NULL,
                terminal_no INTEGER NOT NULL,
                transaction_no BIGINT NOT NULL DEFAULT 0,
                receipt_no BIGINT NOT NULL DEFAULT 0,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (tenant_id, store_code, terminal_no)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CounterError::Database(e.to_string()))?;

        Ok(())
    }

    /// Ensures a counter row exists for the given terminal, inserting zeroed
    /// counters if absent. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `CounterError::Database` if the insert fails.
    pub async fn ensure_row(
        &self,
        tenant_id: &TenantId,
        store_code: &StoreCode,
        terminal_no: TerminalNo,
    ) -> Result<(), CounterError> {
        sqlx::query(
            r"
            INSERT INTO counter_terminal (tenant_id, store_code, terminal_no, transaction_no, receipt_no)
            VALUES ($1, $2, $3, 0, $4)
            ON CONFLICT (tenant_id, store_code, terminal_no) DO NOTHING
            ",
        )
        .bind(tenant_id.as_str())
        .bind(store_code.as_str())
        .bind(terminal_no.0)
        .bind(self.receipt_no_start)
        .execute(&self.pool)
        .await
        .map_err(|e| CounterError::Database(e.to_string()))?;

        Ok(())
    }

    /// Atomically allocates the next transaction number for a terminal.
    ///
    /// # Errors
    ///
    /// Returns `CounterError::RowMissing` if the terminal has no counter
    /// row (call `ensure_row` first), or `CounterError::Database` on
    /// failure.
    pub async fn next_transaction_no(
        &self,
        tenant_id: &TenantId,
        store_code: &StoreCode,
        terminal_no: TerminalNo,
    ) -> Result<i64, CounterError> {
        self.increment(tenant_id, store_code, terminal_no, CounterType::TransactionNo)
            .await
    }

    /// Atomically allocates the next receipt number, wrapping back to
    /// `receipt_no_start` once `receipt_no_end` has been issued.
    ///
    /// # Errors
    ///
    /// Returns `CounterError::RowMissing` if the terminal has no counter
    /// row, or `CounterError::Database` on failure.
    pub async fn next_receipt_no(
        &self,
        tenant_id: &TenantId,
        store_code: &StoreCode,
        terminal_no: TerminalNo,
    ) -> Result<i64, CounterError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r"
            UPDATE counter_terminal
            SET receipt_no = CASE
                    WHEN receipt_no >= $4 THEN $5
                    ELSE receipt_no + 1
                END,
                updated_at = NOW()
            WHERE tenant_id = $1 AND store_code = $2 AND terminal_no = $3
            RETURNING receipt_no
            ",
        )
        .bind(tenant_id.as_str())
        .bind(store_code.as_str())
        .bind(terminal_no.0)
        .bind(self.receipt_no_end)
        .bind(self.receipt_no_start)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CounterError::Database(e.to_string()))?;

        row.map(|(value,)| value).ok_or_else(|| CounterError::RowMissing {
            tenant_id: tenant_id.as_str().to_owned(),
            store_code: store_code.as_str().to_owned(),
            terminal_no,
        })
    }

    async fn increment(
        &self,
        tenant_id: &TenantId,
        store_code: &StoreCode,
        terminal_no: TerminalNo,
        counter: CounterType,
    ) -> Result<i64, CounterError> {
        let column = counter.column();
        let query = format!(
            r"
            UPDATE counter_terminal
            SET {column} = {column} + 1, updated_at = NOW()
            WHERE tenant_id = $1 AND store_code = $2 AND terminal_no = $3
            RETURNING {column}
            "
        );

        let row: Option<(i64,)> = sqlx::query_as(&query)
            .bind(tenant_id.as_str())
            .bind(store_code.as_str())
            .bind(terminal_no.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CounterError::Database(e.to_string()))?;

        row.map(|(value,)| value).ok_or_else(|| CounterError::RowMissing {
            tenant_id: tenant_id.as_str().to_owned(),
            store_code: store_code.as_str().to_owned(),
            terminal_no,
        })
    }

    /// Current counter snapshot, for reconciliation / diagnostics. Does not
    /// allocate.
    ///
    /// # Errors
    ///
    /// Returns `CounterError::Database` on failure.
    pub async fn snapshot(
        &self,
        tenant_id: &TenantId,
        store_code: &StoreCode,
        terminal_no: TerminalNo,
    ) -> Result<Option<CounterSnapshot>, CounterError> {
        let row: Option<(i64, i64, DateTime<Utc>)> = sqlx::query_as(
            r"
            SELECT transaction_no, receipt_no, updated_at
            FROM counter_terminal
            WHERE tenant_id = $1 AND store_code = $2 AND terminal_no = $3
            ",
        )
        .bind(tenant_id.as_str())
        .bind(store_code.as_str())
        .bind(terminal_no.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CounterError::Database(e.to_string()))?;

        Ok(row.map(|(transaction_no, receipt_no, updated_at)| CounterSnapshot {
            transaction_no,
            receipt_no,
            updated_at,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub transaction_no: i64,
    pub receipt_no: i64,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_type_maps_to_expected_column() {
        assert_eq!(CounterType::TransactionNo.column(), "transaction_no");
        assert_eq!(CounterType::ReceiptNo.column(), "receipt_no");
    }
}
