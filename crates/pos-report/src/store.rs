//! Read-only queries over the shared `tranlog`, `cash_in_out_log` and
//! `open_close_log` tables (owned by `pos_cart`/`pos_terminal`), plus
//! `pos-report`'s own `daily_info` table the reconciliation gate writes
//! (spec §4.7).

use chrono::{DateTime, Utc};
use pos_cart::tranlog::TransactionLog;
use pos_domain::business_date::BusinessDate;
use pos_domain::ids::{StoreCode, TenantId, TerminalNo};
use pos_terminal::model::OpenCloseLog;
use sqlx::PgPool;
use thiserror::Error;

use crate::model::DailyInfo;

#[derive(Debug, Error)]
pub enum ReportStoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("deserialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for ReportStoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// The independently recomputed session counts the gate compares against a
/// close log's embedded snapshot. Mirrors
/// `pos_terminal::store::TerminalLogRepository::session_snapshot`'s two
/// queries exactly, run read-only from this service.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionCounts {
    pub cash_in_out_count: i64,
    pub cash_in_out_last_at: Option<DateTime<Utc>>,
    pub cart_transaction_count: i64,
    pub cart_transaction_last_no: Option<i64>,
}

pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates only `daily_info`; `tranlog`, `cash_in_out_log` and
    /// `open_close_log` belong to `pos_cart`/`pos_terminal`'s own
    /// migrations and must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`ReportStoreError::Database`] if the statement fails.
    pub async fn migrate(&self) -> Result<(), ReportStoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS daily_info (
                tenant_id TEXT NOT NULL,
                store_code TEXT NOT NULL,
                terminal_no INTEGER NOT NULL,
                business_date TEXT NOT NULL,
                verified BOOLEAN NOT NULL,
                message TEXT NOT NULL,
                checked_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (tenant_id, store_code, terminal_no, business_date)
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetches every tranlog row in `[business_date_from, business_date_to]`
    /// for a tenant/store, optionally narrowed to one terminal.
    ///
    /// # Errors
    ///
    /// Returns [`ReportStoreError::Database`] on a query failure or
    /// [`ReportStoreError::Serialization`] if a stored body doesn't
    /// deserialize as a [`TransactionLog`].
    pub async fn fetch_tranlogs(
        &self,
        tenant_id: &TenantId,
        store_code: &StoreCode,
        terminal_no: Option<TerminalNo>,
        business_date_from: BusinessDate,
        business_date_to: BusinessDate,
    ) -> Result<Vec<TransactionLog>, ReportStoreError> {
        let rows: Vec<(serde_json::Value,)> = if let Some(terminal_no) = terminal_no {
            sqlx::query_as(
                r"
                SELECT body FROM tranlog
                WHERE tenant_id = $1 AND store_code = $2 AND terminal_no = $3
                  AND business_date BETWEEN $4 AND $5
                ",
            )
            .bind(tenant_id.as_str())
            .bind(store_code.as_str())
            .bind(terminal_no.0)
            .bind(business_date_from.to_compact())
            .bind(business_date_to.to_compact())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                r"
                SELECT body FROM tranlog
                WHERE tenant_id = $1 AND store_code = $2
                  AND business_date BETWEEN $3 AND $4
                ",
            )
            .bind(tenant_id.as_str())
            .bind(store_code.as_str())
            .bind(business_date_from.to_compact())
            .bind(business_date_to.to_compact())
            .fetch_all(&self.pool)
            .await?
        };

        rows.into_iter()
            .map(|(body,)| serde_json::from_value(body).map_err(|e| ReportStoreError::Serialization(e.to_string())))
            .collect()
    }

    /// Fetches the most recent `close` row for a session, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ReportStoreError::Database`] on a query failure or
    /// [`ReportStoreError::Serialization`] if the body doesn't deserialize.
    pub async fn latest_close_log(
        &self,
        tenant_id: &TenantId,
        store_code: &StoreCode,
        terminal_no: TerminalNo,
        business_date: BusinessDate,
    ) -> Result<Option<OpenCloseLog>, ReportStoreError> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as(
            r"
            SELECT body FROM open_close_log
            WHERE tenant_id = $1 AND store_code = $2 AND terminal_no = $3
              AND business_date = $4 AND operation = 'close'
            ORDER BY created_at DESC
            LIMIT 1
            ",
        )
        .bind(tenant_id.as_str())
        .bind(store_code.as_str())
        .bind(terminal_no.0)
        .bind(business_date.to_compact())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(body,)| serde_json::from_value(body).map_err(|e| ReportStoreError::Serialization(e.to_string()))).transpose()
    }

    /// Independently recomputes session activity counts, read-only, against
    /// `cash_in_out_log` and `tranlog` — the same two queries
    /// `pos_terminal::store::TerminalLogRepository::session_snapshot` runs
    /// from the terminal service at close time.
    ///
    /// # Errors
    ///
    /// Returns [`ReportStoreError::Database`] on a query failure.
    pub async fn recompute_session_counts(
        &self,
        tenant_id: &TenantId,
        store_code: &StoreCode,
        terminal_no: TerminalNo,
        business_date: BusinessDate,
        open_counter: i32,
    ) -> Result<SessionCounts, ReportStoreError> {
        let cash_row: (i64, Option<DateTime<Utc>>) = sqlx::query_as(
            r"
            SELECT COUNT(*), MAX(created_at)
            FROM cash_in_out_log
            WHERE tenant_id = $1 AND store_code = $2 AND terminal_no = $3 AND business_date = $4 AND open_counter = $5
            ",
        )
        .bind(tenant_id.as_str())
        .bind(store_code.as_str())
        .bind(terminal_no.0)
        .bind(business_date.to_compact())
        .bind(open_counter)
        .fetch_one(&self.pool)
        .await?;

        let tran_row: (i64, Option<i64>) = sqlx::query_as(
            r"
            SELECT COUNT(*), MAX(transaction_no)
            FROM tranlog
            WHERE tenant_id = $1 AND store_code = $2 AND terminal_no = $3 AND business_date = $4
            ",
        )
        .bind(tenant_id.as_str())
        .bind(store_code.as_str())
        .bind(terminal_no.0)
        .bind(business_date.to_compact())
        .fetch_one(&self.pool)
        .await?;

        Ok(SessionCounts {
            cash_in_out_count: cash_row.0,
            cash_in_out_last_at: cash_row.1,
            cart_transaction_count: tran_row.0,
            cart_transaction_last_no: tran_row.1,
        })
    }

    /// Sums cash-in and cash-out movements separately for the cash
    /// reconciliation block: a positive `amount` is cash in, negative is
    /// cash out (mirrors the sign convention `pos_terminal::receipt`
    /// renders cash-in-out receipts with).
    ///
    /// # Errors
    ///
    /// Returns [`ReportStoreError::Database`] on a query failure.
    pub async fn sum_cash_movements(
        &self,
        tenant_id: &TenantId,
        store_code: &StoreCode,
        terminal_no: TerminalNo,
        business_date_from: BusinessDate,
        business_date_to: BusinessDate,
    ) -> Result<(pos_domain::money::Amount, pos_domain::money::Amount), ReportStoreError> {
        let row: (Option<i64>, Option<i64>) = sqlx::query_as(
            r"
            SELECT
                COALESCE(SUM(amount) FILTER (WHERE amount > 0), 0),
                COALESCE(SUM(amount) FILTER (WHERE amount < 0), 0)
            FROM cash_in_out_log
            WHERE tenant_id = $1 AND store_code = $2 AND terminal_no = $3
              AND business_date BETWEEN $4 AND $5
            ",
        )
        .bind(tenant_id.as_str())
        .bind(store_code.as_str())
        .bind(terminal_no.0)
        .bind(business_date_from.to_compact())
        .bind(business_date_to.to_compact())
        .fetch_one(&self.pool)
        .await?;

        Ok((pos_domain::money::Amount::new(row.0.unwrap_or(0)), pos_domain::money::Amount::new(row.1.unwrap_or(0).abs())))
    }

    /// Lists every terminal number registered for a store, for a store-wide
    /// daily report's per-terminal gate fan-out.
    ///
    /// # Errors
    ///
    /// Returns [`ReportStoreError::Database`] on a query failure.
    pub async fn list_terminal_nos(&self, tenant_id: &TenantId, store_code: &StoreCode) -> Result<Vec<TerminalNo>, ReportStoreError> {
        let rows: Vec<(i32,)> =
            sqlx::query_as(r"SELECT terminal_no FROM terminal WHERE tenant_id = $1 AND store_code = $2 ORDER BY terminal_no")
                .bind(tenant_id.as_str())
                .bind(store_code.as_str())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(n,)| TerminalNo(n)).collect())
    }

    /// # Errors
    ///
    /// Returns [`ReportStoreError::Database`] on a query failure.
    pub async fn get_daily_info(
        &self,
        tenant_id: &TenantId,
        store_code: &StoreCode,
        terminal_no: TerminalNo,
        business_date: BusinessDate,
    ) -> Result<Option<DailyInfo>, ReportStoreError> {
        let row: Option<(bool, String, DateTime<Utc>)> = sqlx::query_as(
            r"
            SELECT verified, message, checked_at FROM daily_info
            WHERE tenant_id = $1 AND store_code = $2 AND terminal_no = $3 AND business_date = $4
            ",
        )
        .bind(tenant_id.as_str())
        .bind(store_code.as_str())
        .bind(terminal_no.0)
        .bind(business_date.to_compact())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(verified, message, checked_at)| DailyInfo {
            tenant_id: tenant_id.clone(),
            store_code: store_code.clone(),
            terminal_no,
            business_date,
            verified,
            message,
            checked_at,
        }))
    }

    /// # Errors
    ///
    /// Returns [`ReportStoreError::Database`] on a query failure.
    pub async fn save_daily_info(&self, info: &DailyInfo) -> Result<(), ReportStoreError> {
        sqlx::query(
            r"
            INSERT INTO daily_info (tenant_id, store_code, terminal_no, business_date, verified, message, checked_at)
            VALUES ($1,$2,$3,$4,$5,$6,$7)
            ON CONFLICT (tenant_id, store_code, terminal_no, business_date)
            DO UPDATE SET verified = EXCLUDED.verified, message = EXCLUDED.message, checked_at = EXCLUDED.checked_at
            ",
        )
        .bind(info.tenant_id.as_str())
        .bind(info.store_code.as_str())
        .bind(info.terminal_no.0)
        .bind(info.business_date.to_compact())
        .bind(info.verified)
        .bind(&info.message)
        .bind(info.checked_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
