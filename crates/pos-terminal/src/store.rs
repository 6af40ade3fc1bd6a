//! Terminal row storage plus the two log tables this service produces.
//! Each log write lands in the same database transaction as its
//! delivery-status fan-out rows (spec §4.5), the same "commit then
//! publish" shape `pos_cart::store::TranlogRepository` uses.

use crate::model::{CashInOutLog, OpenCloseLog, OpenCloseOperation, Terminal};
use pos_domain::business_date::BusinessDate;
use pos_domain::enums::{FunctionMode, TerminalStatus};
use pos_domain::ids::{StaffId, StaffRef, StoreCode, TenantId, TerminalNo};
use pos_domain::money::Amount;
use sqlx::PgPool;
use thiserror::Error;

/// Destinations every terminal log fans out to (spec §4.5: report + journal).
pub const TERMINAL_LOG_DESTINATIONS: &[&str] = &["report", "journal"];

#[derive(Debug, Error)]
pub enum TerminalStoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("terminal not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for TerminalStoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

fn function_mode_str(mode: FunctionMode) -> &'static str {
    match mode {
        FunctionMode::Sales => "sales",
        FunctionMode::Returns => "returns",
        FunctionMode::Void => "void",
        FunctionMode::CashInOut => "cash_in_out",
        FunctionMode::Reports => "reports",
        FunctionMode::Closed => "closed",
    }
}

fn parse_function_mode(value: &str) -> FunctionMode {
    match value {
        "sales" => FunctionMode::Sales,
        "returns" => FunctionMode::Returns,
        "void" => FunctionMode::Void,
        "cash_in_out" => FunctionMode::CashInOut,
        "reports" => FunctionMode::Reports,
        _ => FunctionMode::Closed,
    }
}

fn status_str(status: TerminalStatus) -> &'static str {
    match status {
        TerminalStatus::Idle => "idle",
        TerminalStatus::Opened => "opened",
        TerminalStatus::Closed => "closed",
    }
}

fn parse_status(value: &str) -> TerminalStatus {
    match value {
        "opened" => TerminalStatus::Opened,
        "closed" => TerminalStatus::Closed,
        _ => TerminalStatus::Idle,
    }
}

/// Repository over the `terminal` table: the registry row each cash/open/
/// close operation reads and replaces.
pub struct TerminalRepository {
    pool: PgPool,
}

impl TerminalRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns [`TerminalStoreError::Database`] if any statement fails.
    pub async fn migrate(&self) -> Result<(), TerminalStoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS terminal (
                tenant_id TEXT NOT NULL,
                store_code TEXT NOT NULL,
                terminal_no INTEGER NOT NULL,
                description TEXT NOT NULL,
                status TEXT NOT NULL,
                function_mode TEXT NOT NULL,
                business_date TEXT NOT NULL,
                open_counter INTEGER NOT NULL DEFAULT 0,
                business_counter INTEGER NOT NULL DEFAULT 0,
                initial_amount BIGINT,
                physical_amount BIGINT,
                staff_id TEXT,
                staff_name TEXT,
                api_key TEXT NOT NULL,
                PRIMARY KEY (tenant_id, store_code, terminal_no)
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`TerminalStoreError::Database`] on failure.
    pub async fn insert(&self, terminal: &Terminal) -> Result<(), TerminalStoreError> {
        sqlx::query(
            r"
            INSERT INTO terminal (
                tenant_id, store_code, terminal_no, description, status, function_mode,
                business_date, open_counter, business_counter, initial_amount, physical_amount,
                staff_id, staff_name, api_key
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14)
            ",
        )
        .bind(terminal.tenant_id.as_str())
        .bind(terminal.store_code.as_str())
        .bind(terminal.terminal_no.0)
        .bind(&terminal.description)
        .bind(status_str(terminal.status))
        .bind(function_mode_str(terminal.function_mode))
        .bind(terminal.business_date.to_compact())
        .bind(terminal.open_counter)
        .bind(terminal.business_counter)
        .bind(terminal.initial_amount.map(Amount::value))
        .bind(terminal.physical_amount.map(Amount::value))
        .bind(terminal.staff.as_ref().map(|s| s.id.as_str().to_owned()))
        .bind(terminal.staff.as_ref().map(|s| s.name.clone()))
        .bind(&terminal.api_key)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`TerminalStoreError::NotFound`] if no row matches.
    pub async fn get(&self, tenant_id: &TenantId, store_code: &StoreCode, terminal_no: TerminalNo) -> Result<Terminal, TerminalStoreError> {
        #[allow(clippy::type_complexity)]
        let row: Option<(String, String, String, String, String, String, i32, i32, Option<i64>, Option<i64>, Option<String>, Option<String>, String)> = sqlx::query_as(
            r"
            SELECT description, status, function_mode, business_date, tenant_id, store_code,
                   open_counter, business_counter, initial_amount, physical_amount,
                   staff_id, staff_name, api_key
            FROM terminal
            WHERE tenant_id = $1 AND store_code = $2 AND terminal_no = $3
            ",
        )
        .bind(tenant_id.as_str())
        .bind(store_code.as_str())
        .bind(terminal_no.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some((
            description,
            status,
            function_mode,
            business_date,
            tenant_id_raw,
            store_code_raw,
            open_counter,
            business_counter,
            initial_amount,
            physical_amount,
            staff_id,
            staff_name,
            api_key,
        )) = row
        else {
            return Err(TerminalStoreError::NotFound(format!("{tenant_id}-{store_code}-{terminal_no}")));
        };

        Ok(Terminal {
            tenant_id: TenantId::new(tenant_id_raw),
            store_code: StoreCode::new(store_code_raw),
            terminal_no,
            description,
            status: parse_status(&status),
            function_mode: parse_function_mode(&function_mode),
            business_date: BusinessDate::parse_compact(&business_date).unwrap_or_else(|| BusinessDate::new(chrono::Utc::now().date_naive())),
            open_counter,
            business_counter,
            initial_amount: initial_amount.map(Amount::new),
            physical_amount: physical_amount.map(Amount::new),
            staff: staff_id.map(|id| StaffRef { id: StaffId::new(id), name: staff_name.unwrap_or_default() }),
            api_key,
        })
    }

    /// Overwrites every mutable field of the row. Terminals are small and
    /// single-writer per request, so a full replace (mirroring the
    /// original's `replace_terminal_info_async`) is simpler than tracking
    /// per-field diffs.
    ///
    /// # Errors
    ///
    /// Returns [`TerminalStoreError::Database`] on failure.
    pub async fn replace(&self, terminal: &Terminal) -> Result<(), TerminalStoreError> {
        sqlx::query(
            r"
            UPDATE terminal SET
                description = $4, status = $5, function_mode = $6, business_date = $7,
                open_counter = $8, business_counter = $9, initial_amount = $10,
                physical_amount = $11, staff_id = $12, staff_name = $13
            WHERE tenant_id = $1 AND store_code = $2 AND terminal_no = $3
            ",
        )
        .bind(terminal.tenant_id.as_str())
        .bind(terminal.store_code.as_str())
        .bind(terminal.terminal_no.0)
        .bind(&terminal.description)
        .bind(status_str(terminal.status))
        .bind(function_mode_str(terminal.function_mode))
        .bind(terminal.business_date.to_compact())
        .bind(terminal.open_counter)
        .bind(terminal.business_counter)
        .bind(terminal.initial_amount.map(Amount::value))
        .bind(terminal.physical_amount.map(Amount::value))
        .bind(terminal.staff.as_ref().map(|s| s.id.as_str().to_owned()))
        .bind(terminal.staff.as_ref().map(|s| s.name.clone()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Snapshot of a session's activity at close time (spec §4.5 Close step).
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionSnapshot {
    pub cash_in_out_count: i64,
    pub cash_in_out_last_at: Option<chrono::DateTime<chrono::Utc>>,
    pub cart_transaction_count: i64,
    pub cart_transaction_last_no: Option<i64>,
}

/// Repository over `cash_in_out_log` and `open_close_log`, plus the
/// `status_terminallog_delivery` fan-out rows those writes register.
pub struct TerminalLogRepository {
    pool: PgPool,
}

impl TerminalLogRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns [`TerminalStoreError::Database`] if any statement fails.
    pub async fn migrate(&self) -> Result<(), TerminalStoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS cash_in_out_log (
                event_id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                store_code TEXT NOT NULL,
                terminal_no INTEGER NOT NULL,
                business_date TEXT NOT NULL,
                open_counter INTEGER NOT NULL,
                amount BIGINT NOT NULL,
                description TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS open_close_log (
                event_id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                store_code TEXT NOT NULL,
                terminal_no INTEGER NOT NULL,
                business_date TEXT NOT NULL,
                open_counter INTEGER NOT NULL,
                operation TEXT NOT NULL,
                body JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS status_terminallog_delivery (
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

    /// Writes a `CashInOutLog` plus its delivery-status fan-out rows in
    /// one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TerminalStoreError::Database`] if any statement fails.
    pub async fn insert_cash_in_out(&self, log: &CashInOutLog) -> Result<(), TerminalStoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO cash_in_out_log (event_id, tenant_id, store_code, terminal_no, business_date, open_counter, amount, description)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            ",
        )
        .bind(&log.event_id)
        .bind(log.tenant_id.as_str())
        .bind(log.store_code.as_str())
        .bind(log.terminal_no.0)
        .bind(log.business_date.to_compact())
        .bind(log.open_counter)
        .bind(log.amount.value())
        .bind(&log.description)
        .execute(&mut *tx)
        .await?;

        register_delivery_rows(&mut tx, &log.event_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Writes an `OpenCloseLog` plus its delivery-status fan-out rows in
    /// one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TerminalStoreError::Database`] if any statement fails.
    pub async fn insert_open_close(&self, log: &OpenCloseLog) -> Result<(), TerminalStoreError> {
        let mut tx = self.pool.begin().await?;

        let operation = match log.operation {
            OpenCloseOperation::Open => "open",
            OpenCloseOperation::Close => "close",
        };
        let body = serde_json::to_value(log).map_err(|e| TerminalStoreError::Database(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO open_close_log (event_id, tenant_id, store_code, terminal_no, business_date, open_counter, operation, body)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            ",
        )
        .bind(&log.event_id)
        .bind(log.tenant_id.as_str())
        .bind(log.store_code.as_str())
        .bind(log.terminal_no.0)
        .bind(log.business_date.to_compact())
        .bind(log.open_counter)
        .bind(operation)
        .bind(body)
        .execute(&mut *tx)
        .await?;

        register_delivery_rows(&mut tx, &log.event_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// The snapshot a `close` operation embeds: counts and most recent
    /// timestamps for this session's cash movements, plus the same for
    /// tranlogs written by `pos_cart` against the shared `tranlog` table
    /// (spec §4.5 Close step's cross-service read).
    ///
    /// # Errors
    ///
    /// Returns [`TerminalStoreError::Database`] on failure.
    pub async fn session_snapshot(
        &self,
        tenant_id: &TenantId,
        store_code: &StoreCode,
        terminal_no: TerminalNo,
        business_date: BusinessDate,
        open_counter: i32,
    ) -> Result<SessionSnapshot, TerminalStoreError> {
        let cash_row: (i64, Option<chrono::DateTime<chrono::Utc>>) = sqlx::query_as(
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

        Ok(SessionSnapshot {
            cash_in_out_count: cash_row.0,
            cash_in_out_last_at: cash_row.1,
            cart_transaction_count: tran_row.0,
            cart_transaction_last_no: tran_row.1,
        })
    }
}

async fn register_delivery_rows(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, event_id: &str) -> Result<(), TerminalStoreError> {
    for destination in TERMINAL_LOG_DESTINATIONS {
        sqlx::query(
            r"
            INSERT INTO status_terminallog_delivery (event_id, destination, status)
            VALUES ($1, $2, 'pending')
            ON CONFLICT (event_id, destination) DO NOTHING
            ",
        )
        .bind(event_id)
        .bind(*destination)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
