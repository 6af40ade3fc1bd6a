//! The daily reconciliation gate (spec §4.7): before a `daily` report
//! generates anything, the session's close log must exist and its embedded
//! activity counts must match what's independently recomputed from
//! `cash_in_out_log` and `tranlog`. A passing result is cached in
//! `daily_info` so repeat requests for the same session skip the recheck.

use chrono::Utc;
use pos_domain::business_date::BusinessDate;
use pos_domain::ids::{StoreCode, TenantId, TerminalNo};
use thiserror::Error;

use crate::model::DailyInfo;
use crate::store::{ReportRepository, ReportStoreError};

#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Store(#[from] ReportStoreError),
    #[error("session for terminal {terminal_no} on {business_date} has not been closed")]
    NotClosed { terminal_no: TerminalNo, business_date: BusinessDate },
    #[error("terminal {terminal_no} on {business_date} failed reconciliation: {message}")]
    Mismatch { terminal_no: TerminalNo, business_date: BusinessDate, message: String },
}

/// Runs the gate for one terminal's session, using the cached
/// [`DailyInfo`] row if a prior check already passed.
///
/// # Errors
///
/// Returns [`GateError::NotClosed`] if no close log exists yet,
/// [`GateError::Mismatch`] if the recomputed counts disagree with the
/// close log's embedded snapshot, or [`GateError::Store`] on a database
/// failure.
pub async fn check_terminal(
    store: &ReportRepository,
    tenant_id: &TenantId,
    store_code: &StoreCode,
    terminal_no: TerminalNo,
    business_date: BusinessDate,
) -> Result<(), GateError> {
    if let Some(cached) = store.get_daily_info(tenant_id, store_code, terminal_no, business_date).await? {
        if cached.verified {
            return Ok(());
        }
    }

    let Some(close_log) = store.latest_close_log(tenant_id, store_code, terminal_no, business_date).await? else {
        return Err(GateError::NotClosed { terminal_no, business_date });
    };

    let recomputed = store
        .recompute_session_counts(tenant_id, store_code, terminal_no, business_date, close_log.open_counter)
        .await?;

    let mismatch = recomputed.cash_in_out_count != close_log.cash_in_out_count
        || recomputed.cash_in_out_last_at != close_log.cash_in_out_last_at
        || recomputed.cart_transaction_count != close_log.cart_transaction_count
        || recomputed.cart_transaction_last_no != close_log.cart_transaction_last_no;

    let (verified, message) = if mismatch {
        (
            false,
            format!(
                "recomputed counts (cash_in_out={}, last_tranno={:?}) disagree with close snapshot (cash_in_out={}, last_tranno={:?})",
                recomputed.cash_in_out_count, recomputed.cart_transaction_last_no, close_log.cash_in_out_count, close_log.cart_transaction_last_no
            ),
        )
    } else {
        (true, "reconciled".to_string())
    };

    store
        .save_daily_info(&DailyInfo { tenant_id: tenant_id.clone(), store_code: store_code.clone(), terminal_no, business_date, verified, message: message.clone(), checked_at: Utc::now() })
        .await?;

    if verified {
        Ok(())
    } else {
        Err(GateError::Mismatch { terminal_no, business_date, message })
    }
}

/// Runs the gate across every terminal registered for a store. All must
/// pass for a store-wide daily report.
///
/// # Errors
///
/// Returns the first [`GateError`] encountered.
pub async fn check_store(store: &ReportRepository, tenant_id: &TenantId, store_code: &StoreCode, business_date: BusinessDate) -> Result<(), GateError> {
    for terminal_no in store.list_terminal_nos(tenant_id, store_code).await? {
        check_terminal(store, tenant_id, store_code, terminal_no, business_date).await?;
    }
    Ok(())
}
