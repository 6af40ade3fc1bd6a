//! Terminal registry entry and the two log types it produces: cash
//! in/out movements and open/close session boundaries (spec §4.5, data
//! model §3).

use chrono::{DateTime, Utc};
use pos_domain::business_date::BusinessDate;
use pos_domain::enums::{FunctionMode, TerminalStatus};
use pos_domain::ids::{StaffRef, StoreCode, TenantId, TerminalNo};
use pos_domain::money::Amount;
use serde::{Deserialize, Serialize};

/// A registered terminal: `(tenant_id, store_code, terminal_no)` plus its
/// current session state. Kept in Postgres, one row per terminal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Terminal {
    pub tenant_id: TenantId,
    pub store_code: StoreCode,
    pub terminal_no: TerminalNo,
    pub description: String,
    pub status: TerminalStatus,
    pub function_mode: FunctionMode,
    pub business_date: BusinessDate,
    pub open_counter: i32,
    pub business_counter: i32,
    pub initial_amount: Option<Amount>,
    pub physical_amount: Option<Amount>,
    pub staff: Option<StaffRef>,
    pub api_key: String,
}

impl Terminal {
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        store_code: StoreCode,
        terminal_no: TerminalNo,
        description: String,
        business_date: BusinessDate,
        api_key: String,
    ) -> Self {
        Self {
            tenant_id,
            store_code,
            terminal_no,
            description,
            status: TerminalStatus::Idle,
            function_mode: FunctionMode::Closed,
            business_date,
            open_counter: 0,
            business_counter: 0,
            initial_amount: None,
            physical_amount: None,
            staff: None,
            api_key,
        }
    }

    /// A copy safe to embed in a published log: the api key is never sent
    /// off this service, mirroring the original's `"****-****-****-****"`
    /// redaction before embedding terminal info on an `OpenCloseLog`.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            api_key: "****-****-****-****".to_string(),
            ..self.clone()
        }
    }
}

/// One cash movement on an opened terminal. Positive `amount` is cash in,
/// negative is cash out; the initial float recorded at `open` time is also
/// represented as one of these, with `description = "Initial amount"`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CashInOutLog {
    pub event_id: String,
    pub tenant_id: TenantId,
    pub store_code: StoreCode,
    pub terminal_no: TerminalNo,
    pub staff: Option<StaffRef>,
    pub business_date: BusinessDate,
    pub open_counter: i32,
    pub business_counter: i32,
    pub amount: Amount,
    pub description: String,
    pub receipt_text: String,
    pub journal_text: String,
    pub created_at: DateTime<Utc>,
}

impl pos_core::event::Event for CashInOutLog {
    fn event_type(&self) -> &'static str {
        "CashInOut.v1"
    }
}

/// Which boundary of a session an [`OpenCloseLog`] records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenCloseOperation {
    Open,
    Close,
}

/// Session boundary log: written once when a terminal opens, and again
/// when it closes. The close variant embeds the reconciliation snapshot
/// the report service's gate later compares against (spec §4.7).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpenCloseLog {
    pub event_id: String,
    pub tenant_id: TenantId,
    pub store_code: StoreCode,
    pub terminal_no: TerminalNo,
    pub staff: Option<StaffRef>,
    pub business_date: BusinessDate,
    pub open_counter: i32,
    pub business_counter: i32,
    pub operation: OpenCloseOperation,
    pub terminal_snapshot: Terminal,
    /// `close` only: count of `CashInOutLog` rows in this session.
    pub cash_in_out_count: i64,
    /// `close` only: timestamp of the most recent `CashInOutLog` in this session.
    pub cash_in_out_last_at: Option<DateTime<Utc>>,
    /// `close` only: count of tranlogs in this session.
    pub cart_transaction_count: i64,
    /// `close` only: transaction_no of the most recent tranlog in this session.
    pub cart_transaction_last_no: Option<i64>,
    pub receipt_text: String,
    pub journal_text: String,
    pub created_at: DateTime<Utc>,
}

impl pos_core::event::Event for OpenCloseLog {
    fn event_type(&self) -> &'static str {
        "OpenCloseLog.v1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_hides_api_key_but_keeps_other_fields() {
        let terminal = Terminal::new(
            TenantId::new("t1"),
            StoreCode::new("s1"),
            TerminalNo(1),
            "front".to_string(),
            BusinessDate::from_ymd(2026, 1, 1).expect("valid date"),
            "secret-key".to_string(),
        );

        let redacted = terminal.redacted();

        assert_eq!(redacted.api_key, "****-****-****-****");
        assert_eq!(redacted.description, "front");
    }
}
