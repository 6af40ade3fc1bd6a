//! Report documents: the sales report and its sub-buckets, and the daily
//! reconciliation record the gate writes (spec §3.1, §4.7).

use chrono::{DateTime, Utc};
use pos_domain::business_date::BusinessDate;
use pos_domain::ids::{PaymentCode, StoreCode, TaxCode, TenantId, TerminalNo};
use pos_domain::money::Amount;
use serde::{Deserialize, Serialize};

/// Whether a report is a point-in-time snapshot or the end-of-day summary
/// the reconciliation gate protects.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportScope {
    /// Bypasses the reconciliation gate entirely.
    Flash,
    Daily,
}

/// Which report plugin to run. Only `Sales` is fully implemented; the
/// others are named in the original as other plugins of the same
/// aggregator and are accepted but rejected with
/// [`crate::service::ReportServiceError::UnsupportedReportType`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Sales,
    Payment,
    Item,
    Category,
}

/// Identifies one report request: a tenant/store, optionally narrowed to
/// one terminal, over one business date or date range.
#[derive(Clone, Debug)]
pub struct ReportKey {
    pub tenant_id: TenantId,
    pub store_code: StoreCode,
    pub terminal_no: Option<TerminalNo>,
    pub business_date_from: BusinessDate,
    pub business_date_to: BusinessDate,
}

impl ReportKey {
    #[must_use]
    pub fn single_day(tenant_id: TenantId, store_code: StoreCode, terminal_no: Option<TerminalNo>, business_date: BusinessDate) -> Self {
        Self { tenant_id, store_code, terminal_no, business_date_from: business_date, business_date_to: business_date }
    }
}

/// Amount/count/quantity triple used for both line-item and subtotal
/// discount buckets.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DiscountBucket {
    pub amount: Amount,
    pub count: u32,
    pub quantity: u32,
}

/// Per-`tax_code` aggregated totals.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TaxBucket {
    pub tax_code: TaxCode,
    pub tax_amount: Amount,
    pub target_amount: Amount,
    pub target_quantity: u32,
}

/// Per-`payment_code` aggregated totals.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PaymentBucket {
    pub payment_code: PaymentCode,
    pub amount: Amount,
    pub count: u32,
}

/// Reconciles aggregated cash payments and cash movements against the
/// terminal's physical count (spec §4.7's `cash` field).
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CashBlock {
    /// Cash payments collected plus net cash in/out movements.
    pub logical_amount: Amount,
    /// The terminal's counted float at close; `None` for a flash report or
    /// a session still open.
    pub physical_amount: Option<Amount>,
    /// `physical_amount - logical_amount`; `None` if there's no physical count yet.
    pub difference: Option<Amount>,
    pub cash_in: Amount,
    pub cash_out: Amount,
}

/// The sales report document (spec §4.7).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SalesReport {
    pub tenant_id: TenantId,
    pub store_code: StoreCode,
    pub terminal_no: Option<TerminalNo>,
    pub business_date_from: BusinessDate,
    pub business_date_to: BusinessDate,
    pub scope: ReportScope,
    pub transaction_count: u32,
    /// Pre-discount gross: normal sales minus void sales, before any discount.
    pub sales_gross: Amount,
    /// Post-discount, post-every-tax net across all transaction types,
    /// signed by each type's report factor.
    pub sales_net: Amount,
    /// Return sales minus voided returns.
    pub returns: Amount,
    pub discount_for_lineitems: DiscountBucket,
    pub discount_for_subtotal: DiscountBucket,
    pub taxes: Vec<TaxBucket>,
    pub payments: Vec<PaymentBucket>,
    pub cash: CashBlock,
    pub generated_at: DateTime<Utc>,
}

impl pos_core::event::Event for SalesReport {
    fn event_type(&self) -> &'static str {
        "SalesReport.v1"
    }
}

/// The reconciliation record the gate writes, one per `(tenant, store,
/// terminal, business_date)` key (spec §4.7). Once `verified` is `true`,
/// subsequent daily-report requests for the same key skip the gate.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DailyInfo {
    pub tenant_id: TenantId,
    pub store_code: StoreCode,
    pub terminal_no: TerminalNo,
    pub business_date: BusinessDate,
    pub verified: bool,
    pub message: String,
    pub checked_at: DateTime<Utc>,
}
