//! The transaction log: an immutable record of a billed, voided or
//! returned cart, plus the separate mutable status document that tracks
//! whether it has since been voided or refunded (spec §3.1, §4.4).

use crate::model::{LineItem, Payment, Sales, Tax};
use chrono::{DateTime, Utc};
use pos_domain::business_date::BusinessDate;
use pos_domain::enums::{TransactionStatus as TransactionLifecycle, TransactionType};
use pos_domain::ids::{CartId, StaffRef, StoreCode, TenantId, TerminalNo};
use serde::{Deserialize, Serialize};

impl pos_core::event::Event for TransactionLog {
    fn event_type(&self) -> &'static str {
        "TransactionFinalised.v1"
    }
}

/// An immutable record of one completed transaction. Once written, a
/// tranlog is never mutated; void and return create new tranlog rows that
/// reference this one's `transaction_no`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionLog {
    pub event_id: String,
    pub tenant_id: TenantId,
    pub store_code: StoreCode,
    pub terminal_no: TerminalNo,
    pub transaction_no: i64,
    pub receipt_no: i64,
    pub business_date: BusinessDate,
    pub transaction_type: TransactionType,
    pub cart_id: CartId,
    pub staff: Option<StaffRef>,
    pub line_items: Vec<LineItem>,
    pub payments: Vec<Payment>,
    pub taxes: Vec<Tax>,
    pub sales: Sales,
    pub invoice_registration_number: Option<String>,
    pub receipt_headers: Vec<String>,
    pub receipt_footers: Vec<String>,
    /// References the original transaction's `transaction_no` for
    /// `VoidSales`/`ReturnSales`/`VoidReturn` rows; `None` for `NormalSales`.
    pub original_transaction_no: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// The separate, mutable lifecycle status of a transaction: whether it has
/// since been voided or refunded. Kept apart from the immutable
/// [`TransactionLog`] row so a void/return never rewrites sales history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionStatusRecord {
    pub transaction_no: i64,
    pub status: TransactionLifecycle,
    pub voided_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl TransactionStatusRecord {
    #[must_use]
    pub fn completed(transaction_no: i64) -> Self {
        Self {
            transaction_no,
            status: TransactionLifecycle::Completed,
            voided_at: None,
            refunded_at: None,
        }
    }

    #[must_use]
    pub fn is_voided(&self) -> bool {
        self.status == TransactionLifecycle::Voided
    }

    #[must_use]
    pub fn is_refunded(&self) -> bool {
        self.status == TransactionLifecycle::Returned
    }

    pub fn mark_voided(&mut self, at: DateTime<Utc>) {
        self.status = TransactionLifecycle::Voided;
        self.voided_at = Some(at);
    }

    pub fn mark_refunded(&mut self, at: DateTime<Utc>) {
        self.status = TransactionLifecycle::Returned;
        self.refunded_at = Some(at);
    }

    /// Resets a `VoidReturn`'s status row back to `Voided`: a voided return
    /// is no longer "refunded" once it's been voided, it's simply reversed.
    pub fn reset_refund_status(&mut self, at: DateTime<Utc>) {
        self.refunded_at = None;
        self.mark_voided(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_status_is_completed_and_not_voided_or_refunded() {
        let status = TransactionStatusRecord::completed(1);
        assert!(!status.is_voided());
        assert!(!status.is_refunded());
    }

    #[test]
    fn reset_refund_status_clears_refund_and_marks_voided() {
        let mut status = TransactionStatusRecord::completed(1);
        status.mark_refunded(Utc::now());
        assert!(status.is_refunded());
        status.reset_refund_status(Utc::now());
        assert!(status.is_voided());
        assert!(!status.is_refunded());
    }

    /// Models the two status rows a `VoidReturn` touches: `S1` (the
    /// original sale, returned) and `R1` (the return being voided). Voiding
    /// `R1` must mark `R1` itself voided and also clear `S1`'s refund flag,
    /// since the return that refunded `S1` no longer stands.
    #[test]
    fn voiding_a_return_marks_both_the_return_and_the_original_sale() {
        let mut sale_status = TransactionStatusRecord::completed(1);
        sale_status.mark_refunded(Utc::now());
        assert!(sale_status.is_refunded());

        let mut return_status = TransactionStatusRecord::completed(2);
        return_status.mark_voided(Utc::now());
        assert!(return_status.is_voided());

        sale_status.reset_refund_status(Utc::now());
        assert!(!sale_status.is_refunded());
    }
}
