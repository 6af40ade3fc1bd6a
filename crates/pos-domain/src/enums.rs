//! Status and classification enums shared across the transactional core.

use serde::{Deserialize, Serialize};

/// Cart state machine states.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    Initial,
    Idle,
    EnteringItem,
    Paying,
    Completed,
    Cancelled,
}

impl CartStatus {
    /// Whether the cart can still accept mutating events.
    #[must_use]
    pub fn is_open(self) -> bool {
        !matches!(self, CartStatus::Completed | CartStatus::Cancelled)
    }
}

/// Function mode a terminal is currently operating in. Mirrors the
/// `FunctionMode` gate that determines which cart operations a terminal
/// may perform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionMode {
    Sales,
    Returns,
    Void,
    CashInOut,
    Reports,
    Closed,
}

/// Terminal lifecycle status.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Idle,
    Opened,
    Closed,
}

/// Transaction classification, used to select the sign applied when
/// aggregating sales reports.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    NormalSales,
    ReturnSales,
    VoidSales,
    VoidReturn,
}

impl TransactionType {
    /// Sign applied to this transaction's amounts when folding into a sales
    /// report total. `NormalSales`/`VoidReturn` add, `ReturnSales`/`VoidSales`
    /// subtract.
    #[must_use]
    pub fn report_sign(self) -> i64 {
        match self {
            TransactionType::NormalSales | TransactionType::VoidReturn => 1,
            TransactionType::ReturnSales | TransactionType::VoidSales => -1,
        }
    }

    /// Whether this transaction represents a return of goods (used by the
    /// report's `returns` bucket, distinct from the signed total).
    #[must_use]
    pub fn is_return(self) -> bool {
        matches!(self, TransactionType::ReturnSales | TransactionType::VoidReturn)
    }
}

/// Current lifecycle status of a transaction, independent of its type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Voided,
    Returned,
}

/// How a tax rate is applied to the amount it is computed against.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxType {
    /// Tax is already included in the priced amount; extracting it divides
    /// by `1 + rate`.
    Internal,
    /// Tax is added on top of the priced amount.
    External,
    /// No tax applies.
    Exempt,
}

/// Whether a discount is a fixed amount or a percentage of its target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Amount,
    Percent,
}

/// Level a discount is applied at: a single cart line, or the cart subtotal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountScope {
    LineItem,
    Subtotal,
}

/// Aggregate delivery status across every subscribed destination for one
/// event. `Delivered` requires every destination to individually report
/// `Delivered`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOverallStatus {
    Pending,
    Published,
    PartiallyDelivered,
    Delivered,
    Failed,
}

/// Per-destination delivery status tracked by the delivery tracker.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Pending,
    Delivered,
    Failed,
}

/// Direction a stock update moves inventory, derived from the originating
/// transaction type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockUpdateType {
    Decrement,
    Increment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_status_open_excludes_terminal_states() {
        assert!(CartStatus::EnteringItem.is_open());
        assert!(!CartStatus::Completed.is_open());
        assert!(!CartStatus::Cancelled.is_open());
    }

    #[test]
    fn transaction_type_report_sign_matches_spec() {
        assert_eq!(TransactionType::NormalSales.report_sign(), 1);
        assert_eq!(TransactionType::VoidReturn.report_sign(), 1);
        assert_eq!(TransactionType::ReturnSales.report_sign(), -1);
        assert_eq!(TransactionType::VoidSales.report_sign(), -1);
    }

    #[test]
    fn transaction_type_is_return_matches_returns_and_void_return() {
        assert!(TransactionType::ReturnSales.is_return());
        assert!(TransactionType::VoidReturn.is_return());
        assert!(!TransactionType::NormalSales.is_return());
        assert!(!TransactionType::VoidSales.is_return());
    }
}
