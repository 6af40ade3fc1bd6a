//! Minimal receipt/journal text rendering (spec §4.5 step "invoke the
//! receipt-data plugin"). Produces the two plain-text strings a
//! `CashInOutLog`/`OpenCloseLog` carries; actually driving a physical
//! printer is explicitly out of scope (spec Non-goals).
//!
//! Grounded in the original's `CashInOutReceiptData`/`OpenCloseReceiptData`
//! plugins, which render a fixed-width line format — reproduced here as
//! plain formatted strings rather than a pluggable renderer, since no
//! second format is in scope.

use crate::model::{CashInOutLog, OpenCloseOperation, OpenCloseLog, Terminal};
use pos_domain::money::Amount;

const WIDTH: usize = 32;

fn rule() -> String {
    "-".repeat(WIDTH)
}

fn amount_str(amount: Amount) -> String {
    format!("{:.2}", amount.value() as f64 / 100.0)
}

/// Renders `(receipt_text, journal_text)` for a cash in/out movement.
/// The receipt is a customer-facing slip; the journal line is the same
/// content condensed to one row for the internal audit log.
#[must_use]
pub fn cash_in_out(terminal: &Terminal, description: &str, amount: Amount) -> (String, String) {
    let label = if amount.is_negative() { "CASH OUT" } else { "CASH IN" };
    let receipt = format!(
        "{header}\n{rule}\n{description}\n{amount}\n{rule}",
        header = label,
        rule = rule(),
        description = description,
        amount = amount_str(amount),
    );
    let journal = format!(
        "{label} {terminal} {description} {amount}",
        terminal = terminal.terminal_no,
        amount = amount_str(amount),
    );
    (receipt, journal)
}

/// Renders `(receipt_text, journal_text)` for an open/close session
/// boundary log.
#[must_use]
pub fn open_close(log: &OpenCloseLog) -> (String, String) {
    let label = match log.operation {
        OpenCloseOperation::Open => "TERMINAL OPEN",
        OpenCloseOperation::Close => "TERMINAL CLOSE",
    };
    let mut lines = vec![label.to_string(), rule(), format!("business_date {}", log.business_date)];
    if log.operation == OpenCloseOperation::Close {
        lines.push(format!("transactions {}", log.cart_transaction_count));
        lines.push(format!("cash movements {}", log.cash_in_out_count));
        if let Some(physical) = log.terminal_snapshot.physical_amount {
            lines.push(format!("physical amount {}", amount_str(physical)));
        }
    }
    lines.push(rule());
    let receipt = lines.join("\n");
    let journal = format!("{label} {terminal}", terminal = log.terminal_no);
    (receipt, journal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pos_domain::business_date::BusinessDate;
    use pos_domain::ids::{StoreCode, TenantId, TerminalNo};

    fn terminal() -> Terminal {
        Terminal::new(
            TenantId::new("t1"),
            StoreCode::new("s1"),
            TerminalNo(1),
            "front".to_string(),
            BusinessDate::from_ymd(2026, 1, 1).expect("valid date"),
            "key".to_string(),
        )
    }

    #[test]
    fn cash_in_out_labels_negative_amount_as_cash_out() {
        let (receipt, journal) = cash_in_out(&terminal(), "till adjustment", Amount::new(-500));
        assert!(receipt.starts_with("CASH OUT"));
        assert!(journal.contains("CASH OUT"));
        assert!(journal.contains("-5.00"));
    }

    #[test]
    fn cash_in_out_labels_positive_amount_as_cash_in() {
        let (receipt, _) = cash_in_out(&terminal(), "initial float", Amount::new(10000));
        assert!(receipt.starts_with("CASH IN"));
        assert!(receipt.contains("100.00"));
    }
}
