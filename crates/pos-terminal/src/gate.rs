//! Precondition checks gating each terminal operation, ported from the
//! original's `__check_terminal_status`/per-method guard clauses into one
//! place per operation rather than scattered inline checks.

use crate::model::Terminal;
use pos_domain::enums::TerminalStatus;
use pos_domain::error::{DomainError, ErrorKind};

fn signed_in(terminal: &Terminal, operation: &str) -> Result<(), DomainError> {
    if terminal.staff.is_none() {
        return Err(DomainError::new(
            ErrorKind::TerminalNotSignedIn,
            operation,
            format!("terminal {} is not signed in", terminal.terminal_no),
        ));
    }
    Ok(())
}

/// Sign-in requires no staff currently signed in.
///
/// # Errors
///
/// Returns [`ErrorKind::TerminalStatusError`] if a staff member is already signed in.
pub fn check_sign_in(terminal: &Terminal) -> Result<(), DomainError> {
    if terminal.staff.is_some() {
        return Err(DomainError::new(
            ErrorKind::TerminalStatusError,
            "sign_in",
            format!("terminal {} is already signed in", terminal.terminal_no),
        ));
    }
    Ok(())
}

/// Open requires the terminal not already opened. Being signed in is not
/// required to open per the original (opening is how a fresh business day
/// begins before anyone has necessarily signed in yet), matching spec
/// §4.5's "precondition: Idle or Closed, signed-in" — both are checked
/// here, signed-in first so the more specific message wins.
///
/// # Errors
///
/// Returns [`ErrorKind::TerminalNotSignedIn`] if no staff is signed in, or
/// [`ErrorKind::TerminalAlreadyOpened`] if the terminal is already open.
pub fn check_open(terminal: &Terminal) -> Result<(), DomainError> {
    signed_in(terminal, "open_terminal")?;
    if terminal.status == TerminalStatus::Opened {
        return Err(DomainError::new(
            ErrorKind::TerminalAlreadyOpened,
            "open_terminal",
            format!("terminal {} is already opened", terminal.terminal_no),
        ));
    }
    Ok(())
}

/// Cash in/out requires the terminal opened and signed in.
///
/// # Errors
///
/// Returns [`ErrorKind::TerminalNotSignedIn`] or [`ErrorKind::TerminalStatusError`].
pub fn check_cash_in_out(terminal: &Terminal) -> Result<(), DomainError> {
    signed_in(terminal, "cash_in_out")?;
    if terminal.status != TerminalStatus::Opened {
        return Err(DomainError::new(
            ErrorKind::TerminalStatusError,
            "cash_in_out",
            format!("terminal {} is not opened", terminal.terminal_no),
        ));
    }
    Ok(())
}

/// Close requires the terminal currently opened.
///
/// # Errors
///
/// Returns [`ErrorKind::TerminalAlreadyClosed`] or [`ErrorKind::TerminalStatusError`].
pub fn check_close(terminal: &Terminal) -> Result<(), DomainError> {
    match terminal.status {
        TerminalStatus::Opened => Ok(()),
        TerminalStatus::Closed => Err(DomainError::new(
            ErrorKind::TerminalAlreadyClosed,
            "close_terminal",
            format!("terminal {} is already closed", terminal.terminal_no),
        )),
        TerminalStatus::Idle => Err(DomainError::new(
            ErrorKind::TerminalStatusError,
            "close_terminal",
            format!("terminal {} is not opened", terminal.terminal_no),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pos_domain::business_date::BusinessDate;
    use pos_domain::ids::{StaffId, StaffRef, StoreCode, TenantId, TerminalNo};

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
    fn open_rejects_when_not_signed_in() {
        let err = check_open(&terminal()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TerminalNotSignedIn);
    }

    #[test]
    fn open_rejects_when_already_opened() {
        let mut terminal = terminal();
        terminal.staff = Some(StaffRef { id: StaffId::new("s1"), name: "Ann".to_string() });
        terminal.status = TerminalStatus::Opened;
        let err = check_open(&terminal).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TerminalAlreadyOpened);
    }

    #[test]
    fn cash_in_out_requires_opened_and_signed_in() {
        let mut terminal = terminal();
        terminal.staff = Some(StaffRef { id: StaffId::new("s1"), name: "Ann".to_string() });
        let err = check_cash_in_out(&terminal).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TerminalStatusError);
    }

    #[test]
    fn close_rejects_idle_terminal() {
        let err = check_close(&terminal()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TerminalStatusError);
    }

    #[test]
    fn close_rejects_already_closed_terminal() {
        let mut terminal = terminal();
        terminal.status = TerminalStatus::Closed;
        let err = check_close(&terminal).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TerminalAlreadyClosed);
    }
}
