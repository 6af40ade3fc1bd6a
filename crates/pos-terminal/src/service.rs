//! Orchestrates the terminal registry and its two log streams (spec
//! §4.5). Unlike `pos_cart`, terminal operations are one-shot imperative
//! transitions rather than a multi-step FSM, so this follows the
//! original's plain service-method shape instead of the `Reducer`
//! pattern `pos_cart` uses for its longer-lived cart aggregate.

use crate::gate;
use crate::model::{CashInOutLog, OpenCloseLog, OpenCloseOperation, Terminal};
use crate::receipt;
use crate::store::{TerminalLogRepository, TerminalRepository, TerminalStoreError, TERMINAL_LOG_DESTINATIONS};
use pos_core::environment::Clock;
use pos_core::event::Event;
use pos_delivery::DeliveryTracker;
use pos_domain::enums::TerminalStatus;
use pos_domain::error::DomainError;
use pos_domain::ids::{StaffId, StaffRef, StoreCode, TenantId, TerminalNo};
use pos_domain::money::Amount;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerminalServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("storage error: {0}")]
    Store(#[from] TerminalStoreError),
    #[error("publish error: {0}")]
    Publish(#[from] pos_delivery::DeliveryError),
    #[error("serialization error: {0}")]
    Serialize(String),
}

/// Identifies which terminal a call operates on — the same tuple
/// `TerminalId` wraps, kept as loose fields here since every repository
/// call already takes them loose.
pub struct TerminalKey {
    pub tenant_id: TenantId,
    pub store_code: StoreCode,
    pub terminal_no: TerminalNo,
}

pub struct TerminalService<C> {
    terminals: TerminalRepository,
    logs: TerminalLogRepository,
    delivery: Arc<DeliveryTracker>,
    clock: C,
}

impl<C: Clock> TerminalService<C> {
    #[must_use]
    pub fn new(terminals: TerminalRepository, logs: TerminalLogRepository, delivery: Arc<DeliveryTracker>, clock: C) -> Self {
        Self { terminals, logs, delivery, clock }
    }

    /// # Errors
    ///
    /// Returns [`TerminalServiceError::Store`] on failure.
    pub async fn get(&self, key: &TerminalKey) -> Result<Terminal, TerminalServiceError> {
        Ok(self.terminals.get(&key.tenant_id, &key.store_code, key.terminal_no).await?)
    }

    /// Registers a brand new terminal (spec §4.5's implicit precursor to
    /// every lifecycle operation).
    ///
    /// # Errors
    ///
    /// Returns [`TerminalServiceError::Store`] on failure.
    pub async fn create(
        &self,
        tenant_id: TenantId,
        store_code: StoreCode,
        terminal_no: TerminalNo,
        description: String,
        api_key: String,
    ) -> Result<Terminal, TerminalServiceError> {
        let terminal = Terminal::new(
            tenant_id,
            store_code,
            terminal_no,
            description,
            pos_domain::business_date::BusinessDate::new(self.clock.now().date_naive()),
            api_key,
        );
        self.terminals.insert(&terminal).await?;
        Ok(terminal)
    }

    /// # Errors
    ///
    /// Returns [`TerminalServiceError::Domain`] if a staff member is
    /// already signed in.
    pub async fn sign_in(&self, key: &TerminalKey, staff_id: StaffId, staff_name: String) -> Result<Terminal, TerminalServiceError> {
        let mut terminal = self.get(key).await?;
        gate::check_sign_in(&terminal)?;
        terminal.staff = Some(StaffRef { id: staff_id, name: staff_name });
        self.terminals.replace(&terminal).await?;
        Ok(terminal)
    }

    /// Signing out an already signed-out terminal is a no-op, matching
    /// the original (it does not raise).
    ///
    /// # Errors
    ///
    /// Returns [`TerminalServiceError::Store`] on failure.
    pub async fn sign_out(&self, key: &TerminalKey) -> Result<Terminal, TerminalServiceError> {
        let mut terminal = self.get(key).await?;
        if terminal.staff.is_none() {
            return Ok(terminal);
        }
        terminal.staff = None;
        self.terminals.replace(&terminal).await?;
        Ok(terminal)
    }

    /// Opens a terminal: rolls the business counter/date, sets the
    /// initial float, and writes both the opening cash log and the
    /// open/close log in one DB transaction each, publishing both after
    /// commit (spec §4.5 Open).
    ///
    /// # Errors
    ///
    /// Returns [`TerminalServiceError::Domain`] if the precondition fails.
    pub async fn open(&self, key: &TerminalKey, initial_amount: Amount) -> Result<OpenCloseLog, TerminalServiceError> {
        let mut terminal = self.get(key).await?;
        gate::check_open(&terminal)?;

        let today = pos_domain::business_date::BusinessDate::new(self.clock.now().date_naive());
        if terminal.business_date == today {
            terminal.open_counter += 1;
        } else {
            terminal.business_date = today;
            terminal.open_counter = 1;
        }
        terminal.business_counter += 1;
        terminal.status = TerminalStatus::Opened;
        terminal.initial_amount = Some(initial_amount);

        self.terminals.replace(&terminal).await?;

        let cash_log = self.build_cash_log(&terminal, initial_amount, "Initial amount".to_string());
        self.logs.insert_cash_in_out(&cash_log).await?;
        self.publish_cash_in_out(&cash_log).await?;

        let open_log = self.build_open_close_log(&terminal, OpenCloseOperation::Open, None);
        self.logs.insert_open_close(&open_log).await?;
        self.publish_open_close(&open_log).await?;

        Ok(open_log)
    }

    /// Records one signed cash movement (spec §4.5 Cash in/out).
    ///
    /// # Errors
    ///
    /// Returns [`TerminalServiceError::Domain`] if the precondition fails.
    pub async fn cash_in_out(&self, key: &TerminalKey, amount: Amount, description: String) -> Result<CashInOutLog, TerminalServiceError> {
        let terminal = self.get(key).await?;
        gate::check_cash_in_out(&terminal)?;

        let log = self.build_cash_log(&terminal, amount, description);
        self.logs.insert_cash_in_out(&log).await?;
        self.publish_cash_in_out(&log).await?;
        Ok(log)
    }

    /// Closes a terminal: snapshots the session's cash/transaction
    /// activity, records the physical count, and writes the closing
    /// open/close log (spec §4.5 Close).
    ///
    /// # Errors
    ///
    /// Returns [`TerminalServiceError::Domain`] if the precondition fails.
    pub async fn close(&self, key: &TerminalKey, physical_amount: Amount) -> Result<OpenCloseLog, TerminalServiceError> {
        let mut terminal = self.get(key).await?;
        gate::check_close(&terminal)?;

        terminal.status = TerminalStatus::Closed;
        terminal.physical_amount = Some(physical_amount);
        self.terminals.replace(&terminal).await?;

        let snapshot = self
            .logs
            .session_snapshot(&terminal.tenant_id, &terminal.store_code, terminal.terminal_no, terminal.business_date, terminal.open_counter)
            .await?;

        let close_log = self.build_open_close_log(&terminal, OpenCloseOperation::Close, Some(snapshot));
        self.logs.insert_open_close(&close_log).await?;
        self.publish_open_close(&close_log).await?;
        Ok(close_log)
    }

    fn build_cash_log(&self, terminal: &Terminal, amount: Amount, description: String) -> CashInOutLog {
        let mut log = CashInOutLog {
            event_id: uuid::Uuid::new_v4().to_string(),
            tenant_id: terminal.tenant_id.clone(),
            store_code: terminal.store_code.clone(),
            terminal_no: terminal.terminal_no,
            staff: terminal.staff.clone(),
            business_date: terminal.business_date,
            open_counter: terminal.open_counter,
            business_counter: terminal.business_counter,
            amount,
            description,
            receipt_text: String::new(),
            journal_text: String::new(),
            created_at: self.clock.now(),
        };
        let (receipt_text, journal_text) = receipt::cash_in_out(terminal, &log.description, amount);
        log.receipt_text = receipt_text;
        log.journal_text = journal_text;
        log
    }

    fn build_open_close_log(
        &self,
        terminal: &Terminal,
        operation: OpenCloseOperation,
        snapshot: Option<crate::store::SessionSnapshot>,
    ) -> OpenCloseLog {
        let snapshot = snapshot.unwrap_or_default();
        let mut log = OpenCloseLog {
            event_id: uuid::Uuid::new_v4().to_string(),
            tenant_id: terminal.tenant_id.clone(),
            store_code: terminal.store_code.clone(),
            terminal_no: terminal.terminal_no,
            staff: terminal.staff.clone(),
            business_date: terminal.business_date,
            open_counter: terminal.open_counter,
            business_counter: terminal.business_counter,
            operation,
            terminal_snapshot: terminal.redacted(),
            cash_in_out_count: snapshot.cash_in_out_count,
            cash_in_out_last_at: snapshot.cash_in_out_last_at,
            cart_transaction_count: snapshot.cart_transaction_count,
            cart_transaction_last_no: snapshot.cart_transaction_last_no,
            receipt_text: String::new(),
            journal_text: String::new(),
            created_at: self.clock.now(),
        };
        let (receipt_text, journal_text) = receipt::open_close(&log);
        log.receipt_text = receipt_text;
        log.journal_text = journal_text;
        log
    }

    async fn publish_cash_in_out(&self, log: &CashInOutLog) -> Result<(), TerminalServiceError> {
        let data = bincode::serialize(log).map_err(|e| TerminalServiceError::Serialize(e.to_string()))?;
        let serialized = pos_core::event::SerializedEvent { event_type: log.event_type().to_string(), data, metadata: None };
        self.delivery.publish(&log.event_id, "terminal-events", serialized, TERMINAL_LOG_DESTINATIONS).await?;
        Ok(())
    }

    async fn publish_open_close(&self, log: &OpenCloseLog) -> Result<(), TerminalServiceError> {
        let data = bincode::serialize(log).map_err(|e| TerminalServiceError::Serialize(e.to_string()))?;
        let serialized = pos_core::event::SerializedEvent { event_type: log.event_type().to_string(), data, metadata: None };
        self.delivery.publish(&log.event_id, "terminal-events", serialized, TERMINAL_LOG_DESTINATIONS).await?;
        Ok(())
    }
}
