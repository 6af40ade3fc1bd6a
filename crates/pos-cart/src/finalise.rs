//! Transaction finalisation: bill, void, return (spec §4.4).
//!
//! Every path allocates a fresh `transaction_no`/`receipt_no` pair (gaps in
//! either sequence are acceptable; duplicates are not), writes the tranlog
//! and its delivery-status fan-out rows in one database transaction, and
//! only publishes to the bus after that transaction commits.

use crate::model::{Cart, Payment};
use crate::settings::{applicable_stamp_duty, TenantSettings};
use crate::store::{TranlogRepository, TranlogStoreError, TRANLOG_DESTINATIONS};
use crate::tranlog::TransactionLog;
use chrono::Utc;
use pos_core::event::Event;
use pos_delivery::{DeliveryError, DeliveryTracker};
use pos_domain::enums::TransactionType;
use pos_domain::ids::{PaymentCode, StaffRef};
use pos_postgres::counters::{CounterError, CounterRepository};
use std::sync::Arc;
use thiserror::Error;

/// Payment code treated as cash for the stamp-duty computation, matching
/// the original cart service's fixed code table.
const CASH_PAYMENT_CODE: &str = "01";

#[derive(Debug, Error)]
pub enum FinaliseError {
    #[error("counter allocation failed: {0}")]
    Counter(#[from] CounterError),
    #[error("tranlog write failed: {0}")]
    Store(#[from] TranlogStoreError),
    #[error("publish failed: {0}")]
    Publish(#[from] DeliveryError),
    #[error("cart is not in a billable state")]
    NotBillable,
    #[error("transaction already voided")]
    AlreadyVoided,
    #[error("transaction already refunded")]
    AlreadyRefunded,
    #[error("only normal sales can be returned")]
    NotReturnable,
    #[error("payment total does not match the original transaction")]
    PaymentMismatch,
}

/// Orchestrates bill/void/return against the counter repository, the
/// tranlog store, and the delivery tracker.
pub struct Finaliser {
    tranlog: TranlogRepository,
    counters: CounterRepository,
    delivery: Arc<DeliveryTracker>,
}

impl Finaliser {
    #[must_use]
    pub fn new(tranlog: TranlogRepository, counters: CounterRepository, delivery: Arc<DeliveryTracker>) -> Self {
        Self { tranlog, counters, delivery }
    }

    fn stamp_duty(cart: &Cart, settings: &TenantSettings) -> (bool, Option<pos_domain::money::Amount>, Option<pos_domain::money::Amount>) {
        let cash_amount: i64 = cart
            .payments
            .iter()
            .filter(|p| p.payment_code.as_str() == CASH_PAYMENT_CODE)
            .map(|p| p.amount.value())
            .sum();

        match applicable_stamp_duty(&settings.stamp_duty_master, cart.sales.total_amount.value(), cash_amount) {
            Some(rule) => (
                true,
                Some(pos_domain::money::Amount::new(cash_amount)),
                Some(pos_domain::money::Amount::new(rule.stamp_duty_amount)),
            ),
            None => (false, None, None),
        }
    }

    /// Bills a `Paying`-state cart that has a zero balance, allocating
    /// fresh counters and publishing after commit.
    ///
    /// # Errors
    ///
    /// See [`FinaliseError`].
    pub async fn bill(&self, cart: &Cart, staff: Option<StaffRef>, settings: &TenantSettings) -> Result<TransactionLog, FinaliseError> {
        if !cart.sales.balance_amount.is_zero() {
            return Err(FinaliseError::NotBillable);
        }

        self.counters.ensure_row(&cart.tenant_id, &cart.store_code, cart.terminal_no).await?;
        let transaction_no = self.counters.next_transaction_no(&cart.tenant_id, &cart.store_code, cart.terminal_no).await?;
        let receipt_no = self.counters.next_receipt_no(&cart.tenant_id, &cart.store_code, cart.terminal_no).await?;

        let (is_stamp_duty_applied, stamp_duty_target_amount, stamp_duty_amount) = Self::stamp_duty(cart, settings);
        let mut sales = cart.sales.clone();
        sales.is_stamp_duty_applied = is_stamp_duty_applied;
        sales.stamp_duty_target_amount = stamp_duty_target_amount;
        sales.stamp_duty_amount = stamp_duty_amount;

        let log = TransactionLog {
            event_id: uuid::Uuid::new_v4().to_string(),
            tenant_id: cart.tenant_id.clone(),
            store_code: cart.store_code.clone(),
            terminal_no: cart.terminal_no,
            transaction_no,
            receipt_no,
            business_date: cart.business_date,
            transaction_type: TransactionType::NormalSales,
            cart_id: cart.cart_id.clone(),
            staff,
            line_items: cart.line_items.clone(),
            payments: cart.payments.clone(),
            taxes: cart.taxes.clone(),
            sales,
            invoice_registration_number: settings.invoice_registration_number.clone(),
            receipt_headers: settings.receipt_headers.clone(),
            receipt_footers: settings.receipt_footers.clone(),
            original_transaction_no: None,
            created_at: Utc::now(),
        };

        self.commit_and_publish(&log).await?;
        Ok(log)
    }

    /// Voids a previously billed transaction (spec §4.4 "Void").
    ///
    /// # Errors
    ///
    /// Returns [`FinaliseError::AlreadyVoided`] if the original transaction
    /// has already been voided, [`FinaliseError::AlreadyRefunded`] if it
    /// was a `NormalSales` that has already been refunded, or
    /// [`FinaliseError::PaymentMismatch`] if the supplied payments don't sum
    /// to the same per-code totals as the original.
    pub async fn void(&self, original: &TransactionLog, payments: Vec<Payment>) -> Result<TransactionLog, FinaliseError> {
        let status = self.tranlog.status_for(original.transaction_no).await?;
        if status.is_voided() {
            return Err(FinaliseError::AlreadyVoided);
        }
        if status.is_refunded() && original.transaction_type == TransactionType::NormalSales {
            return Err(FinaliseError::AlreadyRefunded);
        }
        Self::require_matching_payment_totals(&original.payments, &payments)?;

        let void_type = match original.transaction_type {
            TransactionType::NormalSales => TransactionType::VoidSales,
            TransactionType::ReturnSales => TransactionType::VoidReturn,
            TransactionType::VoidSales | TransactionType::VoidReturn => return Err(FinaliseError::AlreadyVoided),
        };

        let log = self.derive(original, void_type, payments).await?;
        self.commit_and_publish(&log).await?;

        let now = Utc::now();
        let mut original_status = status;
        original_status.mark_voided(now);
        self.tranlog.save_status(&original_status).await?;

        if void_type == TransactionType::VoidReturn {
            if let Some(sale_transaction_no) = original.original_transaction_no {
                let mut sale_status = self.tranlog.status_for(sale_transaction_no).await?;
                sale_status.reset_refund_status(now);
                self.tranlog.save_status(&sale_status).await?;
            }
        }

        Ok(log)
    }

    /// Returns goods from a previously billed `NormalSales` transaction
    /// (spec §4.4 "Return").
    ///
    /// # Errors
    ///
    /// Returns [`FinaliseError::NotReturnable`] if the original transaction
    /// isn't a `NormalSales`, or [`FinaliseError::PaymentMismatch`] if the
    /// supplied payments' total doesn't match the original's total.
    pub async fn return_sale(&self, original: &TransactionLog, payments: Vec<Payment>) -> Result<TransactionLog, FinaliseError> {
        if original.transaction_type != TransactionType::NormalSales {
            return Err(FinaliseError::NotReturnable);
        }
        let original_total: pos_domain::money::Amount = original.payments.iter().map(|p| p.amount).sum();
        let new_total: pos_domain::money::Amount = payments.iter().map(|p| p.amount).sum();
        if original_total != new_total {
            return Err(FinaliseError::PaymentMismatch);
        }

        let log = self.derive(original, TransactionType::ReturnSales, payments).await?;
        self.commit_and_publish(&log).await?;

        let mut status = self.tranlog.status_for(original.transaction_no).await?;
        status.mark_refunded(Utc::now());
        self.tranlog.save_status(&status).await?;

        Ok(log)
    }

    fn require_matching_payment_totals(original: &[Payment], supplied: &[Payment]) -> Result<(), FinaliseError> {
        use std::collections::HashMap;

        let mut by_code: HashMap<PaymentCode, pos_domain::money::Amount> = HashMap::new();
        for p in original {
            *by_code.entry(p.payment_code.clone()).or_insert(pos_domain::money::Amount::ZERO) += p.amount;
        }
        for p in supplied {
            let entry = by_code.entry(p.payment_code.clone()).or_insert(pos_domain::money::Amount::ZERO);
            *entry -= p.amount;
        }
        if by_code.values().all(|v| v.is_zero()) {
            Ok(())
        } else {
            Err(FinaliseError::PaymentMismatch)
        }
    }

    async fn derive(&self, original: &TransactionLog, transaction_type: TransactionType, payments: Vec<Payment>) -> Result<TransactionLog, FinaliseError> {
        self.counters.ensure_row(&original.tenant_id, &original.store_code, original.terminal_no).await?;
        let transaction_no = self
            .counters
            .next_transaction_no(&original.tenant_id, &original.store_code, original.terminal_no)
            .await?;
        let receipt_no = self
            .counters
            .next_receipt_no(&original.tenant_id, &original.store_code, original.terminal_no)
            .await?;

        Ok(TransactionLog {
            event_id: uuid::Uuid::new_v4().to_string(),
            tenant_id: original.tenant_id.clone(),
            store_code: original.store_code.clone(),
            terminal_no: original.terminal_no,
            transaction_no,
            receipt_no,
            business_date: original.business_date,
            transaction_type,
            cart_id: original.cart_id.clone(),
            staff: original.staff.clone(),
            line_items: original.line_items.clone(),
            payments,
            taxes: original.taxes.clone(),
            sales: original.sales.clone(),
            invoice_registration_number: original.invoice_registration_number.clone(),
            receipt_headers: original.receipt_headers.clone(),
            receipt_footers: original.receipt_footers.clone(),
            original_transaction_no: Some(original.transaction_no),
            created_at: Utc::now(),
        })
    }

    async fn commit_and_publish(&self, log: &TransactionLog) -> Result<(), FinaliseError> {
        self.tranlog.insert_with_delivery_status(log).await?;

        let serialized = pos_core::event::SerializedEvent {
            event_type: log.event_type().to_string(),
            data: bincode::serialize(log).map_err(|e| TranlogStoreError::Database(e.to_string()))?,
            metadata: None,
        };

        self.delivery
            .publish(&log.event_id, "tranlog-events", serialized, TRANLOG_DESTINATIONS)
            .await?;
        Ok(())
    }
}
