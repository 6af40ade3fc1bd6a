//! Report service orchestration: scope-based gate dispatch, sales
//! aggregation, cash reconciliation, and optional report→journal posting
//! (spec §4.7).

use std::sync::Arc;

use pos_core::environment::Clock;
use pos_delivery::DeliveryTracker;
use pos_domain::money::Amount;
use thiserror::Error;

use crate::aggregate::aggregate_sales;
use crate::gate::{check_store, check_terminal, GateError};
use crate::journal::{post_to_journal, JournalError};
use crate::model::{CashBlock, DiscountBucket, PaymentBucket, ReportKey, ReportScope, ReportType, SalesReport, TaxBucket};
use crate::store::{ReportRepository, ReportStoreError};

/// The cash payment code the original treats as cash-in-drawer; every
/// other payment code is excluded from the cash reconciliation block.
pub const CASH_PAYMENT_CODE: &str = "CASH";

#[derive(Debug, Error)]
pub enum ReportServiceError {
    #[error(transparent)]
    Store(#[from] ReportStoreError),
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error("report type {0:?} is not implemented")]
    UnsupportedReportType(ReportType),
}

/// The result of the pure aggregation pipeline, before the cash block
/// (computed separately against `pos_terminal`'s log tables) is merged in.
#[derive(Debug, Clone, Default)]
pub struct SalesAggregate {
    pub transaction_count: u32,
    pub sales_gross: Amount,
    pub sales_net: Amount,
    pub returns: Amount,
    pub discount_for_lineitems: DiscountBucket,
    pub discount_for_subtotal: DiscountBucket,
    pub taxes: Vec<TaxBucket>,
    pub payments: Vec<PaymentBucket>,
}

pub struct ReportService<C: Clock> {
    store: ReportRepository,
    tracker: Option<Arc<DeliveryTracker>>,
    clock: Arc<C>,
}

impl<C: Clock> ReportService<C> {
    #[must_use]
    pub fn new(store: ReportRepository, tracker: Option<Arc<DeliveryTracker>>, clock: Arc<C>) -> Self {
        Self { store, tracker, clock }
    }

    /// Generates a report for `key`. For `ReportScope::Daily`, runs the
    /// reconciliation gate first (per-terminal if `key.terminal_no` is
    /// set, store-wide across every terminal otherwise); `ReportScope::Flash`
    /// bypasses the gate. When `api_key_driven` is true and a delivery
    /// tracker was configured, the generated report is also posted to the
    /// journal.
    ///
    /// # Errors
    ///
    /// Returns [`ReportServiceError::UnsupportedReportType`] for any
    /// `report_type` other than [`ReportType::Sales`],
    /// [`ReportServiceError::Gate`] if the reconciliation gate fails, or
    /// [`ReportServiceError::Store`] on a database failure.
    pub async fn generate(
        &self,
        key: &ReportKey,
        report_type: &ReportType,
        scope: ReportScope,
        api_key_driven: bool,
    ) -> Result<SalesReport, ReportServiceError> {
        if *report_type != ReportType::Sales {
            return Err(ReportServiceError::UnsupportedReportType(report_type.clone()));
        }

        if scope == ReportScope::Daily {
            self.run_gate(key).await?;
        }

        let transactions = self
            .store
            .fetch_tranlogs(&key.tenant_id, &key.store_code, key.terminal_no, key.business_date_from, key.business_date_to)
            .await?;

        let aggregate = aggregate_sales(&transactions);
        let cash = self.compute_cash_block(key, &transactions).await?;

        let report = SalesReport {
            tenant_id: key.tenant_id.clone(),
            store_code: key.store_code.clone(),
            terminal_no: key.terminal_no,
            business_date_from: key.business_date_from,
            business_date_to: key.business_date_to,
            scope,
            transaction_count: aggregate.transaction_count,
            sales_gross: aggregate.sales_gross,
            sales_net: aggregate.sales_net,
            returns: aggregate.returns,
            discount_for_lineitems: aggregate.discount_for_lineitems,
            discount_for_subtotal: aggregate.discount_for_subtotal,
            taxes: aggregate.taxes,
            payments: aggregate.payments,
            cash,
            generated_at: self.clock.now(),
        };

        if api_key_driven {
            if let Some(tracker) = &self.tracker {
                post_to_journal(tracker, &report).await?;
            }
        }

        Ok(report)
    }

    async fn run_gate(&self, key: &ReportKey) -> Result<(), ReportServiceError> {
        match key.terminal_no {
            Some(terminal_no) => check_terminal(&self.store, &key.tenant_id, &key.store_code, terminal_no, key.business_date_from).await?,
            None => check_store(&self.store, &key.tenant_id, &key.store_code, key.business_date_from).await?,
        }
        Ok(())
    }

    async fn compute_cash_block(&self, key: &ReportKey, transactions: &[pos_cart::tranlog::TransactionLog]) -> Result<CashBlock, ReportServiceError> {
        let cash_payments: Amount = transactions
            .iter()
            .flat_map(|log| log.payments.iter())
            .filter(|payment| payment.payment_code.as_str() == CASH_PAYMENT_CODE)
            .map(|payment| payment.amount)
            .sum();

        let Some(terminal_no) = key.terminal_no else {
            return Ok(CashBlock { logical_amount: cash_payments, physical_amount: None, difference: None, cash_in: Amount::ZERO, cash_out: Amount::ZERO });
        };

        let close_log = self.store.latest_close_log(&key.tenant_id, &key.store_code, terminal_no, key.business_date_to).await?;
        let (cash_in, cash_out) =
            self.store.sum_cash_movements(&key.tenant_id, &key.store_code, terminal_no, key.business_date_from, key.business_date_to).await?;

        let physical_amount = close_log.and_then(|log| log.terminal_snapshot.physical_amount);
        let logical_amount = cash_payments + cash_in - cash_out;
        let difference = physical_amount.map(|physical| physical - logical_amount);

        Ok(CashBlock { logical_amount, physical_amount, difference, cash_in, cash_out })
    }
}
