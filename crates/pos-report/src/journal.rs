//! Report → journal posting (spec §4.7): an API-key-driven flash or daily
//! report is posted to the journal stream the same way `pos_cart` and
//! `pos_terminal` publish their own logs, through the shared
//! [`pos_delivery::DeliveryTracker`].

use pos_core::event::{Event, EventError, SerializedEvent};
use pos_delivery::tracker::DeliveryError;
use pos_delivery::DeliveryTracker;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ReportScope, SalesReport};

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("failed to serialize report: {0}")]
    Serialization(#[from] EventError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// `transaction_type` recorded on the journal entry a report produces.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalTransactionType {
    FlashReport,
    DailyReport,
}

impl From<ReportScope> for JournalTransactionType {
    fn from(scope: ReportScope) -> Self {
        match scope {
            ReportScope::Flash => Self::FlashReport,
            ReportScope::Daily => Self::DailyReport,
        }
    }
}

/// Posts a generated report as a journal entry. Only called for
/// API-key-driven (terminal-initiated) requests; reports pulled by a
/// back-office client are not journalled.
///
/// # Errors
///
/// Returns [`JournalError::Serialization`] if the report can't be
/// bincode-encoded, or [`JournalError::Delivery`] if the publish itself
/// fails; the report has already been returned to the caller by this
/// point, so a publish failure only affects the journal copy, which the
/// tracker's republish sweep will retry.
pub async fn post_to_journal(tracker: &DeliveryTracker, report: &SalesReport) -> Result<(), JournalError> {
    let event_id = uuid::Uuid::new_v4().to_string();
    let journal_type = JournalTransactionType::from(report.scope);
    let metadata = serde_json::json!({
        "tenant_id": report.tenant_id.as_str(),
        "store_code": report.store_code.as_str(),
        "terminal_no": report.terminal_no.map(|n| n.0),
        "transaction_type": journal_type,
    });

    let serialized = SerializedEvent::from_event(report, Some(metadata))?;

    tracker.publish(&event_id, report.event_type(), serialized, &["journal"]).await?;
    Ok(())
}
