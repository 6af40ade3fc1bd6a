//! Shared domain types for the POS transactional core.
//!
//! Every other crate in the workspace depends on this one for identifiers,
//! money, status enums, business dates and the error taxonomy. It has no
//! knowledge of storage, transport or HTTP — those live in the crates built
//! on top of it.

pub mod business_date;
pub mod enums;
pub mod error;
pub mod ids;
pub mod money;

pub use business_date::BusinessDate;
pub use enums::{
    CartStatus, DeliveryOverallStatus, DiscountScope, DiscountType, FunctionMode, ServiceStatus,
    StockUpdateType, TaxType, TerminalStatus, TransactionStatus, TransactionType,
};
pub use error::{DomainError, ErrorEnvelope, ErrorKind, Locale, UserError};
pub use ids::{
    CartId, CategoryCode, ItemCode, PaymentCode, StaffId, StaffRef, StoreCode, TaxCode, TenantId,
    TerminalId, TerminalNo,
};
pub use money::{Amount, Rounding};
