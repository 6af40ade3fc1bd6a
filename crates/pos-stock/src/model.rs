//! Stock, stock updates and snapshots (spec §3.1, §4.8).

use chrono::{DateTime, Utc};
use pos_domain::ids::{ItemCode, StaffId, StoreCode, TenantId};
use serde::{Deserialize, Serialize};

/// Current on-hand quantity for one `(tenant, store, item_code)`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Stock {
    pub tenant_id: TenantId,
    pub store_code: StoreCode,
    pub item_code: ItemCode,
    pub current_quantity: i64,
    pub minimum_quantity: Option<i64>,
    pub reorder_point: Option<i64>,
    pub reorder_quantity: Option<i64>,
    pub last_update_time: DateTime<Utc>,
}

impl Stock {
    #[must_use]
    pub fn new(tenant_id: TenantId, store_code: StoreCode, item_code: ItemCode) -> Self {
        Self {
            tenant_id,
            store_code,
            item_code,
            current_quantity: 0,
            minimum_quantity: None,
            reorder_point: None,
            reorder_quantity: None,
            last_update_time: Utc::now(),
        }
    }

    /// Whether stock is at or below its configured minimum, one of the two
    /// post-commit alert thresholds (spec §4.8).
    #[must_use]
    pub fn below_minimum(&self) -> bool {
        self.minimum_quantity.is_some_and(|min| self.current_quantity <= min)
    }

    /// Whether stock is at or below its configured reorder point.
    #[must_use]
    pub fn at_or_below_reorder_point(&self) -> bool {
        self.reorder_point.is_some_and(|point| self.current_quantity <= point)
    }
}

/// What category of event produced a [`StockUpdate`] (spec §3.1).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockUpdateReason {
    Sale,
    Return,
    VoidReturn,
    VoidSale,
    ManualIn,
    ManualOut,
    Adjustment,
    Purchase,
}

impl StockUpdateReason {
    /// The reason a tranlog-driven stock update carries, derived from the
    /// originating transaction type (the same classification
    /// `TransactionType::report_sign` uses for the sign, spec §4.7/§4.8).
    #[must_use]
    pub fn from_transaction_type(transaction_type: pos_domain::enums::TransactionType) -> Self {
        use pos_domain::enums::TransactionType;
        match transaction_type {
            TransactionType::NormalSales => Self::Sale,
            TransactionType::ReturnSales => Self::Return,
            TransactionType::VoidSales => Self::VoidSale,
            TransactionType::VoidReturn => Self::VoidReturn,
        }
    }
}

/// One append-only adjustment to a [`Stock`] row (spec §3.1). Never mutated
/// once written; `Stock.current_quantity` is always the sum of every
/// `quantity_change` applied to that key.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StockUpdate {
    pub event_id: String,
    pub tenant_id: TenantId,
    pub store_code: StoreCode,
    pub item_code: ItemCode,
    pub previous_quantity: i64,
    pub quantity_change: i64,
    pub new_quantity: i64,
    pub update_type: StockUpdateReason,
    pub reference_id: Option<String>,
    pub operator_id: Option<StaffId>,
    pub note: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A point-in-time capture of every item's quantity, for audit and recovery
/// (spec §3.1, §4.8's scheduled snapshot task).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StockSnapshot {
    pub snapshot_id: String,
    pub tenant_id: TenantId,
    pub store_code: StoreCode,
    pub generate_date_time: DateTime<Utc>,
    pub created_by: Option<StaffId>,
    pub items: Vec<StockSnapshotItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StockSnapshotItem {
    pub item_code: ItemCode,
    pub quantity: i64,
}

/// How often a tenant's stock snapshot is taken (spec §4.8, §6.5's
/// `DEFAULT_SNAPSHOT_*` configuration keys).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotFrequency {
    Daily,
    Weekly,
    Monthly,
}

/// Per-tenant snapshot schedule (spec §6.5's `MIN`/`MAX_SNAPSHOT_RETENTION_DAYS`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SnapshotSchedule {
    pub tenant_id: TenantId,
    pub frequency: SnapshotFrequency,
    pub retention_days: i64,
}

impl SnapshotSchedule {
    #[must_use]
    pub fn default_for(tenant_id: TenantId, retention_days: i64) -> Self {
        Self { tenant_id, frequency: SnapshotFrequency::Daily, retention_days }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pos_domain::ids::{ItemCode, StoreCode, TenantId};

    fn stock(current: i64, minimum: Option<i64>, reorder: Option<i64>) -> Stock {
        let mut s = Stock::new(TenantId::new("t1"), StoreCode::new("s1"), ItemCode::new("i1"));
        s.current_quantity = current;
        s.minimum_quantity = minimum;
        s.reorder_point = reorder;
        s
    }

    #[test]
    fn below_minimum_is_false_without_a_configured_minimum() {
        assert!(!stock(0, None, None).below_minimum());
    }

    #[test]
    fn below_minimum_triggers_at_or_under_threshold() {
        assert!(stock(5, Some(5), None).below_minimum());
        assert!(!stock(6, Some(5), None).below_minimum());
    }

    #[test]
    fn reorder_point_triggers_at_or_under_threshold() {
        assert!(stock(10, None, Some(10)).at_or_below_reorder_point());
        assert!(!stock(11, None, Some(10)).at_or_below_reorder_point());
    }

    #[test]
    fn update_reason_maps_from_transaction_type() {
        use pos_domain::enums::TransactionType;
        assert_eq!(StockUpdateReason::from_transaction_type(TransactionType::NormalSales), StockUpdateReason::Sale);
        assert_eq!(StockUpdateReason::from_transaction_type(TransactionType::ReturnSales), StockUpdateReason::Return);
        assert_eq!(StockUpdateReason::from_transaction_type(TransactionType::VoidSales), StockUpdateReason::VoidSale);
        assert_eq!(StockUpdateReason::from_transaction_type(TransactionType::VoidReturn), StockUpdateReason::VoidReturn);
    }
}
