//! HTTP surface for the stock service (spec §4.8, §6.1 port 8006).
//!
//! Every stock-level handler resolves a row by `(tenant_id, store_code,
//! item_code)`; the tranlog ingest handler instead takes a whole serialized
//! transaction log, the pub/sub push path spec §6.1 lists alongside the
//! stock endpoints themselves.

use crate::model::{SnapshotSchedule, SnapshotFrequency, Stock, StockSnapshot, StockUpdate, StockUpdateReason};
use crate::service::{StockKey, StockService, StockServiceError};
use axum::extract::{Path, Query, State};
use axum::Json;
use pos_cart::tranlog::TransactionLog;
use pos_core::environment::Clock;
use pos_domain::error::{DomainError, ErrorKind};
use pos_domain::ids::{ItemCode, StaffId, StoreCode, TenantId};
use pos_web::AppError;
use serde::Deserialize;
use std::sync::Arc;

impl From<StockServiceError> for AppError {
    fn from(err: StockServiceError) -> Self {
        match err {
            StockServiceError::NotFound { item_code } => {
                AppError::en(DomainError::new(ErrorKind::ResourceNotFound, "stock", format!("no stock row for item {item_code}")))
            },
            StockServiceError::Store(inner) => AppError::en(DomainError::new(ErrorKind::SystemError, "stock", inner.to_string())),
            StockServiceError::Projection(inner) => AppError::en(DomainError::new(ErrorKind::SystemError, "stock", inner.to_string())),
        }
    }
}

fn key(tenant_id: String, store_code: String, item_code: String) -> StockKey {
    StockKey { tenant_id: TenantId::new(tenant_id), store_code: StoreCode::new(store_code), item_code: ItemCode::new(item_code) }
}

pub async fn get_stock<C: Clock>(
    State(service): State<Arc<StockService<C>>>,
    Path((tenant_id, store_code, item_code)): Path<(String, String, String)>,
) -> Result<Json<Stock>, AppError> {
    let stock = service.get(&key(tenant_id, store_code, item_code)).await?;
    Ok(Json(stock))
}

pub async fn list_low_stock<C: Clock>(
    State(service): State<Arc<StockService<C>>>,
    Path((tenant_id, store_code)): Path<(String, String)>,
) -> Result<Json<Vec<Stock>>, AppError> {
    let items = service.list_low_stock(&TenantId::new(tenant_id), &StoreCode::new(store_code)).await?;
    Ok(Json(items))
}

/// Request body for `PUT /stock/:tenant_id/:store_code/:item_code/thresholds`.
#[derive(Debug, Deserialize)]
pub struct SetThresholdsRequest {
    pub minimum_quantity: Option<i64>,
    pub reorder_point: Option<i64>,
    pub reorder_quantity: Option<i64>,
}

pub async fn set_thresholds<C: Clock>(
    State(service): State<Arc<StockService<C>>>,
    Path((tenant_id, store_code, item_code)): Path<(String, String, String)>,
    Json(req): Json<SetThresholdsRequest>,
) -> Result<Json<()>, AppError> {
    service
        .set_thresholds(&key(tenant_id, store_code, item_code), req.minimum_quantity, req.reorder_point, req.reorder_quantity)
        .await?;
    Ok(Json(()))
}

/// Request body for `POST /stock/:tenant_id/:store_code/:item_code/adjust`.
#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub quantity_change: i64,
    pub reason: ManualReason,
    pub operator_id: Option<String>,
    pub note: Option<String>,
}

/// Manual stock-movement reasons a caller may request; tranlog-driven
/// reasons (`Sale`/`Return`/the voids) are never accepted here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualReason {
    ManualIn,
    ManualOut,
    Adjustment,
    Purchase,
}

impl From<ManualReason> for StockUpdateReason {
    fn from(reason: ManualReason) -> Self {
        match reason {
            ManualReason::ManualIn => Self::ManualIn,
            ManualReason::ManualOut => Self::ManualOut,
            ManualReason::Adjustment => Self::Adjustment,
            ManualReason::Purchase => Self::Purchase,
        }
    }
}

pub async fn adjust_stock<C: Clock>(
    State(service): State<Arc<StockService<C>>>,
    Path((tenant_id, store_code, item_code)): Path<(String, String, String)>,
    Json(req): Json<AdjustRequest>,
) -> Result<Json<StockUpdate>, AppError> {
    let update = service
        .manual_adjust(
            &key(tenant_id, store_code, item_code),
            req.quantity_change,
            req.reason.into(),
            req.operator_id.map(StaffId::new).as_ref(),
            req.note.as_deref(),
        )
        .await?;
    Ok(Json(update))
}

/// Query parameters for `GET /stock/:tenant_id/:store_code/:item_code/history`.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

pub async fn stock_history<C: Clock>(
    State(service): State<Arc<StockService<C>>>,
    Path((tenant_id, store_code, item_code)): Path<(String, String, String)>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<StockUpdate>>, AppError> {
    let history = service.history(&key(tenant_id, store_code, item_code), query.limit.unwrap_or(50)).await?;
    Ok(Json(history))
}

/// Request body for `POST /stock/:tenant_id/:store_code/snapshot`.
#[derive(Debug, Deserialize)]
pub struct TakeSnapshotRequest {
    pub created_by: Option<String>,
}

pub async fn take_snapshot<C: Clock>(
    State(service): State<Arc<StockService<C>>>,
    Path((tenant_id, store_code)): Path<(String, String)>,
    Json(req): Json<TakeSnapshotRequest>,
) -> Result<Json<StockSnapshot>, AppError> {
    let snapshot = service
        .take_snapshot(&TenantId::new(tenant_id), &StoreCode::new(store_code), req.created_by.map(StaffId::new).as_ref())
        .await?;
    Ok(Json(snapshot))
}

/// Request body for `PUT /stock/:tenant_id/schedule`.
#[derive(Debug, Deserialize)]
pub struct SaveScheduleRequest {
    pub frequency: ScheduleFrequency,
    pub retention_days: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl From<ScheduleFrequency> for SnapshotFrequency {
    fn from(frequency: ScheduleFrequency) -> Self {
        match frequency {
            ScheduleFrequency::Daily => Self::Daily,
            ScheduleFrequency::Weekly => Self::Weekly,
            ScheduleFrequency::Monthly => Self::Monthly,
        }
    }
}

pub async fn save_schedule<C: Clock>(
    State(service): State<Arc<StockService<C>>>,
    Path(tenant_id): Path<String>,
    Json(req): Json<SaveScheduleRequest>,
) -> Result<Json<()>, AppError> {
    let schedule = SnapshotSchedule { tenant_id: TenantId::new(tenant_id), frequency: req.frequency.into(), retention_days: req.retention_days };
    service.save_schedule(&schedule).await?;
    Ok(Json(()))
}

pub async fn list_schedules<C: Clock>(State(service): State<Arc<StockService<C>>>) -> Result<Json<Vec<SnapshotSchedule>>, AppError> {
    let schedules = service.list_schedules().await?;
    Ok(Json(schedules))
}

/// `POST /tranlog`: the pub/sub push path delivering one committed
/// transaction log for stock to fold in (spec §6.1). Idempotent;
/// redelivery of an already-applied event is a no-op.
pub async fn ingest_tranlog<C: Clock>(
    State(service): State<Arc<StockService<C>>>,
    Json(log): Json<TransactionLog>,
) -> Result<Json<()>, AppError> {
    service.ingest(&log).await?;
    Ok(Json(()))
}
