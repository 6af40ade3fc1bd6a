//! HTTP surface for the terminal service (spec §4.5).
//!
//! Every handler resolves a terminal by `(tenant_id, store_code,
//! terminal_no)` and renders the resulting terminal or log as JSON through
//! the shared [`AppError`] envelope.

use crate::model::{CashInOutLog, OpenCloseLog, Terminal};
use crate::service::{TerminalKey, TerminalService, TerminalServiceError};
use axum::extract::{Path, State};
use axum::Json;
use pos_core::environment::Clock;
use pos_domain::error::{DomainError, ErrorKind};
use pos_domain::ids::{StaffId, StoreCode, TenantId, TerminalNo};
use pos_domain::money::Amount;
use pos_web::AppError;
use serde::Deserialize;
use std::sync::Arc;

impl From<TerminalServiceError> for AppError {
    fn from(err: TerminalServiceError) -> Self {
        match err {
            TerminalServiceError::Domain(inner) => AppError::en(inner),
            TerminalServiceError::Store(crate::store::TerminalStoreError::NotFound(detail)) => {
                AppError::en(DomainError::new(ErrorKind::ResourceNotFound, "terminal", detail))
            },
            TerminalServiceError::Store(inner) => AppError::en(DomainError::new(ErrorKind::SystemError, "terminal", inner.to_string())),
            TerminalServiceError::Publish(inner) => AppError::en(DomainError::new(ErrorKind::ExternalServiceError, "terminal", inner.to_string())),
            TerminalServiceError::Serialize(detail) => AppError::en(DomainError::new(ErrorKind::SystemError, "terminal", detail)),
        }
    }
}

fn key(tenant_id: String, store_code: String, terminal_no: i32) -> TerminalKey {
    TerminalKey { tenant_id: TenantId::new(tenant_id), store_code: StoreCode::new(store_code), terminal_no: TerminalNo(terminal_no) }
}

/// Request body for `POST /terminals`.
#[derive(Debug, Deserialize)]
pub struct CreateTerminalRequest {
    pub tenant_id: String,
    pub store_code: String,
    pub terminal_no: i32,
    pub description: String,
    pub api_key: String,
}

pub async fn create_terminal<C: Clock>(
    State(service): State<Arc<TerminalService<C>>>,
    Json(req): Json<CreateTerminalRequest>,
) -> Result<Json<Terminal>, AppError> {
    let terminal = service
        .create(TenantId::new(req.tenant_id), StoreCode::new(req.store_code), TerminalNo(req.terminal_no), req.description, req.api_key)
        .await?;
    Ok(Json(terminal))
}

pub async fn get_terminal<C: Clock>(
    State(service): State<Arc<TerminalService<C>>>,
    Path((tenant_id, store_code, terminal_no)): Path<(String, String, i32)>,
) -> Result<Json<Terminal>, AppError> {
    let terminal = service.get(&key(tenant_id, store_code, terminal_no)).await?;
    Ok(Json(terminal))
}

/// Request body for `POST /terminals/:tenant_id/:store_code/:terminal_no/sign-in`.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub staff_id: String,
    pub staff_name: String,
}

pub async fn sign_in<C: Clock>(
    State(service): State<Arc<TerminalService<C>>>,
    Path((tenant_id, store_code, terminal_no)): Path<(String, String, i32)>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<Terminal>, AppError> {
    let terminal = service.sign_in(&key(tenant_id, store_code, terminal_no), StaffId::new(req.staff_id), req.staff_name).await?;
    Ok(Json(terminal))
}

pub async fn sign_out<C: Clock>(
    State(service): State<Arc<TerminalService<C>>>,
    Path((tenant_id, store_code, terminal_no)): Path<(String, String, i32)>,
) -> Result<Json<Terminal>, AppError> {
    let terminal = service.sign_out(&key(tenant_id, store_code, terminal_no)).await?;
    Ok(Json(terminal))
}

/// Request body for `POST /terminals/:tenant_id/:store_code/:terminal_no/open`.
#[derive(Debug, Deserialize)]
pub struct OpenRequest {
    pub initial_amount: i64,
}

pub async fn open<C: Clock>(
    State(service): State<Arc<TerminalService<C>>>,
    Path((tenant_id, store_code, terminal_no)): Path<(String, String, i32)>,
    Json(req): Json<OpenRequest>,
) -> Result<Json<OpenCloseLog>, AppError> {
    let log = service.open(&key(tenant_id, store_code, terminal_no), Amount::new(req.initial_amount)).await?;
    Ok(Json(log))
}

/// Request body for `POST /terminals/:tenant_id/:store_code/:terminal_no/cash`.
#[derive(Debug, Deserialize)]
pub struct CashInOutRequest {
    pub amount: i64,
    pub description: String,
}

pub async fn cash_in_out<C: Clock>(
    State(service): State<Arc<TerminalService<C>>>,
    Path((tenant_id, store_code, terminal_no)): Path<(String, String, i32)>,
    Json(req): Json<CashInOutRequest>,
) -> Result<Json<CashInOutLog>, AppError> {
    let log = service.cash_in_out(&key(tenant_id, store_code, terminal_no), Amount::new(req.amount), req.description).await?;
    Ok(Json(log))
}

/// Request body for `POST /terminals/:tenant_id/:store_code/:terminal_no/close`.
#[derive(Debug, Deserialize)]
pub struct CloseRequest {
    pub physical_amount: i64,
}

pub async fn close<C: Clock>(
    State(service): State<Arc<TerminalService<C>>>,
    Path((tenant_id, store_code, terminal_no)): Path<(String, String, i32)>,
    Json(req): Json<CloseRequest>,
) -> Result<Json<OpenCloseLog>, AppError> {
    let log = service.close(&key(tenant_id, store_code, terminal_no), Amount::new(req.physical_amount)).await?;
    Ok(Json(log))
}
