//! HTTP surface for the report service (spec §6.1): `GET .../reports` for
//! both a store-wide and a single-terminal scope, sharing one query-string
//! shape.

use axum::extract::{Path, Query, State};
use axum::Json;
use pos_core::environment::Clock;
use pos_domain::business_date::BusinessDate;
use pos_domain::error::{DomainError, ErrorKind};
use pos_domain::ids::{StoreCode, TenantId, TerminalNo};
use pos_web::auth::TerminalApiKey;
use pos_web::AppError;
use serde::Deserialize;
use std::sync::Arc;

use crate::gate::GateError;
use crate::journal::JournalError;
use crate::model::{ReportKey, ReportScope, ReportType, SalesReport};
use crate::service::{ReportService, ReportServiceError};
use crate::store::ReportStoreError;

impl From<ReportServiceError> for AppError {
    fn from(err: ReportServiceError) -> Self {
        match err {
            ReportServiceError::Gate(GateError::NotClosed { terminal_no, business_date }) => AppError::en(DomainError::new(
                ErrorKind::TerminalNotClosed,
                "report",
                format!("terminal {terminal_no} has not closed business date {business_date}"),
            )),
            ReportServiceError::Gate(GateError::Mismatch { message, .. }) => AppError::en(DomainError::new(ErrorKind::ValidationError, "report", message)),
            ReportServiceError::Gate(GateError::Store(inner)) | ReportServiceError::Store(inner) => {
                AppError::en(DomainError::new(ErrorKind::SystemError, "report", inner.to_string()))
            },
            ReportServiceError::Journal(JournalError::Serialization(inner)) => {
                AppError::en(DomainError::new(ErrorKind::SystemError, "report", inner.to_string()))
            },
            ReportServiceError::Journal(JournalError::Delivery(inner)) => {
                AppError::en(DomainError::new(ErrorKind::ExternalServiceError, "report", inner.to_string()))
            },
            ReportServiceError::UnsupportedReportType(report_type) => {
                AppError::en(DomainError::new(ErrorKind::ValidationError, "report", format!("unsupported report_type {report_type:?}")))
            },
        }
    }
}

impl From<ReportStoreError> for AppError {
    fn from(err: ReportStoreError) -> Self {
        AppError::en(DomainError::new(ErrorKind::SystemError, "report", err.to_string()))
    }
}

/// Query parameters shared by both store-wide and per-terminal report
/// requests.
#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub report_scope: ReportScopeParam,
    pub report_type: ReportTypeParam,
    pub business_date: String,
    pub business_date_to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportScopeParam {
    Flash,
    Daily,
}

impl From<ReportScopeParam> for ReportScope {
    fn from(value: ReportScopeParam) -> Self {
        match value {
            ReportScopeParam::Flash => Self::Flash,
            ReportScopeParam::Daily => Self::Daily,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportTypeParam {
    Sales,
    Payment,
    Item,
    Category,
}

impl From<ReportTypeParam> for ReportType {
    fn from(value: ReportTypeParam) -> Self {
        match value {
            ReportTypeParam::Sales => Self::Sales,
            ReportTypeParam::Payment => Self::Payment,
            ReportTypeParam::Item => Self::Item,
            ReportTypeParam::Category => Self::Category,
        }
    }
}

fn parse_business_date(value: &str) -> Result<BusinessDate, AppError> {
    BusinessDate::parse_compact(value)
        .ok_or_else(|| AppError::en(DomainError::new(ErrorKind::ValidationError, "report", format!("invalid business_date '{value}'"))))
}

fn build_key(
    tenant_id: String,
    store_code: String,
    terminal_no: Option<i32>,
    query: &ReportQuery,
) -> Result<ReportKey, AppError> {
    let business_date_from = parse_business_date(&query.business_date)?;
    let business_date_to = match &query.business_date_to {
        Some(value) => parse_business_date(value)?,
        None => business_date_from,
    };
    Ok(ReportKey {
        tenant_id: TenantId::new(tenant_id),
        store_code: StoreCode::new(store_code),
        terminal_no: terminal_no.map(TerminalNo),
        business_date_from,
        business_date_to,
    })
}

/// `GET /tenants/:tenant_id/stores/:store_code/reports`
pub async fn store_report<C: Clock>(
    State(service): State<Arc<ReportService<C>>>,
    Path((tenant_id, store_code)): Path<(String, String)>,
    Query(query): Query<ReportQuery>,
    api_key: Option<TerminalApiKey>,
) -> Result<Json<SalesReport>, AppError> {
    let scope = ReportScope::from(query.report_scope);
    let report_type = ReportType::from(query.report_type);
    let key = build_key(tenant_id, store_code, None, &query)?;
    let report = service.generate(&key, &report_type, scope, api_key.is_some()).await?;
    Ok(Json(report))
}

/// `GET /tenants/:tenant_id/stores/:store_code/terminals/:terminal_no/reports`
pub async fn terminal_report<C: Clock>(
    State(service): State<Arc<ReportService<C>>>,
    Path((tenant_id, store_code, terminal_no)): Path<(String, String, i32)>,
    Query(query): Query<ReportQuery>,
    api_key: Option<TerminalApiKey>,
) -> Result<Json<SalesReport>, AppError> {
    let scope = ReportScope::from(query.report_scope);
    let report_type = ReportType::from(query.report_type);
    let key = build_key(tenant_id, store_code, Some(terminal_no), &query)?;
    let report = service.generate(&key, &report_type, scope, api_key.is_some()).await?;
    Ok(Json(report))
}
