//! HTTP surface for the cart service (spec §6.1).
//!
//! Every handler resolves its cart by id, dispatches one [`CartAction`]
//! against it, and renders the resulting cart or finalisation result as
//! JSON through the shared [`AppError`] envelope.

use crate::model::{Cart, Discount};
use crate::reducer::{CartAction, CartEnvironment};
use crate::service::{CartService, ServiceError};
use crate::tranlog::TransactionLog;
use axum::{extract::{Path, State}, http::StatusCode, Json};
use pos_domain::business_date::BusinessDate;
use pos_domain::error::{DomainError, ErrorKind, Locale};
use pos_domain::ids::{CartId, ItemCode, PaymentCode, StaffRef, StoreCode, TenantId, TerminalNo};
use pos_domain::money::Amount;
use pos_web::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(id) => {
                AppError::en(DomainError::new(ErrorKind::ResourceNotFound, "cart", format!("cart {id} not found")))
            },
            ServiceError::Finalise(inner) => AppError::en(DomainError::new(ErrorKind::SystemError, "bill_cart", inner.to_string())),
        }
    }
}

/// Request body for `POST /carts`.
#[derive(Debug, Deserialize)]
pub struct CreateCartRequest {
    pub tenant_id: String,
    pub store_code: String,
    pub terminal_no: i32,
    pub business_date: String,
}

pub async fn create_cart<E: CartEnvironment>(
    State(service): State<Arc<CartService<E>>>,
    Json(req): Json<CreateCartRequest>,
) -> Result<(StatusCode, Json<Cart>), AppError> {
    let business_date = BusinessDate::parse_compact(&req.business_date).ok_or_else(|| {
        AppError::new(
            DomainError::new(ErrorKind::ValidationError, "create_cart", "business_date must be YYYYMMDD"),
            Locale::En,
        )
    })?;

    let cart = Cart::new(
        CartId::new(uuid::Uuid::new_v4().to_string()),
        TenantId::new(req.tenant_id),
        StoreCode::new(req.store_code),
        TerminalNo(req.terminal_no),
        business_date,
        chrono::Utc::now(),
    );
    service.insert(cart.clone()).await;
    Ok((StatusCode::CREATED, Json(cart)))
}

pub async fn get_cart<E: CartEnvironment>(
    State(service): State<Arc<CartService<E>>>,
    Path(cart_id): Path<String>,
) -> Result<Json<Cart>, AppError> {
    let cart = service.get(&CartId::new(cart_id)).await?;
    Ok(Json(cart))
}

/// Request body for `POST /carts/:id/items`.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub item_code: String,
    pub quantity: u32,
}

pub async fn add_item<E: CartEnvironment>(
    State(service): State<Arc<CartService<E>>>,
    Path(cart_id): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<Cart>, AppError> {
    let cart = service
        .dispatch(&CartId::new(cart_id), CartAction::AddItem { item_code: ItemCode::new(req.item_code), quantity: req.quantity })
        .await?;
    Ok(Json(cart))
}

/// Request body for `POST /carts/:id/line-items/:line_no/cancel`.
pub async fn cancel_line_item<E: CartEnvironment>(
    State(service): State<Arc<CartService<E>>>,
    Path((cart_id, line_no)): Path<(String, u32)>,
) -> Result<Json<Cart>, AppError> {
    let cart = service.dispatch(&CartId::new(cart_id), CartAction::CancelLineItem { line_no }).await?;
    Ok(Json(cart))
}

/// Request body for discount endpoints.
#[derive(Debug, Deserialize)]
pub struct AddDiscountRequest {
    pub discount: Discount,
}

pub async fn add_line_discount<E: CartEnvironment>(
    State(service): State<Arc<CartService<E>>>,
    Path((cart_id, line_no)): Path<(String, u32)>,
    Json(req): Json<AddDiscountRequest>,
) -> Result<Json<Cart>, AppError> {
    let cart = service
        .dispatch(&CartId::new(cart_id), CartAction::AddLineDiscount { line_no, discount: req.discount })
        .await?;
    Ok(Json(cart))
}

pub async fn add_cart_discount<E: CartEnvironment>(
    State(service): State<Arc<CartService<E>>>,
    Path(cart_id): Path<String>,
    Json(req): Json<AddDiscountRequest>,
) -> Result<Json<Cart>, AppError> {
    let cart = service.dispatch(&CartId::new(cart_id), CartAction::AddCartDiscount { discount: req.discount }).await?;
    Ok(Json(cart))
}

pub async fn subtotal<E: CartEnvironment>(
    State(service): State<Arc<CartService<E>>>,
    Path(cart_id): Path<String>,
) -> Result<Json<Cart>, AppError> {
    let cart = service.dispatch(&CartId::new(cart_id), CartAction::Subtotal).await?;
    Ok(Json(cart))
}

/// Request body for `POST /carts/:id/payments`.
#[derive(Debug, Deserialize)]
pub struct AddPaymentRequest {
    pub payment_code: String,
    pub description: String,
    pub deposit: i64,
}

pub async fn add_payment<E: CartEnvironment>(
    State(service): State<Arc<CartService<E>>>,
    Path(cart_id): Path<String>,
    Json(req): Json<AddPaymentRequest>,
) -> Result<Json<Cart>, AppError> {
    let cart = service
        .dispatch(
            &CartId::new(cart_id),
            CartAction::AddPayment {
                payment_code: PaymentCode::new(req.payment_code),
                description: req.description,
                deposit: Amount::new(req.deposit),
            },
        )
        .await?;
    Ok(Json(cart))
}

pub async fn resume_item_entry<E: CartEnvironment>(
    State(service): State<Arc<CartService<E>>>,
    Path(cart_id): Path<String>,
) -> Result<Json<Cart>, AppError> {
    let cart = service.dispatch(&CartId::new(cart_id), CartAction::ResumeItemEntry).await?;
    Ok(Json(cart))
}

pub async fn cancel_cart<E: CartEnvironment>(
    State(service): State<Arc<CartService<E>>>,
    Path(cart_id): Path<String>,
) -> Result<Json<Cart>, AppError> {
    let cart = service.dispatch(&CartId::new(cart_id), CartAction::Cancel).await?;
    Ok(Json(cart))
}

/// Response for `POST /carts/:id/bill`: the tranlog if the cart was
/// actually completed, `null` if `Bill` was rejected by the FSM (the cart
/// wasn't in `Paying` with a zero balance).
#[derive(Debug, Serialize)]
pub struct BillResponse {
    pub tranlog: Option<TransactionLog>,
}

pub async fn bill<E: CartEnvironment>(
    State(service): State<Arc<CartService<E>>>,
    Path(cart_id): Path<String>,
) -> Result<Json<BillResponse>, AppError> {
    let settings = crate::settings::TenantSettings::default();
    let tranlog = service.bill(&CartId::new(cart_id), None::<StaffRef>, &settings).await?;
    Ok(Json(BillResponse { tranlog }))
}
