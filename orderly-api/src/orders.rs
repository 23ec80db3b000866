use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use orderly_core::PaymentSession;
use orderly_order::{
    CreateOrder, CreateOrderLine, OrderPage, OrderStatus, OrderWithProducts, PageRequest,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "order must contain at least one item"), nested)]
    pub items: Vec<CreateOrderItem>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOrderItem {
    #[validate(length(min = 1, message = "product_id must not be empty"))]
    pub product_id: String,
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "quantity must be between 1 and 1000000"
    ))]
    pub quantity: u32,
}

impl From<CreateOrderRequest> for CreateOrder {
    fn from(req: CreateOrderRequest) -> Self {
        CreateOrder {
            items: req
                .items
                .into_iter()
                .map(|item| CreateOrderLine {
                    product_id: item.product_id,
                    quantity: item.quantity,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order: OrderWithProducts,
    pub payment_session: PaymentSession,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListOrdersQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "page must be positive"))]
    pub page: u32,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: u32,
    pub status: Option<OrderStatus>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

impl From<ListOrdersQuery> for PageRequest {
    fn from(query: ListOrdersQuery) -> Self {
        PageRequest {
            page: query.page,
            limit: query.limit,
            status: query.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: OrderStatus,
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/status", patch(change_status))
        .route("/orders/{id}/payment-session", post(create_payment_session))
}

fn order_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    let Path(id) = path.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    Ok(id)
}

/// POST /orders
/// Create an order and open a payment session for it
pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let order = state.orders.create(req.into()).await?;
    // The order stays PENDING if this fails; the client can retry the session alone
    let payment_session = state.payments.create_payment_session(&order).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order,
            payment_session,
        }),
    ))
}

/// GET /orders?page=&limit=&status=
pub async fn list_orders(
    State(state): State<AppState>,
    query: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<Json<OrderPage>, AppError> {
    let Query(query) = query?;
    query.validate()?;

    let page = state.orders.find_all(query.into()).await?;
    Ok(Json(page))
}

/// GET /orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<OrderWithProducts>, AppError> {
    let id = order_id(path)?;
    let order = state.orders.find_one(id).await?;
    Ok(Json(order))
}

/// PATCH /orders/{id}/status
pub async fn change_status(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ChangeStatusRequest>, JsonRejection>,
) -> Result<Json<OrderWithProducts>, AppError> {
    let id = order_id(path)?;
    let Json(req) = payload?;

    let order = state.orders.change_status(id, req.status).await?;
    Ok(Json(order))
}

/// POST /orders/{id}/payment-session
/// Open a fresh payment session for an order that is still unpaid
pub async fn create_payment_session(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<PaymentSession>, AppError> {
    let id = order_id(path)?;
    let order = state.orders.find_one(id).await?;
    let session = state.payments.create_payment_session(&order).await?;
    Ok(Json(session))
}
