use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use orderly_core::PaymentCompletion;
use orderly_order::{Order, PaymentOutcome};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PaymentWebhookResponse {
    pub order: Order,
    /// True when the order had already been paid and nothing was written
    pub duplicate: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/webhooks/payments", post(handle_payment_webhook))
}

/// POST /webhooks/payments
/// Receive a payment completion from the payment gateway
pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    payload: Result<Json<PaymentCompletion>, JsonRejection>,
) -> Result<Json<PaymentWebhookResponse>, AppError> {
    let Json(completion) = payload?;
    tracing::info!("Received payment completion for order {}", completion.order_id);

    let outcome = state.orders.paid_order(completion).await?;
    let duplicate = matches!(outcome, PaymentOutcome::AlreadyPaid(_));

    Ok(Json(PaymentWebhookResponse {
        order: outcome.into_order(),
        duplicate,
    }))
}
