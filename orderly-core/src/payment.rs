use async_trait::async_trait;
use orderly_shared::Masked;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ClientResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentLineItem {
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSessionRequest {
    pub order_id: Uuid,
    pub currency: String,
    pub items: Vec<PaymentLineItem>,
}

/// Session handle returned by the gateway. Its shape belongs to the gateway
/// and is handed back to callers untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct PaymentSession(pub serde_json::Value);

/// Completion notification delivered by the gateway once a charge succeeds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCompletion {
    pub order_id: Uuid,
    #[serde(alias = "stripePaymentId")]
    pub external_charge_id: Masked<String>,
    pub receipt_url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a checkout session for an order
    async fn create_payment_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> ClientResult<PaymentSession>;
}
