use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orderly_core::{
    with_timeout, ClientError, ClientResult, PaymentGateway, PaymentLineItem, PaymentSession,
    PaymentSessionRequest,
};
use tokio::sync::RwLock;
use tracing::{error, info, instrument};

use crate::error::OrderError;
use crate::models::{OrderStatus, OrderWithProducts};

pub const DEFAULT_CURRENCY: &str = "usd";

pub struct PaymentOrchestrator {
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
    timeout: Duration,
}

impl PaymentOrchestrator {
    pub fn new(gateway: Arc<dyn PaymentGateway>, currency: impl Into<String>, timeout: Duration) -> Self {
        Self {
            gateway,
            currency: currency.into(),
            timeout,
        }
    }

    /// Ask the gateway for a checkout session covering the order's lines.
    ///
    /// The order itself is not touched; it stays `PENDING` until the gateway
    /// reports completion.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn create_payment_session(
        &self,
        order: &OrderWithProducts,
    ) -> Result<PaymentSession, OrderError> {
        if order.paid {
            return Err(OrderError::AlreadyPaid(order.id));
        }
        if order.status != OrderStatus::Pending {
            return Err(OrderError::NotPayable {
                id: order.id,
                status: order.status,
            });
        }

        let request = PaymentSessionRequest {
            order_id: order.id,
            currency: self.currency.clone(),
            items: order
                .lines
                .iter()
                .map(|line| PaymentLineItem {
                    name: line.name.clone(),
                    price: line.price,
                    quantity: line.quantity,
                })
                .collect(),
        };

        let session = with_timeout(
            "payment",
            self.timeout,
            self.gateway.create_payment_session(&request),
        )
        .await
        .map_err(|e| {
            error!(error = %e, "Payment session creation failed");
            OrderError::Payment(e.to_string())
        })?;

        info!("Payment session created");
        Ok(session)
    }
}

/// Gateway stand-in for local runs and tests. Records every request it sees.
#[derive(Default)]
pub struct MockPaymentGateway {
    requests: RwLock<Vec<PaymentSessionRequest>>,
    failure: RwLock<Option<ClientError>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_with(&self, error: Option<ClientError>) {
        *self.failure.write().await = error;
    }

    pub async fn requests(&self) -> Vec<PaymentSessionRequest> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_payment_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> ClientResult<PaymentSession> {
        self.requests.write().await.push(request.clone());

        if let Some(error) = self.failure.read().await.clone() {
            return Err(error);
        }

        let amount_total: rust_decimal::Decimal = request
            .items
            .iter()
            .map(|item| item.price * rust_decimal::Decimal::from(item.quantity))
            .sum();

        Ok(PaymentSession(serde_json::json!({
            "id": format!("cs_mock_{}", request.order_id.simple()),
            "orderId": request.order_id,
            "currency": request.currency,
            "amountTotal": amount_total,
            "url": format!("https://checkout.mock/pay/{}", request.order_id.simple()),
        })))
    }
}
