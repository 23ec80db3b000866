use std::time::Duration;

use async_trait::async_trait;
use orderly_core::{ClientError, ClientResult, PaymentGateway, PaymentSession, PaymentSessionRequest};
use tracing::{debug, instrument};

const SERVICE: &str = "payment";

fn send_error(e: reqwest::Error, timeout: Duration) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout {
            service: SERVICE,
            after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else {
        ClientError::Transport {
            service: SERVICE,
            message: e.to_string(),
        }
    }
}

/// Payment gateway reached over HTTP (the payments service fronting Stripe).
#[derive(Clone)]
pub struct HttpPaymentGateway {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpPaymentGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport {
                service: SERVICE,
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_payment_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> ClientResult<PaymentSession> {
        let url = format!("{}/payments/create-payment-session", self.base_url);
        debug!(%url, items = request.items.len(), "Requesting payment session");

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        let session = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ClientError::Decode {
                service: SERVICE,
                message: e.to_string(),
            })?;

        Ok(PaymentSession(session))
    }
}
