use std::sync::Arc;
use std::time::Duration;

use orderly_core::PaymentCompletion;
use orderly_order::{ErrorKind, OrderManager, PaymentOutcome};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Backoff applied while the order store keeps failing
#[derive(Debug, Clone, Copy)]
pub struct RetryBackoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(200),
            max: Duration::from_secs(10),
        }
    }
}

/// Consume payment completions from the bus and apply them to orders.
///
/// Offsets are committed only once a message is applied or known to be
/// unprocessable. Returns only if the consumer cannot be created or subscribed.
pub async fn start_payment_worker(
    brokers: String,
    group_id: String,
    topic: String,
    orders: Arc<OrderManager>,
) -> Result<(), KafkaError> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &brokers)
        .set("group.id", &group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .create()?;

    consumer.subscribe(&[topic.as_str()])?;

    info!("Payment worker started, listening to {}...", topic);

    loop {
        match consumer.recv().await {
            Err(e) => error!("Kafka error: {}", e),
            Ok(m) => {
                match m.payload_view::<str>() {
                    Some(Ok(payload)) => {
                        if let Err(e) =
                            apply_with_retry(&orders, payload, RetryBackoff::default()).await
                        {
                            error!("Dropping payment message: {}", e);
                        }
                    }
                    Some(Err(e)) => error!("Error reading payload: {}", e),
                    None => warn!("Skipping payment message without payload"),
                }

                if let Err(e) = consumer.commit_message(&m, CommitMode::Async) {
                    error!("Failed to commit payment message offset: {}", e);
                }
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentMessageError {
    #[error("malformed payment message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Order(#[from] orderly_order::OrderError),
}

impl PaymentMessageError {
    /// Storage failures may clear up; everything else will fail the same way again
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentMessageError::Order(e) if e.kind() == ErrorKind::Infrastructure)
    }
}

/// Apply one raw payment completion message
pub async fn handle_payment_message(
    orders: &OrderManager,
    payload: &str,
) -> Result<PaymentOutcome, PaymentMessageError> {
    let completion: PaymentCompletion = serde_json::from_str(payload)?;
    info!("Processing payment completion for order {}", completion.order_id);
    Ok(orders.paid_order(completion).await?)
}

/// Apply a message, retrying with backoff for as long as the failure is
/// retryable. Non-retryable failures are returned for the caller to skip.
pub async fn apply_with_retry(
    orders: &OrderManager,
    payload: &str,
    backoff: RetryBackoff,
) -> Result<PaymentOutcome, PaymentMessageError> {
    let mut delay = backoff.initial;
    loop {
        match handle_payment_message(orders, payload).await {
            Err(e) if e.is_retryable() => {
                warn!("Payment completion failed, retrying in {:?}: {}", delay, e);
                sleep(delay).await;
                delay = (delay * 2).min(backoff.max);
            }
            result => return result,
        }
    }
}
