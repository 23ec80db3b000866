use async_trait::async_trait;
use tracing::debug;

use crate::ClientResult;

/// Outbound side of the event bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> ClientResult<()>;
}

/// Publisher used when no broker is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, topic: &str, key: &str, _payload: &str) -> ClientResult<()> {
        debug!(topic, key, "Event bus disabled, dropping event");
        Ok(())
    }
}
