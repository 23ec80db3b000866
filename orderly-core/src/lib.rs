pub mod catalog;
pub mod events;
pub mod payment;
pub mod resilience;

pub use catalog::{CatalogClient, CatalogProduct};
pub use events::{EventPublisher, NoopPublisher};
pub use payment::{PaymentCompletion, PaymentGateway, PaymentLineItem, PaymentSession, PaymentSessionRequest};
pub use resilience::with_timeout;

/// Failure of a call to a peer service (catalog, payment gateway, event bus).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("{service} did not respond within {after_ms}ms")]
    Timeout { service: &'static str, after_ms: u64 },
    #[error("{service} transport error: {message}")]
    Transport { service: &'static str, message: String },
    #[error("{service} rejected the request ({status}): {message}")]
    Rejected {
        service: &'static str,
        status: u16,
        message: String,
    },
    #[error("{service} returned an unreadable response: {message}")]
    Decode { service: &'static str, message: String },
}

impl ClientError {
    pub fn service(&self) -> &'static str {
        match self {
            ClientError::Timeout { service, .. }
            | ClientError::Transport { service, .. }
            | ClientError::Rejected { service, .. }
            | ClientError::Decode { service, .. } => service,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
