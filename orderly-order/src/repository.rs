use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orderly_shared::Masked;
use uuid::Uuid;

use crate::models::{NewOrder, Order, OrderStatus};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("stored record is malformed: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.status.map_or(true, |status| order.status == status)
    }
}

/// Fields written when a payment completes
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentUpdate {
    pub payment_reference: Masked<String>,
    pub receipt_url: String,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    /// The payment was recorded by this call
    Applied(Order),
    /// The order had already been paid; nothing was written
    AlreadyPaid(Order),
}

impl PaymentOutcome {
    pub fn order(&self) -> &Order {
        match self {
            PaymentOutcome::Applied(order) | PaymentOutcome::AlreadyPaid(order) => order,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            PaymentOutcome::Applied(order) | PaymentOutcome::AlreadyPaid(order) => order,
        }
    }
}

/// Durable storage for orders and their lines. Every method is atomic.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert the order and all of its lines as one unit, status `PENDING`
    async fn create_order_with_lines(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    async fn find_order_with_lines(&self, id: Uuid) -> Result<Option<Order>, RepositoryError>;

    async fn count_orders(&self, filter: &OrderFilter) -> Result<u64, RepositoryError>;

    /// Newest orders first
    async fn list_orders(
        &self,
        filter: &OrderFilter,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// Returns `None` when the order does not exist
    async fn update_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Record a payment and its receipt unless the order is already paid.
    /// Returns `None` when the order does not exist.
    async fn update_order_on_payment(
        &self,
        id: Uuid,
        update: PaymentUpdate,
    ) -> Result<Option<PaymentOutcome>, RepositoryError>;
}
