use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{NewOrder, Order, OrderStatus, Receipt};
use crate::repository::{
    OrderFilter, OrderRepository, PaymentOutcome, PaymentUpdate, RepositoryError,
};

/// In-memory order store, used when no database is configured and in tests.
///
/// Orders are kept in insertion order; every accepted write bumps a counter
/// so tests can assert that an operation did not touch the store.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<Vec<Order>>,
    writes: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes applied so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }

    /// Simulate a storage outage: every call fails until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Backend("in-memory store is unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create_order_with_lines(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        self.check_available()?;
        let order = Order::from_new(Uuid::new_v4(), order);
        self.orders.write().await.push(order.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(order)
    }

    async fn find_order_with_lines(&self, id: Uuid) -> Result<Option<Order>, RepositoryError> {
        self.check_available()?;
        Ok(self.orders.read().await.iter().find(|o| o.id == id).cloned())
    }

    async fn count_orders(&self, filter: &OrderFilter) -> Result<u64, RepositoryError> {
        self.check_available()?;
        let orders = self.orders.read().await;
        Ok(orders.iter().filter(|o| filter.matches(o)).count() as u64)
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Order>, RepositoryError> {
        self.check_available()?;
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let orders = self.orders.read().await;
        Ok(orders
            .iter()
            .rev()
            .filter(|o| filter.matches(o))
            .skip(offset)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        self.check_available()?;
        let mut orders = self.orders.write().await;
        let Some(order) = orders.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };

        order.update_status(status);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(Some(order.clone()))
    }

    async fn update_order_on_payment(
        &self,
        id: Uuid,
        update: PaymentUpdate,
    ) -> Result<Option<PaymentOutcome>, RepositoryError> {
        self.check_available()?;
        let mut orders = self.orders.write().await;
        let Some(order) = orders.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };

        if order.paid {
            return Ok(Some(PaymentOutcome::AlreadyPaid(order.clone())));
        }

        order.status = OrderStatus::Paid;
        order.paid = true;
        order.paid_at = Some(update.paid_at);
        order.payment_reference = Some(update.payment_reference);
        order.receipt = Some(Receipt {
            id: Uuid::new_v4(),
            receipt_url: update.receipt_url,
            created_at: update.paid_at,
        });
        order.updated_at = Utc::now();
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(Some(PaymentOutcome::Applied(order.clone())))
    }
}
