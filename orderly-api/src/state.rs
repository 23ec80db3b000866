use std::sync::Arc;

use orderly_order::{OrderManager, PaymentOrchestrator};

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderManager>,
    pub payments: Arc<PaymentOrchestrator>,
}

impl AppState {
    pub fn new(orders: Arc<OrderManager>, payments: Arc<PaymentOrchestrator>) -> Self {
        Self { orders, payments }
    }
}
