use rust_decimal::Decimal;
use uuid::Uuid;

/// Topic suffixes appended to the configured order topic prefix.
pub const ORDER_CREATED: &str = "created";
pub const ORDER_STATUS_CHANGED: &str = "status_changed";
pub const ORDER_PAID: &str = "paid";

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct OrderCreatedEvent {
    pub order_id: Uuid,
    pub total_amount: Decimal,
    pub total_items: u32,
    pub product_ids: Vec<String>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct OrderStatusChangedEvent {
    pub order_id: Uuid,
    pub from: String,
    pub to: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct OrderPaidEvent {
    pub order_id: Uuid,
    pub payment_reference: crate::Masked<String>,
    pub receipt_url: String,
    pub total_amount: Decimal,
    pub timestamp: i64,
}
