use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use orderly_shared::Masked;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown order status '{0}', possible values are PENDING, PAID, DELIVERED, CANCELLED")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// The authoritative record of a customer purchase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub total_amount: Decimal,
    pub total_items: u32,
    pub status: OrderStatus,
    pub paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_reference: Option<Masked<String>>,
    pub lines: Vec<OrderLine>,
    pub receipt: Option<Receipt>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Materialize a freshly persisted order. Used by repositories that
    /// assign the identity themselves.
    pub fn from_new(id: Uuid, new_order: NewOrder) -> Self {
        let now = Utc::now();
        Self {
            id,
            total_amount: new_order.total_amount,
            total_items: new_order.total_items,
            status: OrderStatus::Pending,
            paid: false,
            paid_at: None,
            payment_reference: None,
            lines: new_order
                .lines
                .into_iter()
                .map(|line| OrderLine {
                    id: Uuid::new_v4(),
                    product_id: line.product_id,
                    quantity: line.quantity,
                    price: line.price,
                })
                .collect(),
            receipt: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Distinct product ids referenced by the lines, first occurrence first
    pub fn product_ids(&self) -> Vec<String> {
        distinct_product_ids(self.lines.iter().map(|line| line.product_id.as_str()))
    }
}

/// A product line within an order. The price is a snapshot taken when the
/// order was created and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    pub id: Uuid,
    pub product_id: String,
    pub quantity: u32,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Receipt {
    pub id: Uuid,
    pub receipt_url: String,
    pub created_at: DateTime<Utc>,
}

/// Order as handed to the repository for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub total_amount: Decimal,
    pub total_items: u32,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    pub fn from_lines(lines: Vec<NewOrderLine>) -> Result<Self, TotalsOverflow> {
        let totals = OrderTotals::from_lines(&lines)?;
        Ok(Self {
            total_amount: totals.total_amount,
            total_items: totals.total_items,
            lines,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderLine {
    pub product_id: String,
    pub quantity: u32,
    pub price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderTotals {
    pub total_amount: Decimal,
    pub total_items: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Order totals exceed the supported range")]
pub struct TotalsOverflow;

impl OrderTotals {
    /// Running sum over every line. Fails instead of wrapping.
    pub fn from_lines(lines: &[NewOrderLine]) -> Result<Self, TotalsOverflow> {
        lines.iter().try_fold(Self::default(), |acc, line| {
            let subtotal = line
                .price
                .checked_mul(Decimal::from(line.quantity))
                .ok_or(TotalsOverflow)?;
            Ok(Self {
                total_amount: acc.total_amount.checked_add(subtotal).ok_or(TotalsOverflow)?,
                total_items: acc.total_items.checked_add(line.quantity).ok_or(TotalsOverflow)?,
            })
        })
    }
}

/// Inbound request to place an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateOrder {
    pub items: Vec<CreateOrderLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateOrderLine {
    pub product_id: String,
    pub quantity: u32,
}

/// Order line joined with the product name from the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLineView {
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

/// Order enriched with catalog product names
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderWithProducts {
    pub id: Uuid,
    pub total_amount: Decimal,
    pub total_items: u32,
    pub status: OrderStatus,
    pub paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_reference: Option<Masked<String>>,
    pub lines: Vec<OrderLineView>,
    pub receipt: Option<Receipt>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
    pub status: Option<OrderStatus>,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub last_page: u64,
}

impl PageMeta {
    pub fn new(total: u64, page: u32, limit: u32) -> Self {
        Self {
            total,
            page,
            last_page: total.div_ceil(u64::from(limit.max(1))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderPage {
    pub data: Vec<Order>,
    pub meta: PageMeta,
}

pub(crate) fn distinct_product_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}
