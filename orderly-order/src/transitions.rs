use serde::Deserialize;

use crate::models::OrderStatus;

/// Decides which status changes `change_status` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusPolicy {
    /// Forward-only: PENDING -> {PAID, CANCELLED}, PAID -> {DELIVERED}
    #[default]
    Strict,
    /// Any status may follow any other
    Permissive,
}

impl OrderStatus {
    /// Statuses reachable in one step under the strict policy
    pub fn next_states(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Paid, OrderStatus::Cancelled],
            OrderStatus::Paid => &[OrderStatus::Delivered],
            OrderStatus::Delivered | OrderStatus::Cancelled => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next_states().is_empty()
    }
}

impl StatusPolicy {
    pub fn allows(&self, from: OrderStatus, to: OrderStatus) -> bool {
        if from == to {
            return true;
        }
        match self {
            StatusPolicy::Strict => from.next_states().contains(&to),
            StatusPolicy::Permissive => true,
        }
    }
}
