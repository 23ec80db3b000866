use uuid::Uuid;

use crate::models::{OrderStatus, TotalsOverflow};
use crate::repository::RepositoryError;

/// Coarse classification callers can branch on without matching messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Payment,
    Infrastructure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Payment => "payment",
            ErrorKind::Infrastructure => "infrastructure",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    /// Bad input or a product the catalog could not vouch for
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order {0} is already paid")]
    AlreadyPaid(Uuid),

    #[error("Order {id} is {status} and can no longer be paid")]
    NotPayable { id: Uuid, status: OrderStatus },

    #[error("Payment gateway failure: {0}")]
    Payment(String),

    #[error("Order storage failure: {0}")]
    Infrastructure(String),
}

impl OrderError {
    pub fn not_found(id: Uuid) -> Self {
        OrderError::NotFound(format!("Order with id: {} not found", id))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::Validation(_) => ErrorKind::Validation,
            OrderError::NotFound(_) => ErrorKind::NotFound,
            OrderError::InvalidTransition { .. }
            | OrderError::AlreadyPaid(_)
            | OrderError::NotPayable { .. } => ErrorKind::Conflict,
            OrderError::Payment(_) => ErrorKind::Payment,
            OrderError::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }
}

impl From<TotalsOverflow> for OrderError {
    fn from(err: TotalsOverflow) -> Self {
        OrderError::Validation(err.to_string())
    }
}

impl From<RepositoryError> for OrderError {
    fn from(err: RepositoryError) -> Self {
        OrderError::Infrastructure(err.to_string())
    }
}
