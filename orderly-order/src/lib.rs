pub mod models;
pub mod error;
pub mod repository;
pub mod memory;
pub mod snapshot;
pub mod transitions;
pub mod locks;
pub mod manager;
pub mod orchestrator;
pub mod gateway;

pub use models::{
    CreateOrder, CreateOrderLine, NewOrder, NewOrderLine, Order, OrderLine, OrderLineView,
    OrderPage, OrderStatus, OrderTotals, OrderWithProducts, PageMeta, PageRequest, Receipt,
    TotalsOverflow,
};
pub use error::{ErrorKind, OrderError};
pub use repository::{OrderFilter, OrderRepository, PaymentOutcome, PaymentUpdate, RepositoryError};
pub use memory::InMemoryOrderRepository;
pub use transitions::StatusPolicy;
pub use locks::OrderLocks;
pub use manager::{OrderManager, OrderManagerConfig};
pub use orchestrator::{MockPaymentGateway, PaymentOrchestrator};
pub use gateway::HttpPaymentGateway;
