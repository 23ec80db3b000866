pub mod events;

pub use events::{OrderCreatedEvent, OrderPaidEvent, OrderStatusChangedEvent};
