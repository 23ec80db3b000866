use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use orderly_core::{CatalogClient, EventPublisher, PaymentCompletion};
use orderly_shared::models::events::{
    OrderCreatedEvent, OrderPaidEvent, OrderStatusChangedEvent, ORDER_CREATED, ORDER_PAID,
    ORDER_STATUS_CHANGED,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::OrderError;
use crate::locks::OrderLocks;
use crate::models::{
    distinct_product_ids, CreateOrder, NewOrder, NewOrderLine, Order, OrderPage, OrderStatus,
    OrderWithProducts, PageMeta, PageRequest,
};
use crate::repository::{OrderFilter, OrderRepository, PaymentOutcome, PaymentUpdate};
use crate::snapshot::CatalogSnapshot;
use crate::transitions::StatusPolicy;

#[derive(Debug, Clone)]
pub struct OrderManagerConfig {
    pub catalog_timeout: Duration,
    pub status_policy: StatusPolicy,
    pub order_topic_prefix: String,
}

impl Default for OrderManagerConfig {
    fn default() -> Self {
        Self {
            catalog_timeout: Duration::from_secs(5),
            status_policy: StatusPolicy::Strict,
            order_topic_prefix: "orders".to_string(),
        }
    }
}

/// Drives an order through its lifecycle: creation against the catalog,
/// enriched lookups, paging, status changes and payment completion.
pub struct OrderManager {
    repo: Arc<dyn OrderRepository>,
    catalog: Arc<dyn CatalogClient>,
    events: Arc<dyn EventPublisher>,
    locks: OrderLocks,
    config: OrderManagerConfig,
}

impl OrderManager {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        catalog: Arc<dyn CatalogClient>,
        events: Arc<dyn EventPublisher>,
        config: OrderManagerConfig,
    ) -> Self {
        Self {
            repo,
            catalog,
            events,
            locks: OrderLocks::new(),
            config,
        }
    }

    pub fn status_policy(&self) -> StatusPolicy {
        self.config.status_policy
    }

    /// Create an order priced from the catalog.
    ///
    /// Nothing is persisted unless every product resolves. The returned order
    /// carries product names from the same catalog response used for pricing.
    #[instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn create(&self, request: CreateOrder) -> Result<OrderWithProducts, OrderError> {
        if request.items.is_empty() {
            return Err(OrderError::Validation(
                "Order must contain at least one item".to_string(),
            ));
        }
        if let Some(item) = request.items.iter().find(|item| item.quantity == 0) {
            return Err(OrderError::Validation(format!(
                "Quantity for product {} must be positive",
                item.product_id
            )));
        }

        let product_ids =
            distinct_product_ids(request.items.iter().map(|item| item.product_id.as_str()));
        let snapshot =
            CatalogSnapshot::fetch(self.catalog.as_ref(), &product_ids, self.config.catalog_timeout)
                .await?;

        let lines = request
            .items
            .into_iter()
            .map(|item| {
                let price = snapshot.price_of(&item.product_id).ok_or_else(|| {
                    OrderError::Validation(format!("Product {} not found", item.product_id))
                })?;
                Ok(NewOrderLine {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price,
                })
            })
            .collect::<Result<Vec<_>, OrderError>>()?;

        let order = self
            .repo
            .create_order_with_lines(NewOrder::from_lines(lines)?)
            .await?;

        info!(
            order_id = %order.id,
            total_amount = %order.total_amount,
            total_items = order.total_items,
            "Order created"
        );

        self.publish(
            ORDER_CREATED,
            order.id,
            &OrderCreatedEvent {
                order_id: order.id,
                total_amount: order.total_amount,
                total_items: order.total_items,
                product_ids,
                timestamp: Utc::now().timestamp(),
            },
        )
        .await;

        snapshot.enrich(order)
    }

    /// Fetch an order with current product names
    #[instrument(skip(self))]
    pub async fn find_one(&self, id: Uuid) -> Result<OrderWithProducts, OrderError> {
        let (order, snapshot) = self.load(id).await?;
        snapshot.enrich(order)
    }

    #[instrument(skip(self))]
    pub async fn find_all(&self, request: PageRequest) -> Result<OrderPage, OrderError> {
        if request.page == 0 || request.limit == 0 {
            return Err(OrderError::Validation(
                "page and limit must be positive".to_string(),
            ));
        }

        let filter = OrderFilter {
            status: request.status,
        };
        let total = self.repo.count_orders(&filter).await?;
        let data = self
            .repo
            .list_orders(&filter, request.offset(), request.limit)
            .await?;

        Ok(OrderPage {
            data,
            meta: PageMeta::new(total, request.page, request.limit),
        })
    }

    /// Move an order to `status`.
    ///
    /// Requesting the current status is a no-op returning the lookup result.
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<OrderWithProducts, OrderError> {
        let _guard = self.locks.acquire(id).await;
        let (order, snapshot) = self.load(id).await?;

        let from = order.status;
        if from == status {
            return snapshot.enrich(order);
        }

        if !self.config.status_policy.allows(from, status) {
            warn!(order_id = %id, %from, to = %status, "Rejected status transition");
            return Err(OrderError::InvalidTransition { from, to: status });
        }

        let updated = self
            .repo
            .update_order_status(id, status)
            .await?
            .ok_or_else(|| OrderError::not_found(id))?;

        info!(order_id = %id, %from, to = %status, "Order status changed");

        self.publish(
            ORDER_STATUS_CHANGED,
            id,
            &OrderStatusChangedEvent {
                order_id: id,
                from: from.to_string(),
                to: status.to_string(),
                timestamp: Utc::now().timestamp(),
            },
        )
        .await;

        snapshot.enrich(updated)
    }

    /// Apply a payment completion reported by the gateway.
    ///
    /// Only the first notification for an order is written; later duplicates
    /// return the stored record as `AlreadyPaid`. Orders the status policy
    /// does not let move to `PAID` (a cancelled order under the strict
    /// policy) are refused with `NotPayable`.
    #[instrument(skip(self, completion), fields(order_id = %completion.order_id))]
    pub async fn paid_order(&self, completion: PaymentCompletion) -> Result<PaymentOutcome, OrderError> {
        let id = completion.order_id;
        let _guard = self.locks.acquire(id).await;

        let current = self
            .repo
            .find_order_with_lines(id)
            .await?
            .ok_or_else(|| OrderError::not_found(id))?;
        if current.paid {
            info!(order_id = %id, "Duplicate payment notification ignored");
            return Ok(PaymentOutcome::AlreadyPaid(current));
        }
        if !self.config.status_policy.allows(current.status, OrderStatus::Paid) {
            warn!(order_id = %id, status = %current.status, "Payment completion for an order that cannot be paid");
            return Err(OrderError::NotPayable {
                id,
                status: current.status,
            });
        }

        let update = PaymentUpdate {
            payment_reference: completion.external_charge_id,
            receipt_url: completion.receipt_url,
            paid_at: Utc::now(),
        };

        let outcome = self
            .repo
            .update_order_on_payment(id, update)
            .await?
            .ok_or_else(|| OrderError::not_found(id))?;

        match &outcome {
            PaymentOutcome::Applied(order) => {
                info!(order_id = %id, "Order marked as PAID");
                self.publish(
                    ORDER_PAID,
                    id,
                    &OrderPaidEvent {
                        order_id: id,
                        payment_reference: order.payment_reference.clone().unwrap_or_default(),
                        receipt_url: order
                            .receipt
                            .as_ref()
                            .map(|r| r.receipt_url.clone())
                            .unwrap_or_default(),
                        total_amount: order.total_amount,
                        timestamp: Utc::now().timestamp(),
                    },
                )
                .await;
            }
            PaymentOutcome::AlreadyPaid(_) => {
                info!(order_id = %id, "Duplicate payment notification ignored");
            }
        }

        Ok(outcome)
    }

    async fn load(&self, id: Uuid) -> Result<(Order, CatalogSnapshot), OrderError> {
        let order = self
            .repo
            .find_order_with_lines(id)
            .await?
            .ok_or_else(|| OrderError::not_found(id))?;

        let snapshot = CatalogSnapshot::fetch(
            self.catalog.as_ref(),
            &order.product_ids(),
            self.config.catalog_timeout,
        )
        .await?;

        Ok((order, snapshot))
    }

    /// Best effort: a failed publish never fails the operation that caused it.
    async fn publish<T: Serialize>(&self, suffix: &str, key: Uuid, event: &T) {
        let topic = format!("{}.{}", self.config.order_topic_prefix, suffix);
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%topic, error = %e, "Failed to serialize event");
                return;
            }
        };

        if let Err(e) = self.events.publish(&topic, &key.to_string(), &payload).await {
            warn!(%topic, error = %e, "Failed to publish event");
        }
    }
}
