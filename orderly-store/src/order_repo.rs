use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orderly_order::{
    NewOrder, Order, OrderFilter, OrderLine, OrderRepository, OrderStatus, PaymentOutcome,
    PaymentUpdate, Receipt, RepositoryError,
};
use orderly_shared::Masked;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ORDER_COLUMNS: &str = r#"
    o.id, o.total_amount, o.total_items, o.status, o.paid, o.paid_at,
    o.payment_reference, o.created_at, o.updated_at,
    r.id AS receipt_id, r.receipt_url, r.created_at AS receipt_created_at
"#;

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    total_amount: Decimal,
    total_items: i32,
    status: String,
    paid: bool,
    paid_at: Option<DateTime<Utc>>,
    payment_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    receipt_id: Option<Uuid>,
    receipt_url: Option<String>,
    receipt_created_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: String,
    quantity: i32,
    price: Decimal,
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Backend(e.to_string())
}

fn to_count(value: i32, field: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::Corrupt(format!("negative {} in storage: {}", field, value)))
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItemRow>) -> Result<Order, RepositoryError> {
        let status: OrderStatus = self
            .status
            .parse()
            .map_err(|e: orderly_order::models::UnknownStatus| RepositoryError::Corrupt(e.to_string()))?;

        let lines = items
            .into_iter()
            .map(|item| {
                Ok(OrderLine {
                    id: item.id,
                    product_id: item.product_id,
                    quantity: to_count(item.quantity, "quantity")?,
                    price: item.price,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        let receipt = match (self.receipt_id, self.receipt_url, self.receipt_created_at) {
            (Some(id), Some(receipt_url), Some(created_at)) => Some(Receipt {
                id,
                receipt_url,
                created_at,
            }),
            _ => None,
        };

        Ok(Order {
            id: self.id,
            total_amount: self.total_amount,
            total_items: to_count(self.total_items, "total_items")?,
            status,
            paid: self.paid,
            paid_at: self.paid_at,
            payment_reference: self.payment_reference.map(Masked::from),
            lines,
            receipt,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PgOrderRepository {
    async fn fetch_one<'e, E>(executor: E, id: Uuid) -> Result<Option<OrderRow>, RepositoryError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let sql = format!(
            "SELECT {} FROM orders o LEFT JOIN order_receipts r ON r.order_id = o.id WHERE o.id = $1",
            ORDER_COLUMNS
        );
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(db_err)
    }

    /// Attach lines to each order row, keeping the rows' order
    async fn hydrate<'e, E>(executor: E, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let items = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT id, order_id, product_id, quantity, price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(executor)
        .await
        .map_err(db_err)?;

        let mut by_order: HashMap<Uuid, Vec<OrderItemRow>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }

        rows.into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }

    async fn load_in(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Order>, RepositoryError> {
        let Some(row) = Self::fetch_one(&mut **tx, id).await? else {
            return Ok(None);
        };
        let mut orders = Self::hydrate(&mut **tx, vec![row]).await?;
        Ok(orders.pop())
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    #[instrument(skip(self, order), fields(lines = order.lines.len()))]
    async fn create_order_with_lines(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let order = Order::from_new(Uuid::new_v4(), order);
        let total_items = i32::try_from(order.total_items)
            .map_err(|_| RepositoryError::Backend("total_items out of range".to_string()))?;

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, total_amount, total_items, status, paid, created_at, updated_at)
            VALUES ($1, $2, $3, $4, FALSE, $5, $6)
            "#,
        )
        .bind(order.id)
        .bind(order.total_amount)
        .bind(total_items)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for (position, line) in order.lines.iter().enumerate() {
            let quantity = i32::try_from(line.quantity)
                .map_err(|_| RepositoryError::Backend("quantity out of range".to_string()))?;
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, position, product_id, quantity, price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(line.id)
            .bind(order.id)
            .bind(position as i32)
            .bind(&line.product_id)
            .bind(quantity)
            .bind(line.price)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        // Hand back what the database holds, not the in-memory draft
        let stored = Self::load_in(&mut tx, order.id).await?.ok_or_else(|| {
            RepositoryError::Corrupt(format!("order {} vanished after insert", order.id))
        })?;
        tx.commit().await.map_err(db_err)?;
        debug!(order_id = %stored.id, "Order persisted");
        Ok(stored)
    }

    async fn find_order_with_lines(&self, id: Uuid) -> Result<Option<Order>, RepositoryError> {
        let Some(row) = Self::fetch_one(&self.pool, id).await? else {
            return Ok(None);
        };
        let mut orders = Self::hydrate(&self.pool, vec![row]).await?;
        Ok(orders.pop())
    }

    async fn count_orders(&self, filter: &OrderFilter) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(count.max(0) as u64)
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM orders o
            LEFT JOIN order_receipts r ON r.order_id = o.id
            WHERE ($1::TEXT IS NULL OR o.status = $1)
            ORDER BY o.created_at DESC, o.id DESC
            OFFSET $2 LIMIT $3
            "#,
            ORDER_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Self::hydrate(&self.pool, rows).await
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let order = Self::load_in(&mut tx, id).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(order)
    }

    #[instrument(skip(self, update))]
    async fn update_order_on_payment(
        &self,
        id: Uuid,
        update: PaymentUpdate,
    ) -> Result<Option<PaymentOutcome>, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Only an unpaid order is written; a concurrent second payment falls through
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'PAID', paid = TRUE, paid_at = $2, payment_reference = $3, updated_at = NOW()
            WHERE id = $1 AND paid = FALSE
            "#,
        )
        .bind(id)
        .bind(update.paid_at)
        .bind(update.payment_reference.as_inner())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let applied = result.rows_affected() == 1;
        if applied {
            sqlx::query(
                r#"
                INSERT INTO order_receipts (id, order_id, receipt_url, created_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(&update.receipt_url)
            .bind(update.paid_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        let order = Self::load_in(&mut tx, id).await?;
        tx.commit().await.map_err(db_err)?;

        Ok(order.map(|order| {
            if applied {
                PaymentOutcome::Applied(order)
            } else {
                PaymentOutcome::AlreadyPaid(order)
            }
        }))
    }
}
