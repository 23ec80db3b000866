use std::collections::HashMap;
use std::time::Duration;

use orderly_core::{with_timeout, CatalogClient, CatalogProduct};
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::OrderError;
use crate::models::{Order, OrderLineView, OrderWithProducts};

/// Products returned by one catalog call, indexed by id.
///
/// Construction fails unless every requested id was resolved, so lookups on
/// a snapshot built for a set of ids never miss.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    products: HashMap<String, CatalogProduct>,
}

impl CatalogSnapshot {
    pub async fn fetch(
        catalog: &dyn CatalogClient,
        ids: &[String],
        timeout: Duration,
    ) -> Result<Self, OrderError> {
        let products = with_timeout("catalog", timeout, catalog.validate_products(ids))
            .await
            .map_err(|e| {
                warn!(error = %e, "Catalog validation failed");
                OrderError::Validation(e.to_string())
            })?;

        Self::from_products(products, ids)
    }

    pub fn from_products(products: Vec<CatalogProduct>, ids: &[String]) -> Result<Self, OrderError> {
        let products: HashMap<_, _> = products
            .into_iter()
            .map(|product| (product.id.clone(), product))
            .collect();

        let missing: Vec<&str> = ids
            .iter()
            .filter(|id| !products.contains_key(*id))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            warn!(?missing, "Catalog did not resolve every product");
            return Err(OrderError::Validation(format!(
                "Some products were not found: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { products })
    }

    pub fn price_of(&self, id: &str) -> Option<Decimal> {
        self.products.get(id).map(|p| p.price)
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.products.get(id).map(|p| p.name.as_str())
    }

    /// Join current product names onto the stored lines. Prices stay the
    /// ones frozen on the order.
    pub fn enrich(&self, order: Order) -> Result<OrderWithProducts, OrderError> {
        let lines = order
            .lines
            .into_iter()
            .map(|line| {
                let name = self.name_of(&line.product_id).ok_or_else(|| {
                    OrderError::Validation(format!("Product {} not found", line.product_id))
                })?;
                Ok(OrderLineView {
                    name: name.to_string(),
                    product_id: line.product_id,
                    price: line.price,
                    quantity: line.quantity,
                })
            })
            .collect::<Result<Vec<_>, OrderError>>()?;

        Ok(OrderWithProducts {
            id: order.id,
            total_amount: order.total_amount,
            total_items: order.total_items,
            status: order.status,
            paid: order.paid,
            paid_at: order.paid_at,
            payment_reference: order.payment_reference,
            lines,
            receipt: order.receipt,
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn product(id: &str, name: &str, price: i64) -> CatalogProduct {
        CatalogProduct {
            id: id.to_string(),
            name: name.to_string(),
            price: Decimal::from(price),
        }
    }

    #[test]
    fn test_missing_ids_are_reported() {
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let err = CatalogSnapshot::from_products(vec![product("a", "Alpha", 1)], &ids).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "Some products were not found: b, c");
    }

    #[test]
    fn test_lookups() {
        let ids = vec!["a".to_string()];
        let snapshot = CatalogSnapshot::from_products(vec![product("a", "Alpha", 7)], &ids).unwrap();

        assert_eq!(snapshot.price_of("a"), Some(Decimal::from(7)));
        assert_eq!(snapshot.name_of("a"), Some("Alpha"));
        assert_eq!(snapshot.name_of("z"), None);
    }
}
