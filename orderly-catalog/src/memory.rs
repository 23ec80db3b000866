use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use orderly_core::{CatalogClient, CatalogProduct, ClientError, ClientResult};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::product::Product;

/// In-memory catalog for local runs and tests.
///
/// Besides serving products it can be told to fail or stall, which is how
/// callers exercise their catalog-outage paths.
#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<String, Product>>,
    failure: RwLock<Option<ClientError>>,
    delay: RwLock<Option<Duration>>,
    calls: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products
            .into_iter()
            .map(|product| (product.id.clone(), product))
            .collect();

        Self {
            products: RwLock::new(products),
            ..Self::default()
        }
    }

    pub async fn upsert(&self, product: Product) {
        self.products.write().await.insert(product.id.clone(), product);
    }

    pub async fn set_price(&self, id: &str, price: Decimal) {
        if let Some(product) = self.products.write().await.get_mut(id) {
            product.price = price;
        }
    }

    pub async fn rename(&self, id: &str, name: &str) {
        if let Some(product) = self.products.write().await.get_mut(id) {
            product.name = name.to_string();
        }
    }

    /// Make every following call fail with `error` (or succeed again with `None`).
    pub async fn fail_with(&self, error: Option<ClientError>) {
        *self.failure.write().await = error;
    }

    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write().await = delay;
    }

    /// Number of `validate_products` calls served so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogClient for InMemoryCatalog {
    async fn validate_products(&self, ids: &[String]) -> ClientResult<Vec<CatalogProduct>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failure.read().await.clone() {
            return Err(error);
        }

        let products = self.products.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| products.get(id))
            .filter(|product| product.available)
            .cloned()
            .map(CatalogProduct::from)
            .collect())
    }
}
