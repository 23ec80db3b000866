use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ClientResult;

/// Authoritative product data as returned by the catalog service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogProduct {
    pub id: String,
    pub name: String,
    pub price: Decimal,
}

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Resolve a batch of product ids in a single round trip.
    ///
    /// Implementations return the products they know about; ids the catalog
    /// cannot resolve are simply absent from the result and the caller decides
    /// what a missing id means.
    async fn validate_products(&self, ids: &[String]) -> ClientResult<Vec<CatalogProduct>>;
}
