use std::time::Duration;

use async_trait::async_trait;
use orderly_core::{CatalogClient, CatalogProduct, ClientError, ClientResult};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::product::Product;

const SERVICE: &str = "catalog";

#[derive(Serialize)]
struct ValidateProductsRequest<'a> {
    ids: &'a [String],
}

/// Catalog client speaking JSON over HTTP to the products service.
#[derive(Clone)]
pub struct HttpCatalogClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpCatalogClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport {
                service: SERVICE,
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    #[instrument(skip(self), fields(count = ids.len()))]
    async fn validate_products(&self, ids: &[String]) -> ClientResult<Vec<CatalogProduct>> {
        let url = format!("{}/products/validate", self.base_url);
        debug!(%url, "Validating products");

        let response = self
            .http
            .post(&url)
            .json(&ValidateProductsRequest { ids })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::Timeout {
                        service: SERVICE,
                        after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    }
                } else {
                    ClientError::Transport {
                        service: SERVICE,
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        let products: Vec<Product> = response.json().await.map_err(|e| ClientError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;

        Ok(products
            .into_iter()
            .filter(|product| product.available)
            .map(CatalogProduct::from)
            .collect())
    }
}
