use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use orderly_api::{app, worker, AppState};
use orderly_catalog::{HttpCatalogClient, InMemoryCatalog};
use orderly_core::{CatalogClient, EventPublisher, NoopPublisher, PaymentGateway};
use orderly_order::{
    HttpPaymentGateway, InMemoryOrderRepository, MockPaymentGateway, OrderManager,
    OrderManagerConfig, OrderRepository, PaymentOrchestrator,
};
use orderly_store::{Config, DbClient, EventProducer, PgOrderRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "orderly_api=debug,orderly_order=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Orderly API on port {}", config.server.port);

    // Order store
    let repo: Arc<dyn OrderRepository> = match DbClient::connect(&config.database)
        .await
        .context("Failed to connect to Postgres")?
    {
        Some(db) => {
            db.migrate().await.context("Failed to run migrations")?;
            Arc::new(PgOrderRepository::new(db.pool.clone()))
        }
        None => {
            tracing::warn!("No database configured, orders are kept in memory");
            Arc::new(InMemoryOrderRepository::new())
        }
    };

    // Product catalog
    let catalog: Arc<dyn CatalogClient> = match &config.catalog.base_url {
        Some(base_url) => Arc::new(
            HttpCatalogClient::new(base_url.as_str(), config.catalog.timeout())
                .context("Failed to build catalog client")?,
        ),
        None => {
            tracing::warn!(
                "No catalog service configured, serving {} seeded products",
                config.catalog.products.len()
            );
            Arc::new(InMemoryCatalog::with_products(config.catalog.products.clone()))
        }
    };

    // Payment gateway
    let gateway: Arc<dyn PaymentGateway> = match &config.payment.base_url {
        Some(base_url) => Arc::new(
            HttpPaymentGateway::new(base_url.as_str(), config.payment.timeout())
                .context("Failed to build payment gateway client")?,
        ),
        None => {
            tracing::warn!("No payment service configured, using the mock gateway");
            Arc::new(MockPaymentGateway::new())
        }
    };

    // Kafka Connection
    let events: Arc<dyn EventPublisher> = match &config.kafka.brokers {
        Some(brokers) => Arc::new(
            EventProducer::new(brokers).context("Failed to create Kafka producer")?,
        ),
        None => Arc::new(NoopPublisher),
    };

    let orders = Arc::new(OrderManager::new(
        repo,
        catalog,
        events,
        OrderManagerConfig {
            catalog_timeout: config.catalog.timeout(),
            status_policy: config.orders.status_policy,
            order_topic_prefix: config.kafka.order_topic_prefix.clone(),
        },
    ));
    let payments = Arc::new(PaymentOrchestrator::new(
        gateway,
        config.payment.currency.clone(),
        config.payment.timeout(),
    ));

    if let Some(brokers) = config.kafka.brokers.clone() {
        let worker_orders = orders.clone();
        let group_id = config.kafka.group_id.clone();
        let topic = config.kafka.payment_topic.clone();
        tokio::spawn(async move {
            if let Err(e) =
                worker::start_payment_worker(brokers, group_id, topic, worker_orders).await
            {
                tracing::error!("Payment worker stopped: {}", e);
            }
        });
    }

    let app = app(AppState::new(orders, payments));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
