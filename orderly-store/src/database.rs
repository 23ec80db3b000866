use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::info;

use crate::app_config::DatabaseConfig;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    /// Open a pool against `database.url`. Returns `None` when no URL is set.
    pub async fn connect(config: &DatabaseConfig) -> Result<Option<Self>, sqlx::Error> {
        let Some(url) = config.url.as_deref() else {
            return Ok(None);
        };

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(url)
            .await?;

        info!(max_connections = config.max_connections, "Connected to Postgres");
        Ok(Some(Self { pool }))
    }

    /// Apply pending migrations from `migrations/`
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running order store migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Order store schema is up to date.");
        Ok(())
    }
}
