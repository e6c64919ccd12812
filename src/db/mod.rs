// src/db/mod.rs

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::store::StoreError;

pub async fn connect(cfg: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let url = cfg.url.as_deref().ok_or_else(|| {
        StoreError::Database(sqlx::Error::Configuration(
            "DATABASE_URL (or HMS__DATABASE__URL) must be set for the postgres store".into(),
        ))
    })?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;

    info!(max_connections = cfg.max_connections, "connected to PostgreSQL");
    Ok(pool)
}
