//! Database layer - content stores and the search engine

pub mod memory;
pub mod search;
pub mod store;
pub mod traits;

pub use memory::MemoryContentStore;
pub use store::PostgresContentStore;
pub use traits::ContentStore;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use std::time::Duration;

use crate::config::DatabaseConfig;

/// Open the connection pool. Every session runs in UTC and carries the
/// configured statement timeout.
pub async fn connect(config: &DatabaseConfig) -> crate::Result<PgPool> {
    let statement_timeout_ms = config.statement_timeout_seconds.saturating_mul(1000);

    let pool = PgPoolOptions::new()
        .min_connections(config.pool_min_size)
        .max_connections(config.pool_max_size)
        .acquire_timeout(Duration::from_secs(config.pool_timeout_seconds))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                conn.execute(
                    format!(
                        "SET TIME ZONE 'UTC'; SET statement_timeout = {}",
                        statement_timeout_ms
                    )
                    .as_str(),
                )
                .await?;
                Ok(())
            })
        })
        .connect(&config.url)
        .await
        .map_err(crate::Error::Database)?;

    tracing::info!(
        pool_min_size = config.pool_min_size,
        pool_max_size = config.pool_max_size,
        statement_timeout_ms,
        "Database pool ready"
    );

    Ok(pool)
}

/// Apply the embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> crate::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| crate::Error::Internal(format!("Failed to run migrations: {e}")))?;
    tracing::info!("Database migrations applied");
    Ok(())
}
