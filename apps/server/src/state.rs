//! Shared application state

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::db::{self, ContentStore, PostgresContentStore};
use crate::services::SearchService;
use crate::Result;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub search_service: Arc<SearchService>,
    /// Present when backed by Postgres.
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Connect to Postgres, apply migrations when enabled, and wire services.
    pub async fn new(config: Config) -> Result<Self> {
        let pool = db::connect(&config.database).await?;
        if config.database.run_migrations {
            db::run_migrations(&pool).await?;
        }

        let store: Arc<dyn ContentStore> = Arc::new(PostgresContentStore::new(pool.clone()));
        let mut state = Self::with_store(config, store);
        state.db_pool = Some(pool);
        Ok(state)
    }

    /// Wire services over an already constructed store.
    pub fn with_store(config: Config, store: Arc<dyn ContentStore>) -> Self {
        let search_service = Arc::new(SearchService::new(store, config.search.clone()));
        Self {
            config: Arc::new(config),
            search_service,
            db_pool: None,
        }
    }
}
