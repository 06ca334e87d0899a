use std::sync::Arc;

use sqlx::SqlitePool;

use crate::cache::ResponseCache;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub cache: Arc<ResponseCache>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: Config) -> Self {
        Self {
            db,
            cache: Arc::new(ResponseCache::new(config.cache_ttl)),
            config: Arc::new(config),
        }
    }
}
