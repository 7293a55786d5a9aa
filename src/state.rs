use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn, orm_from_pool},
    pricing::PricingPolicy,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: DbPool, config: AppConfig) -> Self {
        let orm = orm_from_pool(pool.clone());
        Self {
            pool,
            orm,
            config: Arc::new(config),
        }
    }

    pub fn pricing(&self) -> &PricingPolicy {
        &self.config.pricing
    }
}
