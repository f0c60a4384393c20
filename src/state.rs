use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn, create_orm_conn},
    services::shipping_service::NovaPoshtaClient,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub shipping: NovaPoshtaClient,
}

impl AppState {
    pub fn new(pool: DbPool, config: AppConfig) -> Self {
        let orm = create_orm_conn(&pool);
        let shipping = NovaPoshtaClient::new(&config.nova_poshta);
        Self {
            pool,
            orm,
            config: Arc::new(config),
            shipping,
        }
    }
}
