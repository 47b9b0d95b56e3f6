use crate::config::{AppConfig, StoreBackend};
use crate::users::{memory::InMemoryUserStore, repo::PgUserStore, store::UserStore};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let users = match config.store {
            StoreBackend::Postgres => {
                let database = config
                    .database
                    .as_ref()
                    .context("postgres backend selected without database settings")?;
                let store = PgUserStore::connect(database).await?;
                store.migrate().await;
                Arc::new(store) as Arc<dyn UserStore>
            }
            StoreBackend::Memory => {
                info!("using in-memory user store; data is not persisted");
                Arc::new(InMemoryUserStore::new()) as Arc<dyn UserStore>
            }
        };

        Ok(Self::from_parts(config, users))
    }

    pub fn from_parts(config: Arc<AppConfig>, users: Arc<dyn UserStore>) -> Self {
        Self { config, users }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            store: StoreBackend::Memory,
            database: None,
        });
        Self::from_parts(config, Arc::new(InMemoryUserStore::new()))
    }
}
