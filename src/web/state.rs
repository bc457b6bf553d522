use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    config::AppConfig, modules::newsletter::store::PgSubmissionStore, oauth::OAuthClient,
    storage::StorageBackend,
};

#[derive(Clone)]
pub struct AppState {
    pool: PgPool,
    config: Arc<AppConfig>,
    storage: StorageBackend,
    oauth: OAuthClient,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("failed to connect to Postgres")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run database migrations")?;

        let storage = StorageBackend::from_settings(&config.storage);
        let oauth = OAuthClient::new(config.oauth.clone());

        Ok(Self {
            pool,
            config: Arc::new(config),
            storage,
            oauth,
        })
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    pub fn pool_ref(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn storage(&self) -> &StorageBackend {
        &self.storage
    }

    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    pub fn submissions(&self) -> PgSubmissionStore {
        PgSubmissionStore::new(self.pool())
    }
}
