use std::sync::Arc;

use sqlx::PgPool;

use crate::accounts::{repo::PgAccountStore, CredentialService, Passwords};
use crate::config::AppConfig;
use crate::db;

#[derive(Clone)]
pub struct AppState {
    pub accounts: CredentialService,
}

impl AppState {
    /// Connect to Postgres, apply migrations and wire the credential service.
    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        db::migrate(&pool).await?;
        Self::from_pool(pool)
    }

    pub fn from_pool(pool: PgPool) -> anyhow::Result<Self> {
        let store = Arc::new(PgAccountStore::new(pool));
        let accounts = CredentialService::new(store, Passwords::new()?);
        Ok(Self { accounts })
    }

    pub fn from_parts(accounts: CredentialService) -> Self {
        Self { accounts }
    }

    #[cfg(test)]
    pub fn memory() -> Self {
        use crate::accounts::memory::MemoryAccountStore;

        let store = Arc::new(MemoryAccountStore::new());
        Self::from_parts(CredentialService::new(store, crate::accounts::password::cheap()))
    }
}
