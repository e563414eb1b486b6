use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::accounts::repo::{AccountStore, StoreError};
use crate::accounts::repo_types::{Account, NewAccount};

/// In-process account store keyed by email.
///
/// Check-and-insert happens under one write lock, so duplicate emails are
/// rejected atomically just like the unique index does in Postgres.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.read().await.get(email).cloned())
    }

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.email) {
            return Err(StoreError::AlreadyExists);
        }
        let row = Account {
            id: Uuid::new_v4(),
            name: account.name,
            email: account.email,
            password_hash: account.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        accounts.insert(row.email.clone(), row.clone());
        Ok(row)
    }

    async fn list_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .map(|a| a.name.clone())
            .collect())
    }
}
