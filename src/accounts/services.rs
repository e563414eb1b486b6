use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::accounts::password::Passwords;
use crate::accounts::repo::{AccountStore, StoreError};
use crate::accounts::repo_types::{Account, NewAccount};

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("email already registered")]
    EmailTaken,
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

/// Store or internal failure. Detail stays in the source chain for logging.
#[derive(Debug, thiserror::Error)]
#[error("infrastructure error")]
pub struct InfrastructureError(#[source] pub anyhow::Error);

impl From<anyhow::Error> for InfrastructureError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

/// Lowercased, trimmed email used for every store lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration and login over an injected account store.
#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn AccountStore>,
    passwords: Passwords,
}

impl CredentialService {
    pub fn new(store: Arc<dyn AccountStore>, passwords: Passwords) -> Self {
        Self { store, passwords }
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        raw_password: &str,
    ) -> Result<Uuid, RegisterError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(RegisterError::InvalidInput("email is required"));
        }
        if raw_password.is_empty() {
            return Err(RegisterError::InvalidInput("password is required"));
        }

        // Fast path only; `create` below is what actually enforces uniqueness.
        if self.find(&email).await?.is_some() {
            debug!(%email, "register pre-check found existing account");
            return Err(RegisterError::EmailTaken);
        }

        let password_hash = self.hash(raw_password).await?;
        let created = self
            .store
            .create(NewAccount {
                name: name.to_string(),
                email,
                password_hash,
            })
            .await;

        match created {
            Ok(account) => Ok(account.id),
            Err(StoreError::AlreadyExists) => {
                warn!("email taken by a concurrent registration");
                Err(RegisterError::EmailTaken)
            }
            Err(StoreError::Unavailable(e)) => Err(InfrastructureError(e).into()),
        }
    }

    pub async fn login(&self, email: &str, raw_password: &str) -> Result<Uuid, LoginError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(LoginError::InvalidInput("email is required"));
        }
        if raw_password.is_empty() {
            return Err(LoginError::InvalidInput("password is required"));
        }

        let Some(account) = self.find(&email).await? else {
            let passwords = self.passwords.clone();
            let plain = raw_password.to_string();
            tokio::task::spawn_blocking(move || passwords.verify_dummy(&plain))
                .await
                .context("join dummy verification")
                .map_err(InfrastructureError)?;
            return Err(LoginError::InvalidCredentials);
        };

        let passwords = self.passwords.clone();
        let plain = raw_password.to_string();
        let stored = account.password_hash;
        let ok = tokio::task::spawn_blocking(move || passwords.verify_password(&plain, &stored))
            .await
            .context("join password verification")
            .map_err(InfrastructureError)?
            .map_err(InfrastructureError)?;

        if ok {
            Ok(account.id)
        } else {
            Err(LoginError::InvalidCredentials)
        }
    }

    pub async fn list_account_names(&self) -> Result<Vec<String>, InfrastructureError> {
        self.store.list_names().await.map_err(store_failure)
    }

    async fn find(&self, email: &str) -> Result<Option<Account>, InfrastructureError> {
        self.store.find_by_email(email).await.map_err(store_failure)
    }

    async fn hash(&self, raw_password: &str) -> Result<String, InfrastructureError> {
        let passwords = self.passwords.clone();
        let plain = raw_password.to_string();
        let hash = tokio::task::spawn_blocking(move || passwords.hash_password(&plain))
            .await
            .context("join password hashing")??;
        Ok(hash)
    }
}

fn store_failure(e: StoreError) -> InfrastructureError {
    match e {
        StoreError::Unavailable(e) => InfrastructureError(e),
        other => InfrastructureError(anyhow::Error::new(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::memory::MemoryAccountStore;
    use crate::accounts::password::cheap;
    use async_trait::async_trait;

    fn service() -> (CredentialService, Arc<MemoryAccountStore>) {
        let store = Arc::new(MemoryAccountStore::new());
        (CredentialService::new(store.clone(), cheap()), store)
    }

    #[tokio::test]
    async fn register_then_login_succeeds() {
        let (svc, _) = service();
        let id = svc.register("Alice", "a@x.com", "secret123").await.unwrap();
        assert_eq!(svc.login("a@x.com", "secret123").await.unwrap(), id);
    }

    #[tokio::test]
    async fn email_is_normalized() {
        let (svc, store) = service();
        let id = svc.register("Alice", "  A@X.com ", "secret123").await.unwrap();
        assert!(store.find_by_email("a@x.com").await.unwrap().is_some());
        assert_eq!(svc.login("a@X.COM", "secret123").await.unwrap(), id);
        let err = svc.register("Alice2", "a@x.com", "other").await.unwrap_err();
        assert!(matches!(err, RegisterError::EmailTaken));
    }

    #[tokio::test]
    async fn register_rejects_empty_fields() {
        let (svc, store) = service();
        let err = svc.register("Alice", "   ", "secret123").await.unwrap_err();
        assert!(matches!(err, RegisterError::InvalidInput(_)));
        let err = svc.register("Alice", "a@x.com", "").await.unwrap_err();
        assert!(matches!(err, RegisterError::InvalidInput(_)));
        assert!(store.list_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_register_keeps_original_hash() {
        let (svc, store) = service();
        svc.register("Alice", "a@x.com", "secret123").await.unwrap();
        let before = store.find_by_email("a@x.com").await.unwrap().unwrap();

        let err = svc.register("Eve", "a@x.com", "hijack").await.unwrap_err();
        assert!(matches!(err, RegisterError::EmailTaken));

        let after = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(before.password_hash, after.password_hash);
        assert_eq!(after.name, "Alice");
        assert!(svc.login("a@x.com", "hijack").await.is_err());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let (svc, _) = service();
        svc.register("Alice", "a@x.com", "secret123").await.unwrap();

        let wrong = svc.login("a@x.com", "wrong").await.unwrap_err();
        let unknown = svc.login("nobody@x.com", "secret123").await.unwrap_err();
        assert!(matches!(wrong, LoginError::InvalidCredentials));
        assert!(matches!(unknown, LoginError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn login_rejects_empty_fields() {
        let (svc, _) = service();
        let err = svc.login("", "secret123").await.unwrap_err();
        assert!(matches!(err, LoginError::InvalidInput(_)));
        let err = svc.login("a@x.com", "").await.unwrap_err();
        assert!(matches!(err, LoginError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn stored_hash_is_not_the_raw_password() {
        let (svc, store) = service();
        svc.register("Alice", "a@x.com", "secret123").await.unwrap();
        let account = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_ne!(account.password_hash, "secret123");
        assert!(!account.password_hash.contains("secret123"));
    }

    #[tokio::test]
    async fn listing_contains_each_name_once() {
        let (svc, _) = service();
        svc.register("Alice", "a@x.com", "secret123").await.unwrap();
        svc.register("Bob", "b@x.com", "hunter22").await.unwrap();
        let _ = svc.register("Alice", "a@x.com", "again").await;

        let mut names = svc.list_account_names().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["Alice".to_string(), "Bob".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_yield_one_winner() {
        let (svc, store) = service();
        let attempts = 8;

        let handles: Vec<_> = (0..attempts)
            .map(|i| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    svc.register(&format!("user{i}"), "race@x.com", "secret123").await
                })
            })
            .collect();

        let mut ok = 0;
        let mut taken = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(RegisterError::EmailTaken) => taken += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(taken, attempts - 1);
        assert_eq!(store.list_names().await.unwrap().len(), 1);
    }

    /// Store whose pre-check never sees existing rows, like a read racing an insert.
    struct BlindPrecheck(MemoryAccountStore);

    #[async_trait]
    impl AccountStore for BlindPrecheck {
        async fn find_by_email(&self, _email: &str) -> Result<Option<Account>, StoreError> {
            Ok(None)
        }
        async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
            self.0.create(account).await
        }
        async fn list_names(&self) -> Result<Vec<String>, StoreError> {
            self.0.list_names().await
        }
    }

    #[tokio::test]
    async fn store_conflict_maps_to_email_taken() {
        let svc = CredentialService::new(Arc::new(BlindPrecheck(MemoryAccountStore::new())), cheap());
        svc.register("Alice", "a@x.com", "secret123").await.unwrap();
        let err = svc.register("Eve", "a@x.com", "secret123").await.unwrap_err();
        assert!(matches!(err, RegisterError::EmailTaken));
    }

    struct DownStore;

    #[async_trait]
    impl AccountStore for DownStore {
        async fn find_by_email(&self, _email: &str) -> Result<Option<Account>, StoreError> {
            Err(StoreError::Unavailable(anyhow::anyhow!("connection refused")))
        }
        async fn create(&self, _account: NewAccount) -> Result<Account, StoreError> {
            Err(StoreError::Unavailable(anyhow::anyhow!("connection refused")))
        }
        async fn list_names(&self) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Unavailable(anyhow::anyhow!("connection refused")))
        }
    }

    #[tokio::test]
    async fn store_outage_is_infrastructure_error() {
        let svc = CredentialService::new(Arc::new(DownStore), cheap());
        assert!(matches!(
            svc.register("Alice", "a@x.com", "secret123").await.unwrap_err(),
            RegisterError::Infrastructure(_)
        ));
        assert!(matches!(
            svc.login("a@x.com", "secret123").await.unwrap_err(),
            LoginError::Infrastructure(_)
        ));
        assert!(svc.list_account_names().await.is_err());
    }
}
