use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::accounts::repo_types::{Account, NewAccount};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("an account with this email already exists")]
    AlreadyExists,
    #[error("account store unavailable")]
    Unavailable(#[source] anyhow::Error),
}

/// Persistence boundary for accounts.
///
/// `create` must reject a duplicate email atomically; callers treat
/// `StoreError::AlreadyExists` as the authoritative uniqueness signal.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;
    async fn list_names(&self) -> Result<Vec<String>, StoreError>;
}

#[derive(Clone)]
pub struct PgAccountStore {
    db: PgPool,
}

impl PgAccountStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    /// Find an account by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find account by email")
        .map_err(StoreError::Unavailable)
    }

    /// Insert a new account. The unique index on `email` decides races.
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let inserted = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&self.db)
        .await;

        match inserted {
            Ok(row) => Ok(row),
            Err(err) if is_unique_violation(&err) => Err(StoreError::AlreadyExists),
            Err(err) => Err(StoreError::Unavailable(
                anyhow::Error::new(err).context("insert account"),
            )),
        }
    }

    async fn list_names(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT name
              FROM accounts
             ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list account names")
        .map_err(StoreError::Unavailable)?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
