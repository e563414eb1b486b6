use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod memory;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use memory::MemoryAccountStore;
pub use password::Passwords;
pub use repo::{AccountStore, PgAccountStore, StoreError};
pub use repo_types::{Account, NewAccount};
pub use services::{CredentialService, InfrastructureError, LoginError, RegisterError};

pub fn router() -> Router<AppState> {
    handlers::account_routes()
}
