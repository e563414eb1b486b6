//! User account service: registration with Argon2id-hashed credentials,
//! login verification, and name listing over a pluggable account store.

pub mod accounts;
pub mod app;
pub mod config;
pub mod db;
pub mod state;
