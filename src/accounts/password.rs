use std::sync::Arc;

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

/// Argon2id memory cost in KiB.
pub const HASH_MEMORY_KIB: u32 = 19 * 1024;
/// Argon2id iteration count.
pub const HASH_ITERATIONS: u32 = 2;
/// Argon2id lanes.
pub const HASH_PARALLELISM: u32 = 1;

/// Argon2id hashing with a fixed work factor.
///
/// Also keeps a hash of a random throwaway password so that a login for an
/// unknown email can pay the same verification cost as a real one.
#[derive(Clone)]
pub struct Passwords {
    params: Params,
    dummy_hash: Arc<str>,
}

impl Passwords {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_cost(HASH_MEMORY_KIB, HASH_ITERATIONS, HASH_PARALLELISM)
    }

    pub fn with_cost(memory_kib: u32, iterations: u32, parallelism: u32) -> anyhow::Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None).map_err(|e| {
            error!(error = %e, "invalid argon2 params");
            anyhow::anyhow!(e.to_string())
        })?;
        let dummy_password = SaltString::generate(&mut OsRng);
        let dummy_hash = hash_with(&params, dummy_password.as_str())?;
        Ok(Self {
            params,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn hash_password(&self, plain: &str) -> anyhow::Result<String> {
        hash_with(&self.params, plain)
    }

    /// Verify `plain` against a PHC hash string. The comparison is the
    /// constant-time one from `password_hash`; a malformed hash is an error.
    pub fn verify_password(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => {
                error!(error = %e, "argon2 verify_password error");
                Err(anyhow::anyhow!(e.to_string()))
            }
        }
    }

    /// Burn one verification against the throwaway hash. Always false.
    pub fn verify_dummy(&self, plain: &str) -> bool {
        let _ = self.verify_password(plain, &self.dummy_hash);
        false
    }
}

fn hash_with(params: &Params, plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone());
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

#[cfg(test)]
pub(crate) fn cheap() -> Passwords {
    Passwords::with_cost(8, 1, 1).expect("cheap argon2 params are valid")
}
