//! One-way credential hashing.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use tracing::warn;

/// Hashes secrets with Argon2id and a random per-secret salt. The output is a
/// PHC string, so salt and cost parameters travel with the digest and
/// verification works across cost changes.
#[derive(Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl CredentialHasher {
    /// `memory_kib`, `iterations` and `parallelism` are the Argon2 work factor.
    pub fn with_cost(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|err| anyhow!("Invalid argon2 parameters: {}", err))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, secret: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string();
        Ok(digest)
    }

    /// Mismatches are `false`, never an error. A digest that cannot be parsed
    /// is logged and also treated as a mismatch.
    pub fn verify(&self, secret: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("Stored credential digest is malformed: {}", err);
                return false;
            }
        };
        self.argon2()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}
