use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::config::HashingConfig;

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("invalid hashing parameters: {0}")]
    Params(String),
    #[error("hashing failed: {0}")]
    Hash(String),
    #[error("stored digest is malformed: {0}")]
    MalformedDigest(String),
}

/// Salted, peppered one-way hashing of user secrets.
pub trait SecretHasher: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, HashError>;

    /// `Ok(false)` on mismatch; errors only when `digest` cannot be parsed.
    fn verify(&self, secret: &str, digest: &str) -> Result<bool, HashError>;
}

/// Argon2id keyed with the server pepper.
#[derive(Clone)]
pub struct Argon2Hasher {
    pepper: Vec<u8>,
    params: Params,
}

impl Argon2Hasher {
    pub fn new(pepper: &str, memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, HashError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| HashError::Params(e.to_string()))?;
        Ok(Self {
            pepper: pepper.as_bytes().to_vec(),
            params,
        })
    }

    pub fn from_config(cfg: &HashingConfig) -> Result<Self, HashError> {
        Self::new(&cfg.pepper, cfg.memory_kib, cfg.iterations, cfg.parallelism)
    }

    fn argon2(&self) -> Result<Argon2<'_>, HashError> {
        Argon2::new_with_secret(
            &self.pepper,
            Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
        .map_err(|e| HashError::Params(e.to_string()))
    }
}

impl SecretHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                HashError::Hash(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, secret: &str, digest: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(digest).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            HashError::MalformedDigest(e.to_string())
        })?;
        Ok(self
            .argon2()?
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> Argon2Hasher {
    Argon2Hasher::new("test-pepper", 8, 1, 1).expect("cheap params are valid")
}
