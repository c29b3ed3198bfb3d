use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[redacted]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

/// Argon2 cost parameters plus the server-wide pepper.
#[derive(Clone)]
pub struct HashingConfig {
    pub pepper: String,
    pub memory_kib: u32,
    /// Work factor (argon2 iteration count).
    pub iterations: u32,
    pub parallelism: u32,
}

impl fmt::Debug for HashingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashingConfig")
            .field("pepper", &"[redacted]")
            .field("memory_kib", &self.memory_kib)
            .field("iterations", &self.iterations)
            .field("parallelism", &self.parallelism)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub pool: PoolConfig,
    pub hashing: HashingConfig,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));

        let database_url = required("DATABASE_URL")?;
        let pool = PoolConfig {
            max_connections: parsed(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            acquire_timeout: Duration::from_secs(parsed(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 5)?),
        };
        let hashing = HashingConfig {
            pepper: required("PASSWORD_PEPPER")?,
            memory_kib: parsed(&lookup, "HASH_MEMORY_KIB", 19 * 1024)?,
            iterations: parsed(&lookup, "HASH_ITERATIONS", 2)?,
            parallelism: parsed(&lookup, "HASH_PARALLELISM", 1)?,
        };
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "storefront".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "storefront-users".into()),
            ttl_minutes: parsed(&lookup, "JWT_TTL_MINUTES", 60)?,
        };

        Ok(Self {
            database_url,
            pool,
            hashing,
            jwt,
        })
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
