//! Connection settings for the source readers.
//!
//! Responsibilities:
//! - Hold the connection parameters for each backend.
//! - Provide `from_env()` constructors reading the conventional variables
//!   (`REDIS_*`, `MEMCACHE_*`, `VAULT_*`).
//!
//! Invariants:
//! - Empty or whitespace-only environment variables are treated as unset.
//! - The Vault token is wrapped in `SecretString` and never logged.

use secrecy::SecretString;

use crate::error::ReaderError;

/// Read an environment variable, returning `None` if unset, empty, or
/// whitespace-only. The value is trimmed.
fn env_var_or_none(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == s.len() {
            Some(s)
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ReaderError> {
    match env_var_or_none(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ReaderError::InvalidSettings {
            var: key.to_string(),
            message: format!("cannot parse {raw:?} as a number"),
        }),
    }
}

/// Connection settings for the Redis cache reader.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub host: String,
    pub port: u16,
    pub db: u32,
}

impl CacheSettings {
    /// Read `REDIS_HOST`, `REDIS_PORT` and `REDIS_DB`, with localhost defaults.
    pub fn from_env() -> Result<Self, ReaderError> {
        Ok(Self {
            host: env_var_or_none("REDIS_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: env_parsed("REDIS_PORT", 6379)?,
            db: env_parsed("REDIS_DB", 1)?,
        })
    }

    /// The `redis://` connection URL for these settings.
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

/// Connection settings for the Memcached object-cache reader.
#[derive(Debug, Clone)]
pub struct ObjectCacheSettings {
    pub host: String,
    pub port: u16,
}

impl ObjectCacheSettings {
    /// Read `MEMCACHE_HOST` and `MEMCACHE_PORT`, with localhost defaults.
    pub fn from_env() -> Result<Self, ReaderError> {
        Ok(Self {
            host: env_var_or_none("MEMCACHE_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: env_parsed("MEMCACHE_PORT", 11211)?,
        })
    }

    /// The `memcache://` connection URL for these settings.
    pub fn url(&self) -> String {
        format!("memcache://{}:{}?timeout=5", self.host, self.port)
    }
}

/// Connection settings for the Vault secret reader.
#[derive(Clone)]
pub struct VaultSettings {
    pub url: String,
    pub token: SecretString,
    pub mount_point: String,
    /// KV engine version, 1 or 2.
    pub version: u8,
    pub skip_verify: bool,
}

impl VaultSettings {
    /// Read `VAULT_URL`, `VAULT_TOKEN`, `VAULT_MOUNT_POINT`, `VAULT_VERSION`
    /// and `VAULT_SKIP_VERIFY`.
    ///
    /// A missing token is a settings error: unlike an unreachable backend, it
    /// cannot be retried and the caller should not register a reader at all.
    pub fn from_env() -> Result<Self, ReaderError> {
        let token = env_var_or_none("VAULT_TOKEN").ok_or_else(|| ReaderError::InvalidSettings {
            var: "VAULT_TOKEN".to_string(),
            message: "not set".to_string(),
        })?;
        let url = env_var_or_none("VAULT_URL")
            .unwrap_or_else(|| "http://localhost:8200".to_string());
        Ok(Self {
            url: validate_and_normalize_url("VAULT_URL", &url)?,
            token: SecretString::new(token.into()),
            mount_point: env_var_or_none("VAULT_MOUNT_POINT")
                .unwrap_or_else(|| "lamina".to_string()),
            version: env_parsed("VAULT_VERSION", 2)?,
            skip_verify: env_var_or_none("VAULT_SKIP_VERIFY")
                .map(|v| matches!(v.as_str(), "true" | "1"))
                .unwrap_or(false),
        })
    }
}

/// Validate a backend URL: absolute, http(s) scheme, host present. The
/// normalized form has no trailing slash.
fn validate_and_normalize_url(var: &str, raw: &str) -> Result<String, ReaderError> {
    let parsed = url::Url::parse(raw.trim()).map_err(|err| ReaderError::InvalidSettings {
        var: var.to_string(),
        message: format!("must be an absolute http(s) URL: {err}"),
    })?;
    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ReaderError::InvalidSettings {
            var: var.to_string(),
            message: format!("scheme must be http or https, got {scheme:?}"),
        });
    }
    if parsed.host_str().is_none() {
        return Err(ReaderError::InvalidSettings {
            var: var.to_string(),
            message: "host is required".to_string(),
        });
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

impl std::fmt::Debug for VaultSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSettings")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("mount_point", &self.mount_point)
            .field("version", &self.version)
            .field("skip_verify", &self.skip_verify)
            .finish()
    }
}
