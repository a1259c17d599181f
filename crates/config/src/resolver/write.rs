//! The resolver's write path.
//!
//! Responsibilities:
//! - Route each `set` to exactly one backend per the selection policy.
//! - Envelope structured values before they cross a text-only boundary.
//!
//! Invariants:
//! - Backend priority: explicit mapping if the key is already tracked there
//!   → process environment if the key is already an env var → secret reader
//!   if enabled → cache reader if enabled → fallback to mapping AND process
//!   environment.
//! - The explicit mapping stores values unenveloped; only text backends
//!   receive the envelope form.
//! - `set_ext` is a capability query disguised as a write: it returns false
//!   when no eligible backend is available.

use tracing::warn;

use lamina_readers::ReaderError;

use super::Resolver;
use crate::constants::DEFAULT_SET_TTL_SECS;
use crate::environ;
use crate::error::ConfigError;
use crate::value::ConfigValue;

impl Resolver {
    /// Store a value on exactly one backend per the selection policy.
    pub fn set(&mut self, key: &str, value: impl Into<ConfigValue>) -> Result<(), ConfigError> {
        let value = value.into();

        if self.mapping.contains_key(key) {
            self.mapping.insert(key.to_string(), value);
            return Ok(());
        }
        if environ::contains(key) {
            environ::publish(key, &value.to_text(), true);
            return Ok(());
        }
        if self.use_vault {
            return self.set_on_reader("secret", key, &value.to_text(), None);
        }
        if self.use_redis {
            return self.set_on_reader("cache", key, &value.to_text(), None);
        }

        // No backend claimed the key: track it in the mapping and publish it
        // to the environment so external tooling sees it too.
        environ::publish(key, &value.to_text(), true);
        self.mapping.insert(key.to_string(), value);
        Ok(())
    }

    /// Time-bounded write targeting the cache reader, or the secret reader
    /// when `vault` is requested. Returns false when neither is available —
    /// callers must check the result.
    pub fn set_ext(
        &mut self,
        key: &str,
        value: impl Into<ConfigValue>,
        timeout: Option<u64>,
        vault: bool,
    ) -> bool {
        let text = value.into().to_text();
        let ttl = Some(timeout.unwrap_or(DEFAULT_SET_TTL_SECS));

        let target = if self.use_redis {
            "cache"
        } else if vault {
            "secret"
        } else {
            return false;
        };

        let mut chain = self.readers.borrow_mut();
        match chain.by_name(target) {
            Some(reader) => match reader.set(key, &text, ttl) {
                Ok(()) => true,
                Err(err) => {
                    warn!(key, reader = target, error = %err, "time-bounded set failed");
                    false
                }
            },
            None => false,
        }
    }

    fn set_on_reader(
        &mut self,
        name: &str,
        key: &str,
        text: &str,
        ttl: Option<u64>,
    ) -> Result<(), ConfigError> {
        let chain = self.readers.get_mut();
        match chain.by_name(name) {
            Some(reader) => match reader.set(key, text, ttl) {
                Ok(()) => Ok(()),
                Err(ReaderError::NotConfigured(_)) => {
                    warn!(key, reader = name, "unable to store key, reader not configured");
                    Ok(())
                }
                Err(err) => Err(err.into()),
            },
            None => {
                warn!(key, reader = name, "unable to store key, reader not registered");
                Ok(())
            }
        }
    }
}
