//! Runtime environment switching and the environment cache.
//!
//! Responsibilities:
//! - Switch the resolver between named environments at runtime, serving
//!   cached environments without I/O.
//! - Peek into other environments (`get_with_env`) without switching.
//! - Report environment diagnostics (`env_info`).
//!
//! Invariants:
//! - Switching to the current environment is an idempotent no-op.
//! - A failed switch restores the previous environment pointer and leaves
//!   the active mapping intact before the wrapped error propagates.
//! - `clear_env_cache` is the only cache deletion path.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, error, info};

use super::{Mapping, Resolver, to_mapping};
use crate::constants::ENV_DIR;
use crate::error::ConfigError;
use crate::loader::{EnvLoader, VaultStatus};
use crate::value::ConfigValue;

/// Diagnostic snapshot of the resolver's environment state.
#[derive(Debug, Clone, Serialize)]
pub struct EnvInfo {
    pub current_env: String,
    pub loader_kind: Option<String>,
    pub available_envs: Vec<String>,
    pub cached_envs: Vec<String>,
    pub root: PathBuf,
    pub total_variables: usize,
    /// Names of the external readers enabled at configure time.
    pub backends: Vec<String>,
    pub vault_status: Option<VaultStatus>,
    pub loaded_files: Vec<PathBuf>,
    pub file_count: usize,
}

impl Resolver {
    /// Switch to another environment.
    ///
    /// Switching to the current environment succeeds immediately. A cached
    /// target (unless `reload` is requested) is swapped in without I/O.
    /// Otherwise the full load runs for the target; on failure the previous
    /// environment pointer is restored and a wrapped error propagates.
    pub fn set_env(&mut self, new_env: &str, reload: bool) -> Result<(), ConfigError> {
        if new_env == self.current_env {
            debug!(env = new_env, "already in environment");
            return Ok(());
        }
        let old_env = self.current_env.clone();

        let cached = if reload {
            None
        } else {
            self.env_cache.borrow().get(new_env).cloned()
        };
        if let Some(mapping) = cached {
            let old_mapping = std::mem::replace(&mut self.mapping, mapping);
            self.env_cache.get_mut().insert(old_env, old_mapping);
            self.current_env = new_env.to_string();
            info!(env = new_env, "switched to cached environment");
            return Ok(());
        }

        match self.reload_mapping_for(new_env) {
            Ok(mapping) => {
                let old_mapping = std::mem::replace(&mut self.mapping, mapping);
                {
                    let cache = self.env_cache.get_mut();
                    cache.insert(old_env.clone(), old_mapping);
                    cache.insert(new_env.to_string(), self.mapping.clone());
                }
                self.current_env = new_env.to_string();
                info!(from = %old_env, to = %new_env, "environment switched");
                Ok(())
            }
            Err(err) => {
                error!(env = new_env, error = %err, "environment switch failed");
                Err(ConfigError::EnvSwitch {
                    env: new_env.to_string(),
                    source: Box::new(err),
                })
            }
        }
    }

    /// Reload the current environment from its sources, refreshing the
    /// cache entry.
    pub fn reload_current_env(&mut self) -> Result<(), ConfigError> {
        let env = self.current_env.clone();
        let mapping = self.reload_mapping_for(&env)?;
        self.mapping = mapping;
        self.env_cache
            .get_mut()
            .insert(env, self.mapping.clone());
        Ok(())
    }

    /// The currently active environment name.
    pub fn current_env(&self) -> &str {
        &self.current_env
    }

    /// Environments available on disk (`env/*` directories) plus any cached
    /// ones, sorted.
    pub fn list_available_envs(&self) -> Vec<String> {
        let mut envs = BTreeSet::new();
        if let Ok(entries) = std::fs::read_dir(self.root.join(ENV_DIR)) {
            for entry in entries.flatten() {
                if entry.path().is_dir()
                    && let Ok(name) = entry.file_name().into_string()
                {
                    envs.insert(name);
                }
            }
        }
        envs.extend(self.env_cache.borrow().keys().cloned());
        envs.into_iter().collect()
    }

    /// Diagnostic snapshot: current environment, loader kind, availability,
    /// variable counts, remote-store status, loaded files.
    pub fn env_info(&self) -> EnvInfo {
        let cached_envs = {
            let mut keys: Vec<String> = self.env_cache.borrow().keys().cloned().collect();
            keys.sort();
            keys
        };
        let loaded_files = self
            .loader
            .as_ref()
            .map(|loader| loader.loaded_files().to_vec())
            .unwrap_or_default();
        let mut backends = Vec::new();
        if self.use_redis {
            backends.push("cache".to_string());
        }
        if self.use_memcached {
            backends.push("object-cache".to_string());
        }
        if self.use_vault {
            backends.push("secret".to_string());
        }
        EnvInfo {
            current_env: self.current_env.clone(),
            loader_kind: self
                .loader
                .as_ref()
                .map(|loader| loader.kind().name().to_string()),
            available_envs: self.list_available_envs(),
            cached_envs,
            root: self.root.clone(),
            total_variables: self.mapping.len(),
            backends,
            vault_status: self.loader.as_ref().and_then(|loader| loader.vault_status()),
            file_count: loaded_files.len(),
            loaded_files,
        }
    }

    /// Read a key from a specific environment without switching to it.
    ///
    /// Serves from the environment cache when possible; otherwise loads the
    /// environment once (caching the result). The current environment is
    /// resolved through the normal chain.
    pub fn get_with_env(&self, key: &str, env: Option<&str>) -> Option<ConfigValue> {
        let Some(env) = env.filter(|e| *e != self.current_env) else {
            return self.get(key);
        };

        let cached = {
            let cache = self.env_cache.borrow();
            cache.get(env).map(|mapping| mapping.get(key).cloned())
        };
        if let Some(value) = cached {
            return value;
        }

        let env_dir = self.root.join(ENV_DIR).join(env);
        if !env_dir.is_dir() {
            return None;
        }
        let loader = EnvLoader::build(
            self.loader_kind,
            env_dir,
            env,
            false,
            false,
            self.auto_discovery,
            None,
        );
        let mut loader = match loader {
            Ok(loader) => loader,
            Err(err) => {
                debug!(env, error = %err, "failed to build loader for environment peek");
                return None;
            }
        };
        match loader.load() {
            Ok(data) => {
                let mapping = to_mapping(data);
                let value = mapping.get(key).cloned();
                self.env_cache.borrow_mut().insert(env.to_string(), mapping);
                value
            }
            Err(err) => {
                debug!(env, error = %err, "failed to load environment for peek");
                None
            }
        }
    }

    /// Drop one cached environment, or every cached environment when `env`
    /// is `None`.
    pub fn clear_env_cache(&mut self, env: Option<&str>) {
        match env {
            Some(env) => {
                self.env_cache.get_mut().remove(env);
                debug!(env, "cleared environment cache entry");
            }
            None => {
                self.env_cache.get_mut().clear();
                debug!("cleared environment cache");
            }
        }
    }

    /// Load (or reload) the mapping for an environment through the loader,
    /// building one first when configuration was deferred.
    fn reload_mapping_for(&mut self, env: &str) -> Result<Mapping, ConfigError> {
        if let Some(loader) = self.loader.as_mut() {
            let data = loader.switch_environment(env)?;
            return Ok(to_mapping(data));
        }
        let env_dir = self.root.join(ENV_DIR).join(env);
        let mut loader = EnvLoader::build(
            self.loader_kind,
            env_dir,
            env,
            self.override_env,
            self.create_missing,
            self.auto_discovery,
            self.patterns.clone(),
        )?;
        let data = loader.load()?;
        self.loader = Some(loader);
        Ok(to_mapping(data))
    }
}
